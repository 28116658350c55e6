//! tierdupe - tiered duplicate file detection.
//!
//! Files are compared by size, then by a BLAKE3 hash of their leading bytes,
//! then by a BLAKE3 hash of their whole content. Each tier is only computed
//! for files that still collide at the previous one, and hashing can run on
//! a background thread while files are still being discovered.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod scheduler;
pub mod signal;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::catalog::{CatalogError, FileCatalog};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{ScanSummary, SimilarFileSet};
use crate::error::{AppError, ExitCode};
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{HashTier, Walker};

/// How often a background wait re-checks for Ctrl+C or a dead worker.
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for fatal problems: an invalid scan root, a catalog that
/// cannot be created, a tier that does not finish within the timeout, or a
/// failure writing the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    match &cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Scan(args) => {
            config.merge_scan_args(args);
            let report = run_scan(args, &config, cli.quiet)?;

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            report.write_to(args.output, &mut out)?;
            out.flush()?;
            Ok(report.exit_code)
        }
    }
}

/// Outcome of one scan, ready to be rendered.
#[derive(Debug)]
pub struct ScanReport {
    /// Groups at the requested tier
    pub set: SimilarFileSet,
    /// Counts and timings for the run
    pub summary: ScanSummary,
    /// Exit code the run maps to
    pub exit_code: ExitCode,
}

impl ScanReport {
    /// Render the report in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or JSON serialization fails.
    pub fn write_to<W: Write>(&self, format: OutputFormat, writer: &mut W) -> Result<()> {
        match format {
            OutputFormat::Text => TextOutput::new(&self.set, &self.summary).write_to(writer)?,
            OutputFormat::Json => {
                JsonOutput::new(&self.set, &self.summary, self.exit_code).write_to(writer, true)?
            }
        }
        Ok(())
    }
}

/// Walk `args.path`, hash it up to the configured tier and group the files.
///
/// `config` must already include the overrides from `args`.
///
/// # Errors
///
/// Returns an error for an invalid scan root, a catalog that cannot be
/// created, or a tier that does not finish within the timeout.
pub fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> Result<ScanReport> {
    let shutdown = signal::install_handler().context("Failed to set up Ctrl+C handling")?;
    let flag = shutdown.get_flag();
    let tier = config.tier;

    let walker =
        Walker::new(&args.path, config.walker_config()).with_shutdown_flag(Arc::clone(&flag));
    walker.validate_root().map_err(AppError::from)?;

    let progress = (!quiet && !args.no_progress).then(|| Arc::new(Progress::new(false)));
    let mut catalog_config = config.catalog_config().with_shutdown_flag(Arc::clone(&flag));
    if let Some(p) = &progress {
        catalog_config = catalog_config.with_progress_callback(Arc::clone(p) as Arc<dyn ProgressCallback>);
    }
    let catalog = FileCatalog::with_config(&args.path, catalog_config).map_err(AppError::from)?;

    log::info!(
        "Scanning {} for duplicates at {} tier",
        catalog.root().display(),
        tier
    );

    let walk_start = Instant::now();
    let walk_errors = discover(&walker, &catalog, args.foreground, progress.as_deref())?;
    let walk_duration = walk_start.elapsed();
    log::info!("Found {} files in {:?}", catalog.len(), walk_duration);

    let hash_start = Instant::now();
    let interrupted = if flag.load(Ordering::SeqCst) {
        catalog.cancel_background_hashing();
        catalog.join_background_hashing();
        true
    } else if args.foreground {
        catalog.compute_tier(tier).interrupted
    } else {
        !wait_in_background(&catalog, tier, config.wait_timeout_secs, &flag)?
    };
    let hash_duration = hash_start.elapsed();

    let set = catalog.group(tier, config.include_singletons);
    let descriptors = catalog.descriptors();
    let summary = ScanSummary {
        tier,
        total_files: descriptors.len(),
        total_size: descriptors.iter().map(|d| d.size()).sum(),
        duplicate_groups: set.duplicate_groups().count(),
        duplicate_files: set.duplicate_files(),
        reclaimable_space: set.reclaimable_bytes(),
        failed_files: descriptors.iter().filter(|d| d.has_failed()).count(),
        excluded_files: set.excluded(),
        walk_errors,
        walk_duration,
        hash_duration,
        interrupted,
    };

    let exit_code = if interrupted {
        ExitCode::Interrupted
    } else if summary.has_problems() {
        ExitCode::PartialSuccess
    } else if summary.duplicate_groups == 0 {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    };

    log::info!(
        "{} duplicate groups, {} reclaimable",
        summary.duplicate_groups,
        summary.reclaimable_display()
    );

    Ok(ScanReport {
        set,
        summary,
        exit_code,
    })
}

/// Feed walker results into the catalog. Returns the number of walk errors.
///
/// Unless `foreground`, background hashing starts with the first file so it
/// overlaps the rest of the walk.
fn discover(
    walker: &Walker,
    catalog: &FileCatalog,
    foreground: bool,
    progress: Option<&Progress>,
) -> Result<usize> {
    if let Some(p) = progress {
        p.on_phase_start("walking", 0);
    }

    let mut errors = 0;
    let mut started = foreground;
    for entry in walker.walk() {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{}", e);
                errors += 1;
                continue;
            }
        };

        match catalog.add_file(&path) {
            Ok(_) => {
                if let Some(p) = progress {
                    p.on_progress("walking", catalog.len(), &path.to_string_lossy());
                }
                if !started {
                    catalog.start_background_hashing()?;
                    started = true;
                }
            }
            // Reached twice through followed symlinks.
            Err(CatalogError::AlreadyCataloged(_)) => {}
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                errors += 1;
            }
        }
    }

    if let Some(p) = progress {
        p.on_phase_end("walking");
    }
    Ok(errors)
}

/// Restart the worker so it covers late files, then wait for `tier`.
///
/// Returns `Ok(true)` once the tier is complete and `Ok(false)` if Ctrl+C
/// stopped the run.
fn wait_in_background(
    catalog: &FileCatalog,
    tier: HashTier,
    timeout_secs: u64,
    shutdown: &AtomicBool,
) -> Result<bool> {
    // Stop the walk-time run at the next file; finished hashes are kept.
    catalog.cancel_background_hashing();
    catalog.join_background_hashing();
    catalog.start_background_hashing()?;

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let completed = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if catalog.wait_for_tier(tier, remaining.min(WAIT_SLICE)) {
            break true;
        }
        if shutdown.load(Ordering::SeqCst) {
            log::info!("Interrupted while waiting for {} hashes", tier);
            break false;
        }
        if remaining.is_zero() || !catalog.is_background_hashing() {
            if catalog.is_tier_complete(tier) {
                break true;
            }
            catalog.cancel_background_hashing();
            catalog.join_background_hashing();
            return Err(AppError::Timeout {
                tier,
                secs: timeout_secs,
            }
            .into());
        }
    };

    // Later tiers are not needed.
    catalog.cancel_background_hashing();
    catalog.join_background_hashing();
    Ok(completed)
}
