//! Configuration layering: defaults, TOML file, environment, CLI flags.

use clap::Parser;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;
use tierdupe::cli::{Cli, Commands};
use tierdupe::config::Config;
use tierdupe::scanner::HashTier;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all TIERDUPE_* variables so tests do not see each other.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("TIERDUPE_") {
            std::env::remove_var(key);
        }
    }
}

fn scan_config(args: &[&str], base: Config) -> Config {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut config = base;
    match &cli.command {
        Commands::Scan(scan) => config.merge_scan_args(scan),
        Commands::Config => panic!("Expected Scan command"),
    }
    config
}

#[test]
fn test_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(dir.path().join("absent.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
io_threads = 8
tier = "quick"
include_singletons = true
quick_sample_size = 1024
ignore_patterns = ["*.tmp", "target/"]
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path);
    assert_eq!(config.io_threads, 8);
    assert_eq!(config.tier, HashTier::Quick);
    assert!(config.include_singletons);
    assert_eq!(config.quick_sample_size, 1024);
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "target/"]);
    assert_eq!(config.wait_timeout_secs, 600);
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = 8\ntier = \"size\"\n").unwrap();

    std::env::set_var("TIERDUPE_IO_THREADS", "16");
    let config = Config::load_from_path(&path);
    clear_env();

    assert_eq!(config.io_threads, 16);
    assert_eq!(config.tier, HashTier::Size);

    let merged = scan_config(
        &["tierdupe", "scan", "/p", "--io-threads", "2", "--tier", "full"],
        config,
    );
    assert_eq!(merged.io_threads, 2);
    assert_eq!(merged.tier, HashTier::Full);
}

#[test]
fn test_invalid_value_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = \"eight\"\n").unwrap();

    let config = Config::load_from_path(&path);
    assert_eq!(config.io_threads, 4);
}

#[test]
fn test_zero_values_are_clamped() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = 0\nquick_sample_size = 0\n").unwrap();

    let config = Config::load_from_path(&path);
    assert_eq!(config.io_threads, 1);
    assert_eq!(config.quick_sample_size, 1);

    let merged = scan_config(&["tierdupe", "scan", "/p", "--io-threads", "0"], config);
    assert_eq!(merged.io_threads, 1);
}

#[test]
fn test_cli_flags_only_add() {
    let base = Config {
        follow_symlinks: true,
        ignore_patterns: vec!["*.bak".to_string()],
        min_size: Some(10),
        ..Config::default()
    };
    let merged = scan_config(
        &[
            "tierdupe",
            "scan",
            "/p",
            "--skip-hidden",
            "--ignore",
            "*.log",
            "--quick-bytes",
            "8KiB",
            "--timeout",
            "5",
        ],
        base,
    );

    assert!(merged.follow_symlinks);
    assert!(merged.skip_hidden);
    assert_eq!(merged.ignore_patterns, vec!["*.bak", "*.log"]);
    assert_eq!(merged.min_size, Some(10));
    assert_eq!(merged.quick_sample_size, 8192);
    assert_eq!(merged.wait_timeout_secs, 5);

    let walker = merged.walker_config();
    assert!(walker.skip_hidden);
    assert_eq!(walker.min_size, Some(10));
}

#[test]
fn test_save_and_reload() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = Config {
        tier: HashTier::Quick,
        max_size: Some(1 << 30),
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from_path(&path), config);
}
