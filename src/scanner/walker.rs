//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] is the discovery side of a scan: it traverses a root directory
//! and yields the paths of regular files that pass the configured filters.
//! Those paths are fed to [`crate::catalog::FileCatalog::add_file`], which
//! re-validates them.
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: Some(1024),
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{ScanError, WalkerConfig};

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns and a root .gitignore.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.exists() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let normalized = if cfg!(windows) {
            relative.to_string_lossy().replace('\\', "/")
        } else {
            relative.to_string_lossy().into_owned()
        };
        gi.matched_path_or_any_parents(normalized, is_dir).is_ignore()
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        self.config.min_size.map_or(true, |min| size >= min)
            && self.config.max_size.map_or(true, |max| size <= max)
    }

    /// Check that the walk root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
    pub fn validate_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ScanError::NotFound(self.root.clone()))
            }
            Err(e) => Err(self.io_error(self.root.clone(), e)),
        }
    }

    /// Walk the directory tree, yielding regular file paths.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Children are visited in sorted order.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .sort(true);

        walk_dir
            .into_iter()
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                        let err = match e.into_io_error() {
                            Some(io) => self.io_error(path, io),
                            None => ScanError::Io {
                                path,
                                source: std::io::Error::other("filesystem loop detected"),
                            },
                        };
                        return Some(Err(err));
                    }
                };

                let path = entry.path();
                let file_type = entry.file_type();
                if path == self.root || file_type.is_dir() {
                    return None;
                }
                if self.should_ignore(&path, false, &gitignore) {
                    log::trace!("Ignoring file: {}", path.display());
                    return None;
                }
                if file_type.is_symlink() && !self.config.follow_symlinks {
                    log::trace!("Skipping symlink: {}", path.display());
                    return None;
                }

                let metadata = match std::fs::metadata(&path) {
                    Ok(m) => m,
                    Err(e) => return Some(Err(self.io_error(path, e))),
                };
                if !metadata.is_file() {
                    return None;
                }
                if !self.passes_size_filter(metadata.len()) {
                    log::trace!(
                        "Skipping file due to size filter ({}): {}",
                        metadata.len(),
                        path.display()
                    );
                    return None;
                }

                Some(Ok(path))
            })
    }

    fn io_error(&self, path: PathBuf, e: std::io::Error) -> ScanError {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            std::io::ErrorKind::NotFound => ScanError::NotFound(path),
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), e);
                ScanError::Io { path, source: e }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaaa").unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), b"bb").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        dir
    }

    fn collect(walker: &Walker) -> Vec<String> {
        let mut names: Vec<String> = walker
            .walk()
            .filter_map(Result::ok)
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_walk_finds_nested_files() {
        let dir = setup();
        let walker = Walker::new(dir.path(), WalkerConfig::default());
        assert_eq!(collect(&walker), vec![".hidden", "a.txt", "b.txt", "big.bin"]);
    }

    #[test]
    fn test_walk_skip_hidden() {
        let dir = setup();
        let config = WalkerConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let walker = Walker::new(dir.path(), config);
        assert!(!collect(&walker).contains(&".hidden".to_string()));
    }

    #[test]
    fn test_walk_size_filters() {
        let dir = setup();
        let config = WalkerConfig {
            min_size: Some(3),
            max_size: Some(1024),
            ..Default::default()
        };
        let walker = Walker::new(dir.path(), config);
        assert_eq!(collect(&walker), vec!["a.txt"]);
    }

    #[test]
    fn test_walk_ignore_patterns() {
        let dir = setup();
        let config = WalkerConfig {
            ignore_patterns: vec!["*.bin".to_string(), "sub/".to_string()],
            ..Default::default()
        };
        let walker = Walker::new(dir.path(), config);
        assert_eq!(collect(&walker), vec![".hidden", "a.txt"]);
    }

    #[test]
    fn test_walk_stops_on_shutdown() {
        let dir = setup();
        let walker = Walker::new(dir.path(), WalkerConfig::default())
            .with_shutdown_flag(Arc::new(AtomicBool::new(true)));
        assert!(collect(&walker).is_empty());
    }

    #[test]
    fn test_validate_root() {
        let dir = setup();
        assert!(Walker::new(dir.path(), WalkerConfig::default())
            .validate_root()
            .is_ok());

        let file = dir.path().join("a.txt");
        assert!(matches!(
            Walker::new(&file, WalkerConfig::default()).validate_root(),
            Err(ScanError::NotADirectory(_))
        ));

        let missing = dir.path().join("nope");
        assert!(matches!(
            Walker::new(&missing, WalkerConfig::default()).validate_root(),
            Err(ScanError::NotFound(_))
        ));
    }
}
