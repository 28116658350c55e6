//! Output formatters for scan results.
//!
//! - [`text`]: human-readable report for the terminal
//! - [`json`]: machine-readable document for scripting
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::catalog::FileCatalog;
//! use tierdupe::duplicates::ScanSummary;
//! use tierdupe::error::ExitCode;
//! use tierdupe::output::JsonOutput;
//! use tierdupe::scanner::HashTier;
//!
//! let catalog = FileCatalog::new(".").unwrap();
//! catalog.compute_tier(HashTier::Full);
//! let set = catalog.group(HashTier::Full, false);
//!
//! let output = JsonOutput::new(&set, &ScanSummary::default(), ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
