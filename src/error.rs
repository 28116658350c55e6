//! Exit codes and structured error reporting.

use serde::Serialize;

use crate::catalog::CatalogError;
use crate::scanner::ScanError;

/// Process exit codes.
///
/// - 0: scan finished and duplicates were found
/// - 1: unexpected failure
/// - 2: scan finished, no duplicates
/// - 3: scan finished but some files could not be hashed
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Duplicates were found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates were found.
    NoDuplicates = 2,
    /// Completed, with per-file hashing failures.
    PartialSuccess = 3,
    /// Interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "TD000",
            Self::GeneralError => "TD001",
            Self::NoDuplicates => "TD002",
            Self::PartialSuccess => "TD003",
            Self::Interrupted => "TD130",
        }
    }
}

/// Application-level failures that are not per-file.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The scan root was rejected.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The catalog could not be created.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The requested tier did not complete in time.
    #[error("Timed out after {secs}s waiting for {tier} hashes")]
    Timeout {
        /// Tier being waited for
        tier: crate::scanner::HashTier,
        /// Configured timeout in seconds
        secs: u64,
    },
}

/// JSON form of a fatal error, printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. `"TD001"`
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Error message including its causes
    pub message: String,
}

impl StructuredError {
    /// Build from an error and the exit code chosen for it.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::HashTier;

    #[test]
    fn test_code_prefixes() {
        assert_eq!(ExitCode::Success.code_prefix(), "TD000");
        assert_eq!(ExitCode::NoDuplicates.code_prefix(), "TD002");
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_structured_error_json() {
        let err = anyhow::Error::new(AppError::Timeout {
            tier: HashTier::Full,
            secs: 5,
        });
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        let json = serde_json::to_value(&structured).unwrap();

        assert_eq!(json["code"], "TD001");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["message"], "Timed out after 5s waiting for full hashes");
    }
}
