use std::path::PathBuf;
use tierdupe::catalog::{CatalogError, FileCatalog};
use tierdupe::error::{AppError, ExitCode, StructuredError};
use tierdupe::scanner::{HashTier, ScanError};

#[test]
fn test_exit_code_values() {
    let cases = [
        (ExitCode::Success, 0, "TD000"),
        (ExitCode::GeneralError, 1, "TD001"),
        (ExitCode::NoDuplicates, 2, "TD002"),
        (ExitCode::PartialSuccess, 3, "TD003"),
        (ExitCode::Interrupted, 130, "TD130"),
    ];
    for (code, num, prefix) in cases {
        assert_eq!(code.as_i32(), num);
        assert_eq!(code.code_prefix(), prefix);
    }
}

#[test]
fn test_catalog_errors_are_general_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = FileCatalog::new(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidRoot(_)));

    let err = anyhow::Error::new(AppError::from(err));
    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    assert_eq!(structured.code, "TD001");
    assert!(structured.message.starts_with("Invalid scan root: "));
}

#[test]
fn test_structured_error_includes_causes() {
    let err = anyhow::Error::new(AppError::Scan(ScanError::NotADirectory(PathBuf::from(
        "/etc/hosts",
    ))))
    .context("scan failed");
    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    assert_eq!(structured.message, "scan failed: Not a directory: /etc/hosts");
}

#[test]
fn test_timeout_message() {
    let err = AppError::Timeout {
        tier: HashTier::Quick,
        secs: 3,
    };
    assert_eq!(err.to_string(), "Timed out after 3s waiting for quick hashes");
}
