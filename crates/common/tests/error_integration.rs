//! Integration tests for `postbridge_common::error`.

use postbridge_common::error::{CommonError, ErrorClassification, ErrorSeverity};

/// No common error is retryable; only invariant breaks are critical.
#[test]
fn classification_matrix_matches_expected_contract() {
    let json = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
    let cases = vec![
        (CommonError::config("http.max_attempts", "must be >= 1"), ErrorSeverity::Error, false),
        (CommonError::from(json), ErrorSeverity::Error, false),
        (CommonError::internal("broken invariant"), ErrorSeverity::Critical, true),
    ];

    for (err, severity, critical) in cases {
        assert!(!err.is_retryable(), "{err}");
        assert_eq!(err.severity(), severity, "{err}");
        assert_eq!(err.is_critical(), critical, "{err}");
    }
}

#[test]
fn toml_errors_convert_to_serialization() {
    let parse = toml::from_str::<toml::Table>("= broken").unwrap_err();
    let err: CommonError = parse.into();
    assert_eq!(err.error_type_name(), "serialization");
    assert!(err.to_string().starts_with("TOML serialization error"));
}
