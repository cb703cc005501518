//! Unit tests for lims-rdbc error module

use lims_rdbc::error::{Error, ErrorCategory};
use std::error::Error as _;

#[test]
fn test_error_connection() {
    let err = Error::connection("Failed to connect");

    assert_eq!(err.category(), ErrorCategory::Connection);
    assert!(err.to_string().contains("Failed to connect"));
    assert!(err.is_retriable());
}

#[test]
fn test_error_connection_keeps_source() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = Error::connection_with_source("failed to connect", io);

    assert!(err.source().is_some());
    assert!(err.source().unwrap().to_string().contains("refused"));
}

#[test]
fn test_error_config() {
    let err = Error::config("Invalid URL format");

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("Invalid URL format"));
    assert!(!err.is_retriable());
}

#[test]
fn test_error_query_keeps_statement_and_source() {
    let cause = std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "relation \"slides\" does not exist",
    );
    let err = Error::query("relation missing", "SELECT jp2 FROM slides", cause);

    assert_eq!(err.category(), ErrorCategory::Query);
    assert!(!err.is_retriable());
    assert!(err.source().unwrap().to_string().contains("slides"));
    match err {
        Error::Query { sql, .. } => assert_eq!(sql.as_deref(), Some("SELECT jp2 FROM slides")),
        other => panic!("expected Query, got {:?}", other),
    }
}

#[test]
fn test_error_timeout() {
    let err = Error::timeout("Query timeout after 30s");

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert!(err.to_string().contains("timeout"));
    assert!(err.is_retriable());
}

#[test]
fn test_error_authentication() {
    let err = Error::authentication("password authentication failed for user \"reader\"");

    assert_eq!(err.category(), ErrorCategory::Authentication);
    assert!(!err.is_retriable());
}

#[test]
fn test_error_type_conversion() {
    let err = Error::type_conversion("Cannot convert BYTEA to f64");

    assert_eq!(err.category(), ErrorCategory::TypeConversion);
    assert!(err.to_string().contains("Cannot convert"));
}

#[test]
fn test_error_category_display() {
    assert_eq!(ErrorCategory::Connection.to_string(), "connection");
    assert_eq!(ErrorCategory::TypeConversion.to_string(), "type_conversion");
}
