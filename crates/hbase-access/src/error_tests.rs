//! Tests for `error` module

use super::error::*;

#[test]
fn test_error_codes_are_unique() {
    // Arrange
    let errors: Vec<Error> = vec![
        Error::Validation("test".into()),
        Error::Syntax("test".into()),
        Error::Connection {
            endpoint: "http://localhost:8080".into(),
            message: "refused".into(),
            scanner_id: None,
        },
        Error::backend("scanner_get", "t", "boom"),
        Error::Config("test".into()),
        Error::Serialization("test".into()),
    ];

    // Act
    let codes: Vec<&str> = errors.iter().map(Error::code).collect();

    // Assert
    let mut unique_codes = codes.clone();
    unique_codes.sort_unstable();
    unique_codes.dedup();
    assert_eq!(codes.len(), unique_codes.len());
    assert!(codes.iter().all(|c| c.starts_with("HBA-")));
}

#[test]
fn test_error_message_contains_code() {
    let err = Error::Validation("type required".into());
    let msg = err.to_string();
    assert!(msg.starts_with("[HBA-001]"));
    assert!(msg.contains("type required"));
}

#[test]
fn test_connection_error_hint() {
    let err = Error::Connection {
        endpoint: "http://hbase:8080".into(),
        message: "connection refused".into(),
        scanner_id: None,
    };
    assert!(err.to_string().contains("Unable to reach HBase server"));
}

#[test]
fn test_with_scanner_attaches_to_backend_errors() {
    // Arrange
    let err = Error::backend("scanner_get", "metrics_events", "404 Not Found");

    // Act
    let err = err.with_scanner("1234abcd");

    // Assert
    assert_eq!(err.scanner_id(), Some("1234abcd"));
    assert!(err.to_string().contains("metrics_events"));
}

#[test]
fn test_with_scanner_ignores_local_errors() {
    let err = Error::Syntax("{}".into()).with_scanner("abc");
    assert_eq!(err.scanner_id(), None);
    assert!(err.is_local());
}

#[test]
fn test_report_serializes_scanner_id() {
    // Arrange
    let err = Error::backend("scanner_get", "t", "gone").with_scanner("s-1");

    // Act
    let json = serde_json::to_value(err.report()).expect("serialize");

    // Assert
    assert_eq!(json["code"], "HBA-004");
    assert_eq!(json["scannerId"], "s-1");
}

#[test]
fn test_report_without_scanner_is_null() {
    let json = serde_json::to_value(Error::Validation("x".into()).report()).expect("serialize");
    assert!(json["scannerId"].is_null());
}
