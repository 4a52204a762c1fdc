//! Tests for `result` module

use crate::backend::Cell;
use crate::projection::Projection;
use crate::result::*;
use crate::scan::ScanCursor;

fn projection() -> Projection {
    Projection::resolve("a,b", "q", "DF").unwrap()
}

#[test]
fn test_split_identity_and_query_only_columns() {
    // Arrange
    let cells = vec![
        Cell::new("s:100:n1", "DF:a", 100, "1"),
        Cell::new("s:100:n1", "DF:q", 100, "hidden"),
        Cell::new("s:100:n2", "DF:a", 100, "2"),
        Cell::new("s:100:n2", "DF:q", 100, "hidden"),
    ];

    // Act
    let result = ResultSet::transform(&cells, &projection(), true, ScanCursor::new());

    // Assert
    assert_eq!(result.count, 2);
    let keys: Vec<&str> = result.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["100:n1", "100:n2"]);
    assert_eq!(result.data["100:n1"].get("a").map(String::as_str), Some("1"));
    assert!(result.data.values().all(|row| !row.contains_key("q")));
}

#[test]
fn test_full_row_key_identity() {
    let cells = vec![Cell::new("s:100:n1", "DF:a", 7, "1")];
    let result = ResultSet::transform(&cells, &projection(), false, ScanCursor::new());
    assert!(result.data.contains_key("s:100:n1"));
}

#[test]
fn test_missing_node_gives_trailing_separator() {
    let cells = vec![
        Cell::new("s:100:", "DF:a", 5, "1"),
        Cell::new("s:100", "DF:b", 6, "2"),
    ];
    let result = ResultSet::transform(&cells, &projection(), true, ScanCursor::new());
    let keys: Vec<&str> = result.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["5:", "6:"]);
}

#[test]
fn test_unprojected_qualifiers_are_skipped() {
    let cells = vec![
        Cell::new("s:1:n", "DF:other", 1, "x"),
        Cell::new("s:1:n", "EF:a", 1, "y"),
    ];
    let result = ResultSet::transform(&cells, &projection(), true, ScanCursor::new());
    assert_eq!(result.count, 0);
    assert!(result.data.is_empty());
}

#[test]
fn test_columns_cover_output_columns_only() {
    let result = ResultSet::transform(&[], &projection(), true, ScanCursor::new());
    let columns: Vec<(&str, usize)> =
        result.columns.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(columns, vec![("a", 0), ("b", 1)]);
}

#[test]
fn test_serialized_shape() {
    let cells = vec![Cell::new("s:1:n", "DF:b", 1, "v")];
    let result =
        ResultSet::transform(&cells, &projection(), true, ScanCursor::resume("scan-1"));

    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "columns": {"a": 0, "b": 1},
            "count": 1,
            "data": {"1:n": {"b": "v"}},
            "scannerId": "scan-1"
        })
    );
    assert!(result.has_more());
}

#[test]
fn test_exhausted_shape() {
    let json = serde_json::to_value(ResultSet::exhausted()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"columns": {}, "count": 0, "data": {}, "scannerId": null})
    );
}
