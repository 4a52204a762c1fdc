//! Tests for the in-memory backend.

use super::*;
use crate::filter::FilterCompiler;
use crate::schema::DataType;
use serde_json::json;

const TABLE: &str = "iot_stream_realtime";

async fn seeded() -> MemoryBackend {
    let backend = MemoryBackend::new().with_table(&TableSchema::for_type("iot", DataType::Data));
    backend
        .put_cells(
            TABLE,
            &[
                Cell::new("s:1:a", "DF:x", 10, "1"),
                Cell::new("s:1:a", "DF:y", 10, "q"),
                Cell::new("s:2:a", "DF:x", 20, "2"),
                Cell::new("s:3:a", "DF:x", 30, "3"),
                Cell::new("t:1:a", "DF:x", 40, "4"),
            ],
        )
        .await
        .unwrap();
    backend
}

fn spec(batch: usize, start: &str, end: &str) -> ScannerSpec {
    ScannerSpec {
        batch,
        start_row: start.to_string(),
        end_row: end.to_string(),
        columns: vec!["DF:x".to_string()],
        filter: None,
    }
}

async fn drain(backend: &MemoryBackend, id: &str) -> Vec<Vec<Cell>> {
    let mut batches = Vec::new();
    while let Some(cells) = backend.scanner_get(TABLE, id).await.unwrap() {
        batches.push(cells);
    }
    batches
}

#[tokio::test]
async fn test_scan_is_half_open_and_batched() {
    // Arrange
    let backend = seeded().await;

    // Act
    let id = backend
        .scanner_create(TABLE, &spec(2, "s:1", "s:3"))
        .await
        .unwrap();
    let batches = drain(&backend, &id).await;

    // Assert
    assert_eq!(batches.len(), 1);
    let rows: Vec<&str> = batches[0].iter().map(|c| c.row_key.as_str()).collect();
    assert_eq!(rows, vec!["s:1:a", "s:2:a"]);
}

#[tokio::test]
async fn test_batches_never_exceed_batch_size() {
    let backend = seeded().await;
    let id = backend
        .scanner_create(TABLE, &spec(1, "s", "t"))
        .await
        .unwrap();

    let batches = drain(&backend, &id).await;

    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|b| b.len() == 1));
}

#[tokio::test]
async fn test_scan_returns_only_requested_columns() {
    let backend = seeded().await;
    let mut spec = spec(10, "s:1", "s:2");
    spec.columns = vec!["DF:y".to_string()];

    let id = backend.scanner_create(TABLE, &spec).await.unwrap();
    let cells = backend.scanner_get(TABLE, &id).await.unwrap().unwrap();

    assert_eq!(cells, vec![Cell::new("s:1:a", "DF:y", 10, "q")]);
}

#[tokio::test]
async fn test_scan_applies_filter() {
    let backend = seeded().await;
    let mut spec = spec(10, "s", "t");
    spec.filter = Some(
        FilterCompiler::new(DataType::Data)
            .compile_json(&json!({"column": "x", "op": "IN", "$": ["1", "3"]}))
            .unwrap(),
    );

    let id = backend.scanner_create(TABLE, &spec).await.unwrap();
    let cells = backend.scanner_get(TABLE, &id).await.unwrap().unwrap();

    let values: Vec<&str> = cells.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["1", "3"]);
}

#[tokio::test]
async fn test_inverted_range_is_empty() {
    let backend = seeded().await;
    let id = backend
        .scanner_create(TABLE, &spec(10, "t", "s"))
        .await
        .unwrap();
    assert!(backend.scanner_get(TABLE, &id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_scanner_lifecycle() {
    // Arrange
    let backend = seeded().await;
    let id = backend
        .scanner_create(TABLE, &spec(10, "s", "t"))
        .await
        .unwrap();
    assert_eq!(backend.open_scanners(), 1);

    // Act
    backend.scanner_delete(TABLE, &id).await.unwrap();

    // Assert
    assert_eq!(backend.open_scanners(), 0);
    let err = backend.scanner_get(TABLE, &id).await.unwrap_err();
    assert_eq!(err.scanner_id(), Some(id.as_str()));
    assert!(backend.scanner_delete(TABLE, &id).await.is_err());
}

#[tokio::test]
async fn test_scanner_is_bound_to_its_table() {
    let backend = seeded().await;
    let id = backend
        .scanner_create(TABLE, &spec(10, "s", "t"))
        .await
        .unwrap();
    assert!(backend.scanner_get("other", &id).await.is_err());
}

#[tokio::test]
async fn test_unknown_table_is_backend_error() {
    let backend = MemoryBackend::new();
    let err = backend
        .scanner_create("missing", &spec(1, "a", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend { .. }));
}

#[tokio::test]
async fn test_put_rejects_unknown_family() {
    let backend = seeded().await;
    let err = backend
        .put_cells(TABLE, &[Cell::new("s:9:a", "EF:x", 1, "v")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("EF:x"));
}

#[tokio::test]
async fn test_get_row_exact_and_prefix() {
    let backend = seeded().await;

    let exact = backend.get_row(TABLE, "s:1:a", &[]).await.unwrap();
    let prefix = backend
        .get_row(TABLE, "s:*", &["DF:x".to_string()])
        .await
        .unwrap();
    let missing = backend.get_row(TABLE, "nope", &[]).await.unwrap();

    assert_eq!(exact.len(), 2);
    assert_eq!(prefix.len(), 3);
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_get_row_wildcard_returns_everything() {
    let backend = seeded().await;
    let cells = backend
        .get_row(TABLE, "*", &["DF:x".to_string()])
        .await
        .unwrap();
    assert_eq!(cells.len(), 4);
}

#[test]
fn test_usable_without_a_runtime() {
    let backend = MemoryBackend::new().with_table(&TableSchema::for_type("iot", DataType::Data));

    let cells = tokio_test::block_on(backend.get_row(TABLE, "*", &[])).unwrap();

    assert!(cells.is_empty());
    assert_eq!(backend.endpoint(), "memory://");
}
