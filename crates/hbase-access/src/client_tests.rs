//! Tests for `client` module

use crate::backend::{MemoryBackend, StorageBackend};
use crate::client::*;
use crate::config::AccessConfig;
use crate::error::Error;
use crate::filter::ConstraintExpression;
use crate::query::{CellWrite, LoadRangeRequest, PutRequest};
use crate::rowkey::RowKey;
use crate::schema::DataType;
use serde_json::json;
use std::sync::Arc;

async fn client() -> (AccessClient, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let client = AccessClient::with_backend(backend.clone(), AccessConfig::default());
    client.create_table("iot", DataType::Data).await.unwrap();
    (client, backend)
}

async fn seed(client: &AccessClient, stream: &str, ts: u64, node: &str, a: &str, level: &str) {
    let row_key = RowKey::encode(stream, ts, node).unwrap().to_string();
    let put = PutRequest {
        data_type: DataType::Data,
        row_key,
        values: vec![
            ("a".to_string(), a.to_string()),
            ("level".to_string(), level.to_string()),
        ],
        timestamp: Some(ts),
    };
    client.put_value("iot", &put).await.unwrap();
}

#[tokio::test]
async fn test_load_range_newest_first() {
    // Arrange
    let (client, _) = client().await;
    seed(&client, "42", 1_000, "n1", "old", "1").await;
    seed(&client, "42", 2_000, "n1", "new", "1").await;
    seed(&client, "43", 3_000, "n1", "other", "1").await;

    // Act
    let result = client
        .load_range(&LoadRangeRequest::new("iot", DataType::Data, "42", "a"))
        .await
        .unwrap();

    // Assert
    let keys: Vec<&str> = result.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["2000:n1", "1000:n1"]);
    assert_eq!(result.count, 2);
}

#[tokio::test]
async fn test_load_range_time_bounds_are_inclusive() {
    let (client, _) = client().await;
    for ts in [1_000, 2_000, 3_000, 4_000] {
        seed(&client, "42", ts, "n", "v", "1").await;
    }

    let result = client
        .load_range(
            &LoadRangeRequest::new("iot", DataType::Data, "42", "a")
                .with_range(Some(2_000), Some(3_000)),
        )
        .await
        .unwrap();

    let keys: Vec<&str> = result.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["3000:n", "2000:n"]);
}

#[tokio::test]
async fn test_load_range_constraint_column_is_fetched_but_hidden() {
    let (client, _) = client().await;
    seed(&client, "42", 1_000, "n1", "x", "1").await;
    seed(&client, "42", 1_000, "n2", "y", "5").await;
    let constraint =
        ConstraintExpression::parse(&json!({"column": "level", "op": ">", "$": "3"})).unwrap();

    let result = client
        .load_range(
            &LoadRangeRequest::new("iot", DataType::Data, "42", "a").with_constraint(constraint),
        )
        .await
        .unwrap();

    assert_eq!(result.count, 1);
    assert_eq!(result.data["1000:n2"].get("a").map(String::as_str), Some("y"));
    assert!(!result.data["1000:n2"].contains_key("level"));
}

#[tokio::test]
async fn test_load_range_validation_precedes_backend() {
    let backend = Arc::new(MemoryBackend::new());
    let client = AccessClient::with_backend(backend, AccessConfig::default());

    let err = client
        .load_range(&LoadRangeRequest::new("iot", DataType::Data, "42", " , "))
        .await
        .unwrap_err();

    assert!(err.is_local());
}

#[tokio::test]
async fn test_load_range_unknown_table_is_backend_error() {
    let backend = Arc::new(MemoryBackend::new());
    let client = AccessClient::with_backend(backend, AccessConfig::default());

    let err = client
        .load_range(&LoadRangeRequest::new("iot", DataType::Event, "42", "a"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "HBA-004");
}

#[tokio::test]
async fn test_full_row_identity_when_split_is_disabled() {
    let backend = Arc::new(MemoryBackend::new());
    let mut config = AccessConfig::default();
    config.scan.split_row_identity = false;
    let client = AccessClient::with_backend(backend, config);
    client.create_table("iot", DataType::Data).await.unwrap();
    seed(&client, "42", 1_000, "n1", "x", "1").await;

    let result = client
        .load_range(&LoadRangeRequest::new("iot", DataType::Data, "42", "a"))
        .await
        .unwrap();

    let expected = RowKey::encode("42", 1_000, "n1").unwrap().to_string();
    assert!(result.data.contains_key(&expected));
}

#[tokio::test]
async fn test_put_cells_and_get_row() {
    // Arrange
    let (client, _) = client().await;
    let mut writes = vec![CellWrite::new("r1", "a", "1"), CellWrite::new("r2", "a", "2")];
    writes[0].timestamp = Some(10);
    writes[1].timestamp = Some(20);

    // Act
    client.put_cells("iot", DataType::Data, &writes).await.unwrap();
    let all = client.get_row("iot", DataType::Data, None, "a").await.unwrap();
    let one = client
        .get_row("iot", DataType::Data, Some("r2"), "a")
        .await
        .unwrap();

    // Assert
    assert_eq!(all.count, 2);
    assert!(all.cursor.scanner_id().is_none());
    assert_eq!(one.data["20:"].get("a").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_put_value_requires_values() {
    let (client, _) = client().await;
    let put = PutRequest {
        data_type: DataType::Data,
        row_key: "r".to_string(),
        values: Vec::new(),
        timestamp: None,
    };
    assert!(matches!(
        client.put_value("iot", &put).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_abandon_scan() {
    let (client, backend) = client().await;
    for ts in [1_000, 2_000] {
        seed(&client, "42", ts, "n", "v", "1").await;
    }
    let first = client
        .load_range(&LoadRangeRequest::new("iot", DataType::Data, "42", "a").with_limit(1))
        .await
        .unwrap();
    assert_eq!(backend.open_scanners(), 1);

    client
        .abandon_scan("iot", DataType::Data, &first.cursor)
        .await
        .unwrap();

    assert_eq!(backend.open_scanners(), 0);
}

#[test]
fn test_connect_rejects_invalid_config() {
    let mut config = AccessConfig::default();
    config.connection.endpoints.clear();
    assert!(matches!(AccessClient::connect(config), Err(Error::Config(_))));
}

#[test]
fn test_connect_builds_rest_backend() {
    let client = AccessClient::connect(AccessConfig::default()).unwrap();
    assert_eq!(client.backend().endpoint(), "http://localhost:8080");
}

#[tokio::test]
async fn test_limit_counts_rows_when_constraint_columns_are_fetched() {
    // Arrange
    let (client, backend) = client().await;
    for (ts, level) in [(1_000, "4"), (2_000, "5"), (3_000, "6"), (4_000, "7")] {
        seed(&client, "42", ts, "n", "v", level).await;
    }
    let constraint =
        ConstraintExpression::parse(&json!({"column": "level", "op": ">", "$": "3"})).unwrap();
    let mut request = LoadRangeRequest::new("iot", DataType::Data, "42", "a")
        .with_constraint(constraint)
        .with_limit(1);

    // Act
    let mut page_counts = Vec::new();
    loop {
        let page = client.load_range(&request).await.unwrap();
        if !page.has_more() {
            assert_eq!(page.count, 0);
            break;
        }
        page_counts.push(page.count);
        request = request.with_cursor(page.cursor);
    }

    // Assert
    assert_eq!(page_counts, vec![1, 1, 1, 1]);
    assert_eq!(backend.open_scanners(), 0);
}

#[tokio::test]
async fn test_limit_counts_rows_with_query_only_columns() {
    let (client, _) = client().await;
    for ts in [1_000, 2_000, 3_000] {
        seed(&client, "42", ts, "n", "v", "1").await;
    }

    let page = client
        .load_range(
            &LoadRangeRequest::new("iot", DataType::Data, "42", "a")
                .with_query_only_columns("level")
                .with_limit(2),
        )
        .await
        .unwrap();

    let keys: Vec<&str> = page.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["3000:n", "2000:n"]);
    assert!(page.has_more());
}
