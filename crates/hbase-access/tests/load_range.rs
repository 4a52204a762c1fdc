//! End-to-end paginated range queries.
//!
//! Drives `AccessClient::load_range` page by page against the in-memory
//! backend and against a mocked HBase REST gateway.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hbase_access::{
    AccessClient, AccessConfig, ConstraintExpression, DataType, LoadRangeRequest, MemoryBackend,
    PutRequest, RestBackend, RowKey,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM: &str = "7";

/// Client over an in-memory store holding `rows` samples of one stream.
async fn seeded_client(rows: u64) -> (AccessClient, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let client = AccessClient::with_backend(backend.clone(), AccessConfig::default());
    client
        .create_table("plant", DataType::Data)
        .await
        .expect("create table");

    for i in 0..rows {
        let ts = 1_000 + i * 10;
        let put = PutRequest {
            data_type: DataType::Data,
            row_key: RowKey::encode(STREAM, ts, "node")
                .expect("row key")
                .to_string(),
            values: vec![
                ("temp".to_string(), format!("{:02}", i)),
                ("status".to_string(), if i % 2 == 0 { "ok" } else { "alarm" }.to_string()),
            ],
            timestamp: Some(ts),
        };
        client.put_value("plant", &put).await.expect("put");
    }
    (client, backend)
}

mod memory_e2e {
    use super::*;

    #[tokio::test]
    async fn test_pages_cover_range_exactly_once() {
        let (client, backend) = seeded_client(7).await;
        let mut request = LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp").with_limit(3);

        let mut seen = Vec::new();
        let mut page_sizes = Vec::new();
        loop {
            let page = client.load_range(&request).await.expect("page");
            if !page.has_more() {
                assert_eq!(page.count, 0);
                break;
            }
            page_sizes.push(page.count);
            seen.extend(page.data.keys().cloned());
            request = request.with_cursor(page.cursor);
        }

        assert_eq!(page_sizes, vec![3, 3, 1]);
        let expected: Vec<String> = (0..7).rev().map(|i| format!("{}:node", 1_000 + i * 10)).collect();
        assert_eq!(seen, expected);
        assert_eq!(backend.open_scanners(), 0);
    }

    #[tokio::test]
    async fn test_constraint_and_time_range() {
        let (client, _) = seeded_client(6).await;
        let constraint =
            ConstraintExpression::parse(&json!({"AND": [{"column": "status", "op": "=", "$": "alarm"}]}))
                .expect("constraint");
        let request = LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp,status")
            .with_range(Some(1_010), Some(1_040))
            .with_constraint(constraint);

        let page = client.load_range(&request).await.expect("page");

        let keys: Vec<&str> = page.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1030:node", "1010:node"]);
        assert_eq!(page.columns.get("status"), Some(&1));
    }

    #[tokio::test]
    async fn test_constrained_pages_hold_full_rows() {
        let (client, backend) = seeded_client(8).await;
        let constraint =
            ConstraintExpression::parse(&json!({"column": "status", "op": "=", "$": "alarm"}))
                .expect("constraint");
        let mut request = LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp")
            .with_constraint(constraint)
            .with_limit(3);

        let mut page_sizes = Vec::new();
        loop {
            let page = client.load_range(&request).await.expect("page");
            if !page.has_more() {
                break;
            }
            page_sizes.push(page.count);
            request = request.with_cursor(page.cursor);
        }

        assert_eq!(page_sizes, vec![3, 1]);
        assert_eq!(backend.open_scanners(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_page_serializes_empty() {
        let (client, _) = seeded_client(0).await;

        let page = client
            .load_range(&LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp"))
            .await
            .expect("page");

        assert_eq!(
            serde_json::to_value(&page).expect("json"),
            json!({"columns": {}, "count": 0, "data": {}, "scannerId": null})
        );
    }
}

mod rest_e2e {
    use super::*;

    fn b64(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[tokio::test]
    async fn test_scan_protocol_against_gateway() {
        // Arrange
        let server = MockServer::start().await;
        let row_key = RowKey::encode(STREAM, 1_000, "node").expect("row key").to_string();
        Mock::given(method("PUT"))
            .and(path("/plant_stream_realtime/scanner"))
            .respond_with(
                ResponseTemplate::new(201).insert_header(
                    "Location",
                    format!("{}/plant_stream_realtime/scanner/s-1", server.uri()).as_str(),
                ),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/plant_stream_realtime/scanner/s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Row": [{
                "key": b64(&row_key),
                "Cell": [{"column": b64("DF:temp"), "timestamp": 1000, "$": b64("21")}]
            }]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/plant_stream_realtime/scanner/s-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/plant_stream_realtime/scanner/s-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri(), reqwest::Client::new()).expect("backend");
        let client = AccessClient::with_backend(Arc::new(backend), AccessConfig::default());
        let request = LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp");

        // Act
        let first = client.load_range(&request).await.expect("first page");
        let second = client
            .load_range(&request.clone().with_cursor(first.cursor.clone()))
            .await
            .expect("second page");

        // Assert
        assert_eq!(first.cursor.scanner_id(), Some("s-1"));
        assert_eq!(first.data["1000:node"]["temp"], "21");
        assert_eq!(second.count, 0);
        assert!(second.cursor.scanner_id().is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_reports_scanner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/plant_stream_realtime/scanner/s-9"))
            .respond_with(ResponseTemplate::new(500).set_body_string("region offline"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/plant_stream_realtime/scanner/s-9"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = RestBackend::new(&server.uri(), reqwest::Client::new()).expect("backend");
        let client = AccessClient::with_backend(Arc::new(backend), AccessConfig::default());
        let request = LoadRangeRequest::new("plant", DataType::Data, STREAM, "temp")
            .with_cursor(hbase_access::ScanCursor::resume("s-9"));

        let err = client.load_range(&request).await.expect_err("failure");

        let report = serde_json::to_value(err.report()).expect("json");
        assert_eq!(report["code"], "HBA-004");
        assert_eq!(report["scannerId"], "s-9");
    }
}
