//! HBase REST gateway backend.
//!
//! Row keys, qualifiers and values travel base64-encoded inside JSON
//! `CellSet` documents; scanners are addressed by the last path segment of
//! the `Location` header returned on creation.

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::backend::{Cell, ScannerSpec, StorageBackend};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::schema::{self, TableSchema};

/// Path row used when a bulk write spans several rows.
const MULTI_ROW_PLACEHOLDER: &str = "false-row-key";

const JSON: &str = "application/json";

/// `CellSet` document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CellSet {
    #[serde(rename = "Row", default)]
    rows: Vec<RowModel>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RowModel {
    key: String,
    #[serde(rename = "Cell", default)]
    cells: Vec<CellModel>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellModel {
    column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
    #[serde(rename = "$")]
    value: String,
}

/// Scanner creation document.
#[derive(Debug, Serialize)]
struct ScannerModel {
    batch: usize,
    #[serde(rename = "startRow")]
    start_row: String,
    #[serde(rename = "endRow")]
    end_row: String,
    column: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

impl ScannerModel {
    fn from_spec(spec: &ScannerSpec) -> Result<Self> {
        Ok(Self {
            batch: spec.batch,
            start_row: schema::encode(&spec.start_row),
            end_row: schema::encode(&spec.end_row),
            column: spec.columns.iter().map(|c| schema::encode(c)).collect(),
            filter: spec
                .filter
                .as_ref()
                .map(|f| f.to_json_string())
                .transpose()?,
        })
    }
}

impl CellSet {
    fn from_cells(cells: &[Cell]) -> Self {
        let mut rows: IndexMap<&str, Vec<CellModel>> = IndexMap::new();
        for cell in cells {
            rows.entry(cell.row_key.as_str())
                .or_default()
                .push(CellModel {
                    column: schema::encode(&cell.column),
                    timestamp: Some(cell.timestamp),
                    value: schema::encode(&cell.value),
                });
        }
        Self {
            rows: rows
                .into_iter()
                .map(|(key, cells)| RowModel {
                    key: schema::encode(key),
                    cells,
                })
                .collect(),
        }
    }

    fn into_cells(self) -> Result<Vec<Cell>> {
        let mut out = Vec::new();
        for row in self.rows {
            let row_key = schema::decode(&row.key)?;
            for cell in row.cells {
                out.push(Cell {
                    row_key: row_key.clone(),
                    column: schema::decode(&cell.column)?,
                    timestamp: cell.timestamp.unwrap_or_default(),
                    value: schema::decode(&cell.value)?,
                });
            }
        }
        Ok(out)
    }
}

/// Backend talking to an HBase REST gateway over HTTP.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base_url: Url,
    endpoint: String,
    client: Client,
}

impl RestBackend {
    /// Creates a backend for `base_url` using an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_url` is not a usable base URL.
    pub fn new(base_url: &str, client: Client) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid endpoint URL '{base_url}': {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "endpoint URL '{base_url}' cannot be a base"
            )));
        }
        Ok(Self {
            endpoint: base_url.trim_end_matches('/').to_string(),
            base_url: url,
            client,
        })
    }

    /// Selects one configured endpoint and builds the HTTP client for it.
    ///
    /// The choice is made once; the backend never switches endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no endpoint is configured or the client
    /// cannot be built.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let endpoint = config.selection.select(&config.endpoints)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let backend = Self::new(&endpoint.url(), client)?;
        info!(
            "Using HBase REST endpoint {} ({:?} selection)",
            backend.endpoint, config.selection
        );
        Ok(backend)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::Config(format!("endpoint '{}' cannot be a base", self.endpoint)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn send_error(&self, operation: &'static str, table: &str, err: &reqwest::Error) -> Error {
        if err.is_connect() {
            error!("[{operation}] unable to reach HBase server {}: {err}", self.endpoint);
            Error::Connection {
                endpoint: self.endpoint.clone(),
                message: err.to_string(),
                scanner_id: None,
            }
        } else {
            error!("[{operation}] request on '{table}' failed: {err}");
            Error::backend(operation, table, err.to_string())
        }
    }

    async fn status_error(operation: &'static str, table: &str, response: Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("[{operation}] HBase returned {status} for '{table}': {body}");
        Error::backend(operation, table, format!("{status}: {body}"))
    }

    async fn read_cells(operation: &'static str, table: &str, response: Response) -> Result<Vec<Cell>> {
        let body = response
            .text()
            .await
            .map_err(|e| Error::backend(operation, table, e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cell_set: CellSet = serde_json::from_str(&body)?;
        cell_set.into_cells()
    }
}

#[async_trait]
impl StorageBackend for RestBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        const OP: &str = "create_table";
        let url = self.url(&[schema.name.as_str(), "schema"])?;

        let response = self
            .client
            .put(url)
            .header(ACCEPT, JSON)
            .json(schema)
            .send()
            .await
            .map_err(|e| self.send_error(OP, &schema.name, &e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(OP, &schema.name, response).await);
        }
        info!("Table '{}' created", schema.name);
        Ok(())
    }

    async fn get_row(&self, table: &str, row_key: &str, columns: &[String]) -> Result<Vec<Cell>> {
        const OP: &str = "get_row";
        let joined = columns.join(",");
        let mut segments = vec![table, row_key];
        if !joined.is_empty() {
            segments.push(&joined);
        }
        let url = self.url(&segments)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, JSON)
            .send()
            .await
            .map_err(|e| self.send_error(OP, table, &e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => Self::read_cells(OP, table, response).await,
            _ => Err(Self::status_error(OP, table, response).await),
        }
    }

    async fn put_cells(&self, table: &str, cells: &[Cell]) -> Result<()> {
        const OP: &str = "put_cells";
        let Some(first) = cells.first() else {
            return Ok(());
        };
        let path_row = if cells.iter().all(|c| c.row_key == first.row_key) {
            first.row_key.as_str()
        } else {
            MULTI_ROW_PLACEHOLDER
        };
        let url = self.url(&[table, path_row])?;

        let response = self
            .client
            .put(url)
            .header(ACCEPT, JSON)
            .json(&CellSet::from_cells(cells))
            .send()
            .await
            .map_err(|e| self.send_error(OP, table, &e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(OP, table, response).await);
        }
        debug!("Stored {} cell(s) in '{table}'", cells.len());
        Ok(())
    }

    async fn scanner_create(&self, table: &str, spec: &ScannerSpec) -> Result<String> {
        const OP: &str = "scanner_create";
        let url = self.url(&[table, "scanner"])?;
        let model = ScannerModel::from_spec(spec)?;

        let response = self
            .client
            .put(url)
            .header(ACCEPT, JSON)
            .json(&model)
            .send()
            .await
            .map_err(|e| self.send_error(OP, table, &e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(OP, table, response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::backend(OP, table, "scanner created without a Location header"))
    }

    async fn scanner_get(&self, table: &str, scanner_id: &str) -> Result<Option<Vec<Cell>>> {
        const OP: &str = "scanner_get";
        let url = self.url(&[table, "scanner", scanner_id])?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, JSON)
            .send()
            .await
            .map_err(|e| self.send_error(OP, table, &e).with_scanner(scanner_id))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            s if s.is_success() => Self::read_cells(OP, table, response)
                .await
                .map(Some)
                .map_err(|e| e.with_scanner(scanner_id)),
            _ => Err(Self::status_error(OP, table, response)
                .await
                .with_scanner(scanner_id)),
        }
    }

    async fn scanner_delete(&self, table: &str, scanner_id: &str) -> Result<()> {
        const OP: &str = "scanner_delete";
        let url = self.url(&[table, "scanner", scanner_id])?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| self.send_error(OP, table, &e).with_scanner(scanner_id))?;

        if !response.status().is_success() {
            return Err(Self::status_error(OP, table, response)
                .await
                .with_scanner(scanner_id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
