//! The access layer's entry point.
//!
//! An [`AccessClient`] owns one backend handle, chosen once when the client
//! is built, and the configuration it was built from. Every query and write
//! goes through it; there is no global connection state.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::backend::{Cell, RestBackend, ScannerSpec, StorageBackend};
use crate::config::AccessConfig;
use crate::error::{Error, Result};
use crate::filter::FilterCompiler;
use crate::projection::Projection;
use crate::query::{CellWrite, LoadRangeRequest, PutRequest};
use crate::result::ResultSet;
use crate::rowkey::range_bounds;
use crate::scan::{batch_size, ScanCursor, ScanOrchestrator, ScanState};
use crate::schema::{DataType, TableSchema};

/// Row key used by [`AccessClient::get_row`] when none is given.
pub const ALL_ROWS: &str = "*";

/// Query and write client over one storage backend.
#[derive(Clone)]
pub struct AccessClient {
    orchestrator: ScanOrchestrator,
    backend: Arc<dyn StorageBackend>,
    config: AccessConfig,
}

impl AccessClient {
    /// Validates `config` and connects to one of its REST endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration.
    pub fn connect(config: AccessConfig) -> Result<Self> {
        config.validate()?;
        let backend = RestBackend::connect(&config.connection)?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Creates a client over an existing backend.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: AccessConfig) -> Self {
        info!("Access client ready on {}", backend.endpoint());
        Self {
            orchestrator: ScanOrchestrator::new(Arc::clone(&backend)),
            backend,
            config,
        }
    }

    /// Backend handle shared by every call.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Loads one page of a stream's rows.
    ///
    /// Pass the returned `scannerId` back through
    /// [`LoadRangeRequest::with_cursor`] to fetch the next page; an exhausted
    /// scan returns an empty result with no cursor. Columns referenced by the
    /// constraint are fetched for filtering even when they are not output
    /// columns.
    ///
    /// # Errors
    ///
    /// Validation and syntax problems are reported before the backend is
    /// contacted. Backend failures name the scanner that was deleted.
    pub async fn load_range(&self, request: &LoadRangeRequest) -> Result<ResultSet> {
        request.validate()?;
        let table = request.table_name();

        let mut query_only = request.query_only_columns.clone();
        if let Some(constraint) = &request.constraint {
            for column in constraint.columns() {
                query_only.push(',');
                query_only.push_str(&column);
            }
        }
        let projection =
            Projection::resolve(&request.columns, &query_only, request.data_type.family())?;
        let bounds = range_bounds(&request.stream_id, request.from, request.to)?;
        let filter = request
            .constraint
            .as_ref()
            .map(|c| FilterCompiler::new(request.data_type).compile(c));

        // Hidden columns count against the cell budget too.
        let spec = ScannerSpec {
            batch: batch_size(request.limit, projection.qualifiers().len()),
            start_row: bounds.start_row,
            end_row: bounds.end_row,
            columns: projection.qualifiers(),
            filter,
        };
        debug!(
            "load_range on '{table}' stream={} columns={:?}",
            request.stream_id,
            projection.qualifiers()
        );

        let page = self.orchestrator.execute(&table, &request.cursor, &spec).await?;
        if page.state == ScanState::Exhausted {
            return Ok(ResultSet::exhausted());
        }
        Ok(ResultSet::transform(
            &page.cells,
            &projection,
            self.config.scan.split_row_identity,
            page.cursor,
        ))
    }

    /// Deletes the scanner behind a cursor the caller no longer needs.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the scanner cannot be deleted.
    pub async fn abandon_scan(&self, table: &str, data_type: DataType, cursor: &ScanCursor) -> Result<()> {
        self.orchestrator
            .abandon(&data_type.table_name(table), cursor)
            .await
    }

    /// Creates the table holding `data_type` records under `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty name, or the backend error.
    pub async fn create_table(&self, table: &str, data_type: DataType) -> Result<()> {
        if table.trim().is_empty() {
            return Err(Error::Validation("missing required option 'table'".to_string()));
        }
        self.backend
            .create_table(&TableSchema::for_type(table, data_type))
            .await
    }

    /// Writes several columns of one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid request, or the backend
    /// error.
    pub async fn put_value(&self, table: &str, request: &PutRequest) -> Result<()> {
        request.validate()?;
        let timestamp = request.timestamp.unwrap_or_else(now_millis);
        let family = request.data_type.family();
        let cells: Vec<Cell> = request
            .values
            .iter()
            .map(|(column, value)| {
                Cell::new(
                    request.row_key.as_str(),
                    format!("{family}:{column}"),
                    timestamp,
                    value.as_str(),
                )
            })
            .collect();

        let table = request.data_type.table_name(table);
        self.backend.put_cells(&table, &cells).await?;
        debug!("Data for row {} stored in '{table}'", request.row_key);
        Ok(())
    }

    /// Writes cells that may span several rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid cell, or the backend
    /// error.
    pub async fn put_cells(&self, table: &str, data_type: DataType, writes: &[CellWrite]) -> Result<()> {
        for write in writes {
            write.validate()?;
        }
        let now = now_millis();
        let family = data_type.family();
        let cells: Vec<Cell> = writes
            .iter()
            .map(|w| {
                Cell::new(
                    w.row_key.as_str(),
                    format!("{family}:{}", w.column),
                    w.timestamp.unwrap_or(now),
                    w.value.as_str(),
                )
            })
            .collect();

        let table = data_type.table_name(table);
        self.backend.put_cells(&table, &cells).await?;
        debug!("Bulk data ({} cell(s)) stored in '{table}'", cells.len());
        Ok(())
    }

    /// Reads `columns` of one row, or of every row matching a `prefix*`
    /// pattern. No row key means every row.
    ///
    /// Rows are keyed `timestamp:nodeId` and the result carries no cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty column list, or the
    /// backend error.
    pub async fn get_row(
        &self,
        table: &str,
        data_type: DataType,
        row_key: Option<&str>,
        columns: &str,
    ) -> Result<ResultSet> {
        let projection = Projection::resolve(columns, "", data_type.family())?;
        let row_key = row_key.filter(|k| !k.is_empty()).unwrap_or(ALL_ROWS);
        let table = data_type.table_name(table);

        let cells = self
            .backend
            .get_row(&table, row_key, &projection.qualifiers())
            .await?;
        debug!("Read {} cell(s) for row {row_key} from '{table}'", cells.len());
        Ok(ResultSet::transform(&cells, &projection, true, ScanCursor::new()))
    }
}

impl std::fmt::Debug for AccessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessClient")
            .field("endpoint", &self.backend.endpoint())
            .field("config", &self.config)
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
