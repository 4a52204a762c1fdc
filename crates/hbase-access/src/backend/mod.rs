//! Storage backend capability contract.
//!
//! The access layer only ever talks to the store through [`StorageBackend`].
//! [`rest::RestBackend`] speaks to an HBase REST gateway;
//! [`memory::MemoryBackend`] keeps everything in process.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::CompiledFilter;
use crate::schema::TableSchema;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// One stored cell, with every field decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Row key.
    pub row_key: String,
    /// Qualifier, `family:column`.
    pub column: String,
    /// Cell timestamp in milliseconds.
    pub timestamp: u64,
    /// Cell value.
    pub value: String,
}

impl Cell {
    /// Creates a cell.
    pub fn new(
        row_key: impl Into<String>,
        column: impl Into<String>,
        timestamp: u64,
        value: impl Into<String>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            column: column.into(),
            timestamp,
            value: value.into(),
        }
    }
}

/// Options a scanner is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerSpec {
    /// Maximum cells returned per fetch.
    pub batch: usize,
    /// First row, inclusive.
    pub start_row: String,
    /// Last row, exclusive.
    pub end_row: String,
    /// Qualifiers to fetch.
    pub columns: Vec<String>,
    /// Optional server-side filter.
    pub filter: Option<CompiledFilter>,
}

/// Primitive operations of a column-family store.
///
/// Implementations must be cheap to share behind an `Arc`; the access layer
/// establishes one backend at startup and reuses it for every request.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Endpoint description used in logs and connection errors.
    fn endpoint(&self) -> &str;

    /// Creates a table.
    async fn create_table(&self, schema: &TableSchema) -> Result<()>;

    /// Reads the cells of one row (or of a `prefix*` row glob).
    ///
    /// An unknown row yields no cells.
    async fn get_row(&self, table: &str, row_key: &str, columns: &[String]) -> Result<Vec<Cell>>;

    /// Writes cells, possibly spanning several rows.
    async fn put_cells(&self, table: &str, cells: &[Cell]) -> Result<()>;

    /// Opens a scanner and returns its id.
    async fn scanner_create(&self, table: &str, spec: &ScannerSpec) -> Result<String>;

    /// Fetches the next batch. `None` means the scanner is exhausted.
    async fn scanner_get(&self, table: &str, scanner_id: &str) -> Result<Option<Vec<Cell>>>;

    /// Releases a scanner.
    async fn scanner_delete(&self, table: &str, scanner_id: &str) -> Result<()>;
}
