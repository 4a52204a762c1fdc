//! # `hbase-access`
//!
//! Client-side query layer for HBase-style column-family stores.
//!
//! Stream records live under sortable composite row keys
//! (`streamId:reverseTimestamp:nodeId`), so a time range over one stream is a
//! single contiguous row range returned newest first. This crate turns a
//! range query into that row range, compiles an optional JSON constraint into
//! the store's native filter grammar, pages through the result with
//! server-side scanners, and reshapes raw cells into row-keyed JSON.
//!
//! ## Features
//!
//! - **Row keys**: padded stream ids, reverse timestamps, end-key bounds
//! - **Filters**: `AND`/`OR`/`IN` constraint DSL compiled to `FilterList` trees
//! - **Pagination**: opaque `scannerId` cursors, scanners deleted on exhaustion or failure
//! - **Backends**: HBase REST gateway (`reqwest`) and an in-memory store
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hbase_access::{AccessClient, AccessConfig, DataType, LoadRangeRequest};
//!
//! let client = AccessClient::connect(AccessConfig::load()?)?;
//!
//! let mut request = LoadRangeRequest::new("iot", DataType::Data, "42", "temp,humidity")
//!     .with_range(Some(1_700_000_000_000), None)
//!     .with_limit(50);
//! loop {
//!     let page = client.load_range(&request).await?;
//!     if !page.has_more() {
//!         break;
//!     }
//!     request = request.with_cursor(page.cursor);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod client;
#[cfg(test)]
mod client_tests;
pub mod config;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod filter;
pub mod projection;
pub mod query;
pub mod result;
#[cfg(test)]
mod result_tests;
pub mod rowkey;
pub mod scan;
pub mod schema;

pub use backend::{Cell, MemoryBackend, RestBackend, ScannerSpec, StorageBackend};
pub use client::AccessClient;
pub use config::{AccessConfig, EndpointConfig, EndpointSelection};
pub use error::{Error, ErrorReport, Result};
pub use filter::{CompiledFilter, ConstraintExpression, FilterCompiler};
pub use projection::Projection;
pub use query::{CellWrite, LoadRangeRequest, PutRequest};
pub use result::ResultSet;
pub use rowkey::{range_bounds, RangeBounds, RowKey};
pub use scan::{ScanCursor, ScanOrchestrator, ScanPage, ScanState};
pub use schema::{DataType, TableSchema};
