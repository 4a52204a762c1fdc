//! Request types accepted by [`AccessClient`](crate::client::AccessClient).
//!
//! Every request is checked by `validate()` before anything reaches the
//! backend, so malformed input always surfaces as [`Error::Validation`].

use crate::error::{Error, Result};
use crate::filter::ConstraintExpression;
use crate::rowkey::{MAX_TIMESTAMP, SEPARATOR};
use crate::scan::ScanCursor;
use crate::schema::DataType;

/// Range query over one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRangeRequest {
    /// Base table name; the record type adds the suffix.
    pub table: String,
    /// Record type, selecting table suffix and column family.
    pub data_type: DataType,
    /// Stream whose rows are scanned.
    pub stream_id: String,
    /// Comma-separated output columns.
    pub columns: String,
    /// Comma-separated columns fetched only for filtering.
    pub query_only_columns: String,
    /// Oldest timestamp, inclusive.
    pub from: Option<u64>,
    /// Newest timestamp, inclusive.
    pub to: Option<u64>,
    /// Optional row constraint.
    pub constraint: Option<ConstraintExpression>,
    /// Maximum rows per page, capped at 200.
    pub limit: Option<usize>,
    /// Continuation token from the previous page.
    pub cursor: ScanCursor,
}

impl LoadRangeRequest {
    /// Creates a request for the first page of `columns` on one stream.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        data_type: DataType,
        stream_id: impl Into<String>,
        columns: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            data_type,
            stream_id: stream_id.into(),
            columns: columns.into(),
            query_only_columns: String::new(),
            from: None,
            to: None,
            constraint: None,
            limit: None,
            cursor: ScanCursor::new(),
        }
    }

    /// Sets the columns fetched only for filtering.
    #[must_use]
    pub fn with_query_only_columns(mut self, columns: impl Into<String>) -> Self {
        self.query_only_columns = columns.into();
        self
    }

    /// Sets the time range.
    #[must_use]
    pub fn with_range(mut self, from: Option<u64>, to: Option<u64>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Sets the row constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: ConstraintExpression) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continues the scan behind `cursor`.
    #[must_use]
    pub fn with_cursor(mut self, cursor: ScanCursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Full table name, base name plus the type suffix.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.data_type.table_name(&self.table)
    }

    /// Checks every option that can be checked without the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing table, stream or column
    /// list, a zero limit, timestamps beyond [`MAX_TIMESTAMP`], or `from`
    /// after `to`.
    pub fn validate(&self) -> Result<()> {
        require("table", &self.table)?;
        require("stream_id", &self.stream_id)?;
        require("columns", &self.columns)?;
        if self.stream_id.contains(SEPARATOR) {
            return Err(Error::Validation(format!(
                "stream_id '{}' must not contain '{SEPARATOR}'",
                self.stream_id
            )));
        }
        if self.limit == Some(0) {
            return Err(Error::Validation("limit must be greater than 0".to_string()));
        }
        for (name, ts) in [("from", self.from), ("to", self.to)] {
            if ts.is_some_and(|ts| ts > MAX_TIMESTAMP) {
                return Err(Error::Validation(format!(
                    "{name} exceeds the maximum timestamp {MAX_TIMESTAMP}"
                )));
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::Validation(format!(
                    "from ({from}) must not be after to ({to})"
                )));
            }
        }
        Ok(())
    }
}

/// Single-row write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    /// Record type, selecting the column family.
    pub data_type: DataType,
    /// Row key written to.
    pub row_key: String,
    /// `(column, value)` pairs; columns are unqualified.
    pub values: Vec<(String, String)>,
    /// Cell timestamp in milliseconds; the current time when absent.
    pub timestamp: Option<u64>,
}

impl PutRequest {
    /// Checks the request before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty row key, no values, or an
    /// empty column name.
    pub fn validate(&self) -> Result<()> {
        require("row_key", &self.row_key)?;
        if self.values.is_empty() {
            return Err(Error::Validation("at least one value is required".to_string()));
        }
        for (column, _) in &self.values {
            require("column", column)?;
        }
        Ok(())
    }
}

/// One cell of a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    /// Row key written to.
    pub row_key: String,
    /// Unqualified column name.
    pub column: String,
    /// Cell timestamp in milliseconds; the current time when absent.
    pub timestamp: Option<u64>,
    /// Value stored.
    pub value: String,
}

impl CellWrite {
    /// Creates a cell write stamped with the current time.
    pub fn new(row_key: impl Into<String>, column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            column: column.into(),
            timestamp: None,
            value: value.into(),
        }
    }

    /// Checks the write before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty row key or column.
    pub fn validate(&self) -> Result<()> {
        require("row_key", &self.row_key)?;
        require("column", &self.column)
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("missing required option '{name}'")));
    }
    Ok(())
}
