//! Error types for `hbase-access`.
//!
//! Every operation returns the crate-wide [`Error`], whose variants map onto
//! the failure classes callers need to tell apart: local validation, query
//! syntax, an unreachable server, and failures reported by the backend.
//! Error codes follow the pattern `HBA-XXX`.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for `hbase-access` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running a query.
#[derive(Error, Debug)]
pub enum Error {
    /// A required option is missing or a value is out of range (HBA-001).
    ///
    /// Raised before any backend call.
    #[error("[HBA-001] Validation error: {0}")]
    Validation(String),

    /// Malformed constraint expression (HBA-002).
    #[error("[HBA-002] Syntax error in query {0}")]
    Syntax(String),

    /// The backend could not be reached (HBA-003).
    #[error("[HBA-003] Unable to reach HBase server at {endpoint}: {message}")]
    Connection {
        /// Endpoint the client was talking to.
        endpoint: String,
        /// Transport error detail.
        message: String,
        /// Scanner in use when the failure happened, if any.
        scanner_id: Option<String>,
    },

    /// The backend reported a failure (HBA-004).
    #[error("[HBA-004] HBase error during {operation} on '{table}': {message}")]
    Backend {
        /// Backend operation name (e.g. `scanner_get`).
        operation: &'static str,
        /// Table the operation targeted.
        table: String,
        /// Backend-provided detail.
        message: String,
        /// Scanner in use when the failure happened, if any.
        scanner_id: Option<String>,
    },

    /// Configuration error (HBA-005).
    #[error("[HBA-005] Configuration error: {0}")]
    Config(String),

    /// A backend payload could not be encoded or decoded (HBA-006).
    #[error("[HBA-006] Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Builds a [`Error::Backend`] without a scanner attached.
    pub fn backend(operation: &'static str, table: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            table: table.to_string(),
            message: message.into(),
            scanner_id: None,
        }
    }

    /// Returns the error code (e.g., "HBA-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "HBA-001",
            Self::Syntax(_) => "HBA-002",
            Self::Connection { .. } => "HBA-003",
            Self::Backend { .. } => "HBA-004",
            Self::Config(_) => "HBA-005",
            Self::Serialization(_) => "HBA-006",
        }
    }

    /// Returns the scanner that was in use when the error happened.
    #[must_use]
    pub fn scanner_id(&self) -> Option<&str> {
        match self {
            Self::Connection { scanner_id, .. } | Self::Backend { scanner_id, .. } => {
                scanner_id.as_deref()
            }
            _ => None,
        }
    }

    /// Records the scanner a backend or connection failure belongs to.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_scanner(mut self, id: &str) -> Self {
        if let Self::Connection { scanner_id, .. } | Self::Backend { scanner_id, .. } = &mut self
        {
            *scanner_id = Some(id.to_string());
        }
        self
    }

    /// Returns true if the error was raised locally, before any backend call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Syntax(_) | Self::Config(_)
        )
    }

    /// Converts the error into its structured, serializable form.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            scanner_id: self.scanner_id().map(str::to_string),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Structured error payload handed back to callers instead of a bare message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Scanner that failed, so a caller can tell which cursor is gone.
    #[serde(rename = "scannerId")]
    pub scanner_id: Option<String>,
}
