//! Logical record types and their physical layout.
//!
//! Each [`DataType`] owns one column family and one table suffix. Queries
//! and writes never name families directly; they go through this mapping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Logical record type stored by the access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Stream samples.
    Data,
    /// Stream events.
    Event,
}

impl DataType {
    /// Physical column family code.
    #[must_use]
    pub const fn family(self) -> &'static str {
        match self {
            Self::Data => "DF",
            Self::Event => "EF",
        }
    }

    /// Column family code in the base64 form embedded into filters.
    #[must_use]
    pub fn encoded_family(self) -> String {
        encode(self.family())
    }

    /// Suffix appended to the base table name.
    #[must_use]
    pub const fn table_suffix(self) -> &'static str {
        match self {
            Self::Data => "_stream_realtime",
            Self::Event => "_events",
        }
    }

    /// Full table name for a base name, e.g. `metrics_stream_realtime`.
    #[must_use]
    pub fn table_name(self, base: &str) -> String {
        format!("{base}{}", self.table_suffix())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::Event => f.write_str("event"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DATA" => Ok(Self::Data),
            "EVENT" => Ok(Self::Event),
            other => Err(Error::Validation(format!(
                "unknown type '{other}', expected one of: data, event"
            ))),
        }
    }
}

/// Table layout sent to the backend on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Full table name.
    pub name: String,
    /// Column family codes.
    #[serde(rename = "ColumnSchema")]
    pub column_families: Vec<ColumnFamilySchema>,
}

/// One column family entry of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamilySchema {
    /// Family code.
    pub name: String,
}

impl TableSchema {
    /// Schema of the table holding records of `data_type` under `base`.
    #[must_use]
    pub fn for_type(base: &str, data_type: DataType) -> Self {
        Self {
            name: data_type.table_name(base),
            column_families: vec![ColumnFamilySchema {
                name: data_type.family().to_string(),
            }],
        }
    }
}

/// Base64-encodes a string the way the REST gateway expects identifiers.
#[must_use]
pub fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decodes a base64 identifier back into a UTF-8 string.
pub fn decode(value: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| Error::Serialization(format!("invalid base64 '{value}': {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Serialization(format!("invalid utf-8 in '{value}': {e}")))
}
