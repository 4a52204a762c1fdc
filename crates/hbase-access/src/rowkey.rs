//! Composite row keys for stream records.
//!
//! A row key is `streamId:reverseTimestamp:nodeId`, with the stream id
//! left-padded with zeros to [`STREAM_ID_WIDTH`] characters and the timestamp
//! stored as `MAX_TIMESTAMP - ts`. Ascending key order is therefore newest
//! first, which is the order range scans return rows in.
//!
//! ```rust,ignore
//! use hbase_access::rowkey::{RowKey, range_bounds};
//!
//! let key = RowKey::encode("42", 1_700_000_000_000, "node-a")?;
//! assert_eq!(key.to_string(), "000000000042:920637203685500:node-a");
//!
//! let bounds = range_bounds("42", None, None)?;
//! assert_eq!(bounds.start_row, "000000000042*");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Width every stream id is padded to.
pub const STREAM_ID_WIDTH: usize = 12;

/// Upper bound of every encodable timestamp.
pub const MAX_TIMESTAMP: u64 = 922_337_203_685_500;

/// Separator between row key segments.
pub const SEPARATOR: char = ':';

/// Wildcard suffix for prefix bounds.
const WILDCARD: char = '*';

/// Minimum length of a key handed to [`end_key`].
const MIN_END_KEY_LEN: usize = 3;

/// Decoded row key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    stream_id: String,
    reverse_timestamp: u64,
    node_id: String,
}

impl RowKey {
    /// Encodes a record identity into a row key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `timestamp` exceeds [`MAX_TIMESTAMP`].
    pub fn encode(stream_id: &str, timestamp: u64, node_id: &str) -> Result<Self> {
        Ok(Self {
            stream_id: pad_stream_id(stream_id),
            reverse_timestamp: reverse_timestamp(timestamp)?,
            node_id: node_id.to_string(),
        })
    }

    /// Padded stream id segment.
    #[must_use]
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Stored (reversed) timestamp segment.
    #[must_use]
    pub const fn reverse_timestamp(&self) -> u64 {
        self.reverse_timestamp
    }

    /// Original timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        MAX_TIMESTAMP - self.reverse_timestamp
    }

    /// Node id segment, empty when the record has none.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.stream_id, self.reverse_timestamp, self.node_id
        )
    }
}

impl FromStr for RowKey {
    type Err = Error;

    /// Parses a serialized key. The node id keeps any further separators.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, SEPARATOR);
        let (Some(stream_id), Some(reverse), Some(node_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Validation(format!(
                "row key '{s}' must have the form streamId:reverseTimestamp:nodeId"
            )));
        };

        let reverse_timestamp = reverse.parse::<u64>().map_err(|_| {
            Error::Validation(format!("row key '{s}' has a non-numeric timestamp segment"))
        })?;
        if reverse_timestamp > MAX_TIMESTAMP {
            return Err(Error::Validation(format!(
                "row key '{s}' timestamp segment exceeds {MAX_TIMESTAMP}"
            )));
        }

        Ok(Self {
            stream_id: stream_id.to_string(),
            reverse_timestamp,
            node_id: node_id.to_string(),
        })
    }
}

/// Left-pads a stream id with zeros. Longer ids are returned unchanged.
#[must_use]
pub fn pad_stream_id(stream_id: &str) -> String {
    format!("{:0>width$}", stream_id, width = STREAM_ID_WIDTH)
}

/// Maps a timestamp onto its descending sort position.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `timestamp` exceeds [`MAX_TIMESTAMP`].
pub fn reverse_timestamp(timestamp: u64) -> Result<u64> {
    MAX_TIMESTAMP.checked_sub(timestamp).ok_or_else(|| {
        Error::Validation(format!(
            "timestamp {timestamp} exceeds the maximum encodable value {MAX_TIMESTAMP}"
        ))
    })
}

/// Returns the smallest key greater than every key starting with `prefix`
/// that shares all but its last character.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `prefix` has fewer than 3 characters or
/// its last character has no successor.
pub fn end_key(prefix: &str) -> Result<String> {
    if prefix.chars().count() < MIN_END_KEY_LEN {
        return Err(Error::Validation(format!(
            "search string should have minimum {MIN_END_KEY_LEN} chars, but received '{prefix}'"
        )));
    }

    let mut chars = prefix.chars();
    let last = chars.next_back().unwrap_or_default();
    let next = char::from_u32(u32::from(last) + 1).ok_or_else(|| {
        Error::Validation(format!("last character of '{prefix}' has no successor"))
    })?;

    let mut key = chars.as_str().to_string();
    key.push(next);
    Ok(key)
}

/// Start and end row of a scan, start inclusive and end exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBounds {
    /// First row of the scan (the most recent bound).
    pub start_row: String,
    /// Row the scan stops before (the oldest bound).
    pub end_row: String,
}

/// Computes the row range covering `[from, to]` for one stream.
///
/// Because keys sort newest first, `to` becomes the start row and `from`
/// the end row. Missing bounds widen to the whole stream prefix.
///
/// # Errors
///
/// Returns [`Error::Validation`] for timestamps beyond [`MAX_TIMESTAMP`].
pub fn range_bounds(stream_id: &str, from: Option<u64>, to: Option<u64>) -> Result<RangeBounds> {
    let padded = pad_stream_id(stream_id);

    let start_row = match to {
        Some(ts) => RowKey::encode(stream_id, ts, "")?.to_string(),
        None => format!("{padded}{WILDCARD}"),
    };
    let end_row = match from {
        Some(ts) => end_key(&RowKey::encode(stream_id, ts, "")?.to_string())?,
        None => format!("{}{WILDCARD}", end_key(&padded)?),
    };

    Ok(RangeBounds { start_row, end_row })
}
