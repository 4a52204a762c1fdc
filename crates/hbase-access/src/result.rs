//! Conversion of raw scan cells into the row-keyed result document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::backend::Cell;
use crate::projection::Projection;
use crate::rowkey::SEPARATOR;
use crate::scan::ScanCursor;

/// One page of query results.
///
/// Serializes as
/// `{"columns":{name:index},"count":n,"data":{row:{name:value}},"scannerId":id|null}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Output column name -> position.
    pub columns: IndexMap<String, usize>,
    /// Number of distinct rows in `data`.
    pub count: usize,
    /// Row identity -> column name -> value, in scan order.
    pub data: IndexMap<String, IndexMap<String, String>>,
    /// Cursor for the next page.
    #[serde(rename = "scannerId")]
    pub cursor: ScanCursor,
}

impl ResultSet {
    /// Result of a scan that has nothing left.
    #[must_use]
    pub fn exhausted() -> Self {
        Self::default()
    }

    /// Builds a result set from cells in scan order.
    ///
    /// With `split_row_identity` rows are keyed `timestamp:nodeId`, the
    /// timestamp being the cell's own and the node id the third row key
    /// segment. Otherwise the full row key is used. Query-only qualifiers and
    /// qualifiers outside the projection never reach `data`.
    #[must_use]
    pub fn transform(
        cells: &[Cell],
        projection: &Projection,
        split_row_identity: bool,
        cursor: ScanCursor,
    ) -> Self {
        let mut data: IndexMap<String, IndexMap<String, String>> = IndexMap::new();

        for cell in cells {
            if projection.is_query_only(&cell.column) {
                continue;
            }
            let Some(name) = projection.column_name(&cell.column) else {
                continue;
            };
            let identity = if split_row_identity {
                row_identity(cell)
            } else {
                cell.row_key.clone()
            };
            data.entry(identity)
                .or_default()
                .insert(name.to_string(), cell.value.clone());
        }

        Self {
            columns: projection.column_index(),
            count: data.len(),
            data,
            cursor,
        }
    }

    /// Whether another page may follow.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.scanner_id().is_some()
    }
}

fn row_identity(cell: &Cell) -> String {
    let node_id = cell.row_key.split(SEPARATOR).nth(2).unwrap_or_default();
    format!("{}{SEPARATOR}{node_id}", cell.timestamp)
}
