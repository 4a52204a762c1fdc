//! In-process backend.
//!
//! Tables are ordered maps guarded by a single mutex. Scanners snapshot the
//! matching cells when they are created and hand them out `batch` cells at a
//! time, so later writes never show up in an open scan.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;
use uuid::Uuid;

use crate::backend::{Cell, ScannerSpec, StorageBackend};
use crate::error::{Error, Result};
use crate::schema::TableSchema;

const ENDPOINT: &str = "memory://";

/// `qualifier -> (timestamp, value)`, qualifiers sorted like HBase returns them.
type Row = BTreeMap<String, (u64, String)>;

#[derive(Debug, Default)]
struct Table {
    families: Vec<String>,
    rows: BTreeMap<String, Row>,
}

impl Table {
    fn has_family(&self, qualifier: &str) -> bool {
        let family = qualifier.split(':').next().unwrap_or_default();
        self.families.iter().any(|f| f == family)
    }
}

#[derive(Debug)]
struct Scanner {
    table: String,
    batch: usize,
    pending: VecDeque<Cell>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    scanners: HashMap<String, Scanner>,
}

/// Backend keeping every table in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the table described by `schema` up front.
    #[must_use]
    pub fn with_table(self, schema: &TableSchema) -> Self {
        self.state.lock().create_table(schema);
        self
    }

    /// Number of scanners currently open, across all tables.
    #[must_use]
    pub fn open_scanners(&self) -> usize {
        self.state.lock().scanners.len()
    }
}

impl State {
    fn create_table(&mut self, schema: &TableSchema) {
        let table = self.tables.entry(schema.name.clone()).or_default();
        for family in &schema.column_families {
            if !table.families.contains(&family.name) {
                table.families.push(family.name.clone());
            }
        }
    }

    fn table(&self, operation: &'static str, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::backend(operation, name, "table not found"))
    }

    fn table_mut(&mut self, operation: &'static str, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::backend(operation, name, "table not found"))
    }
}

/// Projects a row onto the requested qualifiers; no qualifiers means all.
fn project<'a>(
    row: &'a Row,
    columns: &'a [String],
) -> impl Iterator<Item = (&'a String, &'a (u64, String))> + 'a {
    row.iter()
        .filter(move |(qualifier, _)| columns.is_empty() || columns.contains(*qualifier))
}

fn row_cells(row_key: &str, row: &Row, columns: &[String]) -> Vec<Cell> {
    project(row, columns)
        .map(|(qualifier, (timestamp, value))| {
            Cell::new(row_key, qualifier.as_str(), *timestamp, value.as_str())
        })
        .collect()
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn endpoint(&self) -> &str {
        ENDPOINT
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.state.lock().create_table(schema);
        debug!("Created in-memory table '{}'", schema.name);
        Ok(())
    }

    async fn get_row(&self, table: &str, row_key: &str, columns: &[String]) -> Result<Vec<Cell>> {
        let state = self.state.lock();
        let table = state.table("get_row", table)?;

        let cells = match row_key.strip_suffix('*') {
            Some(prefix) => table
                .rows
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .flat_map(|(key, row)| row_cells(key, row, columns))
                .collect(),
            None => table
                .rows
                .get(row_key)
                .map(|row| row_cells(row_key, row, columns))
                .unwrap_or_default(),
        };
        Ok(cells)
    }

    async fn put_cells(&self, table: &str, cells: &[Cell]) -> Result<()> {
        const OP: &str = "put_cells";
        let mut state = self.state.lock();
        let target = state.table_mut(OP, table)?;

        if let Some(cell) = cells.iter().find(|c| !target.has_family(&c.column)) {
            return Err(Error::backend(
                OP,
                table,
                format!("column '{}' has no matching column family", cell.column),
            ));
        }

        for cell in cells {
            target
                .rows
                .entry(cell.row_key.clone())
                .or_default()
                .insert(cell.column.clone(), (cell.timestamp, cell.value.clone()));
        }
        debug!("Stored {} cell(s) in '{table}'", cells.len());
        Ok(())
    }

    async fn scanner_create(&self, table: &str, spec: &ScannerSpec) -> Result<String> {
        let mut state = self.state.lock();
        let source = state.table("scanner_create", table)?;

        let mut pending = VecDeque::new();
        if spec.start_row < spec.end_row {
            for (key, row) in source.rows.range(spec.start_row.clone()..spec.end_row.clone()) {
                let visible: BTreeMap<String, String> = project(row, &spec.columns)
                    .map(|(qualifier, (_, value))| (qualifier.clone(), value.clone()))
                    .collect();
                if visible.is_empty() {
                    continue;
                }
                if spec.filter.as_ref().is_some_and(|f| !f.matches(&visible)) {
                    continue;
                }
                pending.extend(row_cells(key, row, &spec.columns));
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        state.scanners.insert(
            id.clone(),
            Scanner {
                table: table.to_string(),
                batch: spec.batch.max(1),
                pending,
            },
        );
        Ok(id)
    }

    async fn scanner_get(&self, table: &str, scanner_id: &str) -> Result<Option<Vec<Cell>>> {
        let mut state = self.state.lock();
        let scanner = state
            .scanners
            .get_mut(scanner_id)
            .filter(|s| s.table == table)
            .ok_or_else(|| {
                Error::backend("scanner_get", table, "scanner not found").with_scanner(scanner_id)
            })?;

        if scanner.pending.is_empty() {
            return Ok(None);
        }
        let take = scanner.batch.min(scanner.pending.len());
        Ok(Some(scanner.pending.drain(..take).collect()))
    }

    async fn scanner_delete(&self, table: &str, scanner_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let owned = state
            .scanners
            .get(scanner_id)
            .is_some_and(|s| s.table == table);
        if !owned {
            return Err(
                Error::backend("scanner_delete", table, "scanner not found").with_scanner(scanner_id),
            );
        }
        state.scanners.remove(scanner_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
