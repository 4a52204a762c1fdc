//! Paginated scans over a [`StorageBackend`].
//!
//! A scan lives on the backend as a scanner. Between pages the caller holds
//! it as an opaque [`ScanCursor`]; while a page is being fetched the
//! orchestrator holds it as a [`ScannerLease`], which deletes the scanner on
//! every terminal transition:
//!
//! ```text
//! NotStarted --create--> Active --fetch(cells)--> Active (cursor handed back)
//!                          |--fetch(none)--> Exhausted (scanner deleted)
//!                          `--error-------> Failed    (scanner deleted)
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{Cell, ScannerSpec, StorageBackend};
use crate::error::Result;

/// Maximum number of rows a single page may ask for.
pub const MAX_RECORDS: usize = 200;

/// Cells requested per fetch: `min(limit, 200) * column_count`.
///
/// An absent limit means [`MAX_RECORDS`].
#[must_use]
pub fn batch_size(limit: Option<usize>, column_count: usize) -> usize {
    limit.unwrap_or(MAX_RECORDS).min(MAX_RECORDS) * column_count
}

/// Parses a caller-provided limit from its leading integer, so `"10.5"` and
/// `"10rows"` give 10. Text without a leading integer, or a negative one,
/// counts as absent.
#[must_use]
pub fn parse_limit(limit: &str) -> Option<usize> {
    let trimmed = limit.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if end == 0 {
        return None;
    }
    // Overflowing digit runs still mean "as many as allowed".
    Some(unsigned[..end].parse().unwrap_or(usize::MAX))
}

/// Lifecycle of one backend scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    /// No scanner exists yet.
    NotStarted,
    /// A scanner is open and may hold more cells.
    Active,
    /// The scanner ran dry and was deleted.
    Exhausted,
    /// A backend call failed and the scanner was deleted.
    Failed,
}

/// Continuation token: the id of an open scanner, or nothing.
///
/// Serializes as a JSON string or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCursor(Option<String>);

impl ScanCursor {
    /// Cursor for a scan that has not started.
    #[must_use]
    pub const fn new() -> Self {
        Self(None)
    }

    /// Cursor resuming an existing scanner.
    #[must_use]
    pub fn resume(scanner_id: impl Into<String>) -> Self {
        Self(Some(scanner_id.into()))
    }

    /// Scanner id, if the cursor points at one.
    #[must_use]
    pub fn scanner_id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// State the cursor describes from the caller's side.
    #[must_use]
    pub fn state(&self) -> ScanState {
        match self.0 {
            Some(_) => ScanState::Active,
            None => ScanState::NotStarted,
        }
    }
}

impl From<Option<String>> for ScanCursor {
    fn from(id: Option<String>) -> Self {
        Self(id.filter(|id| !id.is_empty()))
    }
}

/// Exclusive ownership of an open scanner for the span of one call.
///
/// Dropping an armed lease schedules the scanner's deletion on the current
/// tokio runtime, so a cancelled call does not leave it open.
pub struct ScannerLease {
    backend: Arc<dyn StorageBackend>,
    table: String,
    scanner_id: String,
    armed: bool,
}

impl ScannerLease {
    /// Takes ownership of `scanner_id` on `table`.
    pub fn new(backend: Arc<dyn StorageBackend>, table: &str, scanner_id: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.to_string(),
            scanner_id: scanner_id.into(),
            armed: true,
        }
    }

    /// Leased scanner id.
    #[must_use]
    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    /// Deletes the scanner now.
    ///
    /// # Errors
    ///
    /// Returns the backend error if deletion fails; the lease is disarmed
    /// either way.
    pub async fn release(mut self) -> Result<()> {
        self.armed = false;
        self.backend
            .scanner_delete(&self.table, &self.scanner_id)
            .await
            .map_err(|e| e.with_scanner(&self.scanner_id))?;
        info!("Deleted scanner {} on '{}'", self.scanner_id, self.table);
        Ok(())
    }

    /// Hands the scanner back to the caller as a cursor.
    #[must_use]
    pub fn into_cursor(mut self) -> ScanCursor {
        self.armed = false;
        ScanCursor::resume(std::mem::take(&mut self.scanner_id))
    }

    /// Releases the scanner, logging instead of surfacing a failure.
    async fn release_quietly(self) {
        let scanner_id = self.scanner_id.clone();
        if let Err(e) = self.release().await {
            warn!("Failed to delete scanner {scanner_id}: {e}");
        }
    }
}

impl std::fmt::Debug for ScannerLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerLease")
            .field("endpoint", &self.backend.endpoint())
            .field("table", &self.table)
            .field("scanner_id", &self.scanner_id)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Drop for ScannerLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Scanner {} on '{}' dropped outside a runtime; left to server-side expiry",
                self.scanner_id, self.table
            );
            return;
        };

        let backend = Arc::clone(&self.backend);
        let table = std::mem::take(&mut self.table);
        let scanner_id = std::mem::take(&mut self.scanner_id);
        debug!("Scheduling deletion of abandoned scanner {scanner_id}");
        handle.spawn(async move {
            if let Err(e) = backend.scanner_delete(&table, &scanner_id).await {
                warn!("Failed to delete abandoned scanner {scanner_id}: {e}");
            }
        });
    }
}

/// One page of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Cells of this page, in scan order.
    pub cells: Vec<Cell>,
    /// Where the next page starts; empty once the scan is exhausted.
    pub cursor: ScanCursor,
    /// Scanner state after this page.
    pub state: ScanState,
}

/// Drives backend scanners one page at a time.
#[derive(Clone)]
pub struct ScanOrchestrator {
    backend: Arc<dyn StorageBackend>,
}

impl ScanOrchestrator {
    /// Creates an orchestrator over a shared backend handle.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Fetches the next page.
    ///
    /// An empty `cursor` opens a new scanner from `spec`; otherwise the
    /// existing scanner is continued and `spec` is ignored. Exhaustion
    /// deletes the scanner and returns no cells with an empty cursor.
    ///
    /// # Errors
    ///
    /// Backend and connection errors are returned after the scanner has been
    /// deleted, and name the scanner that failed.
    pub async fn execute(&self, table: &str, cursor: &ScanCursor, spec: &ScannerSpec) -> Result<ScanPage> {
        let lease = match cursor.scanner_id() {
            Some(id) => {
                debug!("Continuing scanner {id} on '{table}'");
                ScannerLease::new(Arc::clone(&self.backend), table, id)
            }
            None => {
                let id = self.backend.scanner_create(table, spec).await?;
                info!(
                    "Created scanner {id} on '{table}' [{} .. {}) batch={}",
                    spec.start_row, spec.end_row, spec.batch
                );
                ScannerLease::new(Arc::clone(&self.backend), table, id)
            }
        };

        let fetched = self.backend.scanner_get(table, lease.scanner_id()).await;
        match fetched {
            Ok(Some(cells)) if !cells.is_empty() => {
                debug!(
                    "Scanner {} returned {} cell(s)",
                    lease.scanner_id(),
                    cells.len()
                );
                Ok(ScanPage {
                    cells,
                    cursor: lease.into_cursor(),
                    state: ScanState::Active,
                })
            }
            Ok(_) => {
                info!("Scanner {} on '{table}' exhausted", lease.scanner_id());
                lease.release_quietly().await;
                Ok(ScanPage {
                    cells: Vec::new(),
                    cursor: ScanCursor::new(),
                    state: ScanState::Exhausted,
                })
            }
            Err(e) => {
                let e = e.with_scanner(lease.scanner_id());
                warn!(
                    "Scanner {} on '{table}' moved to {:?}: {e}",
                    lease.scanner_id(),
                    ScanState::Failed
                );
                lease.release_quietly().await;
                Err(e)
            }
        }
    }

    /// Deletes the scanner behind `cursor`, if any.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the scanner cannot be deleted.
    pub async fn abandon(&self, table: &str, cursor: &ScanCursor) -> Result<()> {
        match cursor.scanner_id() {
            Some(id) => {
                ScannerLease::new(Arc::clone(&self.backend), table, id)
                    .release()
                    .await
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("endpoint", &self.backend.endpoint())
            .finish()
    }
}
