//! # Metadata Registry
//!
//! Discovers and memoizes per-table column descriptors.
//!
//! ## Caching
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  describe("users")                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tables: Mutex<HashMap<name, Arc<OnceCell<Arc<TableMetadata>>>>>        │
//! │       │                                                                 │
//! │       ├── cell initialized ──► same Arc, no introspection               │
//! │       │                                                                 │
//! │       └── cell empty ──► Connection::table_columns (one caller only;    │
//! │                          concurrent callers await the same cell)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never invalidated: the schema is assumed static for the life
//! of the registry. A failed introspection drops the table's slot, so a
//! later call retries and unknown names do not accumulate.
//!
//! The registry is an explicit object. Create one per process (or per test)
//! and share it through [`Engine::with_registry`](crate::Engine::with_registry).

use std::collections::HashMap;
use std::sync::Arc;

use tabula_core::TableMetadata;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{DbError, DbResult};

type Slot = Arc<OnceCell<Arc<TableMetadata>>>;

/// Process-wide table metadata cache.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    tables: Mutex<HashMap<String, Slot>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column descriptors of `table`, introspected at most once.
    ///
    /// ## Errors
    /// `MetadataUnavailable` when the table has no columns or introspection
    /// fails.
    pub async fn describe(
        &self,
        conn: &dyn Connection,
        table: &str,
    ) -> DbResult<Arc<TableMetadata>> {
        let slot = {
            let mut tables = self.tables.lock().await;
            tables.entry(table.to_string()).or_default().clone()
        };

        let result = slot
            .get_or_try_init(|| async {
                debug!(table = %table, "Metadata cache miss, introspecting");

                let raw = match conn.table_columns(table).await {
                    Ok(raw) => raw,
                    Err(e) => return Err(DbError::metadata_unavailable(table, e.message)),
                };

                if raw.is_empty() {
                    return Err(DbError::metadata_unavailable(table, "table has no columns"));
                }

                let meta = TableMetadata::from_raw(table, raw);
                info!(table = %table, columns = meta.len(), "Table metadata loaded");
                Ok(Arc::new(meta))
            })
            .await
            .map(Arc::clone);

        if result.is_err() {
            self.evict(table, &slot).await;
        }
        result
    }

    /// Removes the slot of `table` if it is still the empty `slot`.
    async fn evict(&self, table: &str, slot: &Slot) {
        let mut tables = self.tables.lock().await;
        let stale = tables
            .get(table)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            tables.remove(table);
        }
    }

    /// Number of table slots held, loaded or in flight.
    #[cfg(test)]
    async fn slots(&self) -> usize {
        self.tables.lock().await.len()
    }

    /// Cached metadata of `table`, without introspecting.
    pub async fn cached(&self, table: &str) -> Option<Arc<TableMetadata>> {
        let tables = self.tables.lock().await;
        tables.get(table).and_then(|slot| slot.get().cloned())
    }

    /// Number of tables with loaded metadata.
    pub async fn len(&self) -> usize {
        let tables = self.tables.lock().await;
        tables.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
