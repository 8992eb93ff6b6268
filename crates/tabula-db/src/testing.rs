//! Scripted in-memory `Connection` for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tabula_core::{Param, RawCell, RawColumn};

use crate::connection::{Cell, Connection, Row};
use crate::error::DriverError;

/// Records every statement and answers from scripted queues.
///
/// `fetch_all` pops the next row set (empty when none is queued);
/// `execute` pops the next affected count (1 when none is queued). A queued
/// error is returned by the next `execute` or `fetch_all` instead.
#[derive(Debug, Default)]
pub(crate) struct MockConnection {
    tables: HashMap<String, Vec<RawColumn>>,
    introspection_error: Mutex<Option<DriverError>>,
    introspections: AtomicUsize,
    statements: Mutex<Vec<(String, Vec<Param>)>>,
    rows: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<VecDeque<u64>>,
    errors: Mutex<VecDeque<DriverError>>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, table: &str, columns: Vec<RawColumn>) -> Self {
        self.tables.insert(table.to_string(), columns);
        self
    }

    /// Fails the first introspection call only.
    pub(crate) fn fail_introspection(self, err: DriverError) -> Self {
        *lock(&self.introspection_error) = Some(err);
        self
    }

    pub(crate) fn push_rows(&self, rows: Vec<Row>) {
        lock(&self.rows).push_back(rows);
    }

    pub(crate) fn push_affected(&self, n: u64) {
        lock(&self.affected).push_back(n);
    }

    pub(crate) fn push_error(&self, err: DriverError) {
        lock(&self.errors).push_back(err);
    }

    pub(crate) fn statements(&self) -> Vec<(String, Vec<Param>)> {
        lock(&self.statements).clone()
    }

    pub(crate) fn sql(&self) -> Vec<String> {
        lock(&self.statements).iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub(crate) fn introspections(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str, params: &[Param]) -> Result<(), DriverError> {
        lock(&self.statements).push((sql.to_string(), params.to_vec()));
        match lock(&self.errors).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<u64, DriverError> {
        self.record(sql, params)?;
        Ok(lock(&self.affected).pop_front().unwrap_or(1))
    }

    async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DriverError> {
        self.record(sql, params)?;
        Ok(lock(&self.rows).pop_front().unwrap_or_default())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<RawColumn>, DriverError> {
        self.introspections.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if let Some(err) = lock(&self.introspection_error).take() {
            return Err(err);
        }
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}

/// Introspection row.
pub(crate) fn column(name: &str, raw_type: &str, primary_key: bool, nullable: bool) -> RawColumn {
    RawColumn {
        name: name.to_string(),
        raw_type: raw_type.to_string(),
        nullable,
        primary_key,
        default: None,
    }
}

/// Result cell.
pub(crate) fn cell(name: &str, native_type: &str, value: RawCell) -> Cell {
    Cell::new(name, native_type, value)
}
