//! # Database Handle
//!
//! The narrow interface the engine needs from a database: run a statement,
//! fetch rows with per-column native types, and list a table's columns.
//!
//! ```text
//! Engine ──► Connection::execute(sql, params)      → rows affected
//!        ──► Connection::fetch_all(sql, params)    → Vec<Row>
//!        ──► Connection::table_columns(table)      → Vec<RawColumn>
//!
//! Failures come back as DriverError { code, message } and are translated
//! by the engine, never by the handle.
//! ```

use async_trait::async_trait;
use tabula_core::{Param, RawCell, RawColumn};

use crate::error::DriverError;

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub name: String,
    /// Native type name reported by the driver for this column.
    pub native_type: String,
    pub value: RawCell,
}

impl Cell {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, value: RawCell) -> Self {
        Cell {
            name: name.into(),
            native_type: native_type.into(),
            value,
        }
    }
}

/// A result row, cells in select order.
pub type Row = Vec<Cell>;

/// A database handle able to run parameterized SQL.
///
/// Placeholders in `sql` follow the dialect the engine was configured with.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<u64, DriverError>;

    /// Runs a query and returns every row.
    async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DriverError>;

    /// One entry per column of `table`, in declaration order. Empty when the
    /// table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Vec<RawColumn>, DriverError>;
}
