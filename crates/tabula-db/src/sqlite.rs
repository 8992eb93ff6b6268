//! # SQLite Handle
//!
//! A [`Connection`] backed by an sqlx `SqlitePool`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Database Handle                             │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteHandle::open(config).await ← Create pool                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  execute / fetch_all / table_columns (Connection trait)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Native Types
//! Each cell is read by its runtime storage class (INTEGER, REAL, TEXT,
//! BLOB) and tagged with the column's declared type as sqlx reports it
//! (`DATETIME`, `BOOLEAN`, `TEXT`, ...). Integers in a `BOOLEAN` column are
//! reported as driver booleans.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tabula_core::{Param, RawCell, RawColumn};
use tracing::{debug, info};

use crate::connection::{Cell, Connection, Row};
use crate::error::{DbError, DbResult, DriverError};

const INTROSPECTION_SQL: &str =
    r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1)"#;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/app.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections
    /// open, which an in-memory database needs to keep its data.
    pub idle_timeout: Option<Duration>,

    /// Enforce foreign key constraints.
    /// Default: true
    pub foreign_keys: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            foreign_keys: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether foreign keys are enforced.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let handle = SqliteHandle::open(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            foreign_keys: true,
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// SQLite database handle.
#[derive(Debug, Clone)]
pub struct SqliteHandle {
    pool: SqlitePool,
}

impl SqliteHandle {
    /// Opens (and creates if missing) the database.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures WAL mode, NORMAL synchronous, foreign keys
    /// 3. Creates the connection pool
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening SQLite database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(config.foreign_keys)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        Ok(SqliteHandle { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteHandle { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Null => query.bind(None::<String>),
            Param::Int(i) => query.bind(*i),
            Param::Float(f) => query.bind(*f),
            Param::Bool(b) => query.bind(*b),
            Param::Text(s) => query.bind(s.as_str()),
            Param::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn read_row(row: &SqliteRow) -> Result<Row, DriverError> {
    let mut cells = Vec::with_capacity(row.len());

    for (i, column) in row.columns().iter().enumerate() {
        let declared = column.type_info().name().to_string();
        let raw = row.try_get_raw(i)?;

        let value = if raw.is_null() {
            RawCell::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => {
                    let v: i64 = row.try_get_unchecked(i)?;
                    if declared == "BOOLEAN" {
                        RawCell::Bool(v != 0)
                    } else {
                        RawCell::Integer(v)
                    }
                }
                "REAL" => RawCell::Real(row.try_get_unchecked(i)?),
                "BLOB" => RawCell::Blob(row.try_get_unchecked(i)?),
                _ => RawCell::Text(row.try_get_unchecked(i)?),
            }
        };

        cells.push(Cell::new(column.name(), declared, value));
    }

    Ok(cells)
}

#[async_trait]
impl Connection for SqliteHandle {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<u64, DriverError> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DriverError> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(read_row).collect()
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<RawColumn>, DriverError> {
        let rows = sqlx::query(INTROSPECTION_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<RawColumn, DriverError> {
                Ok(RawColumn {
                    name: row.try_get("name")?,
                    raw_type: row.try_get("type")?,
                    nullable: row.try_get::<i64, _>("notnull")? == 0,
                    primary_key: row.try_get::<i64, _>("pk")? > 0,
                    default: row.try_get("dflt_value")?,
                })
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle() -> SqliteHandle {
        let handle = SqliteHandle::open(DbConfig::in_memory()).await.unwrap();
        handle
            .execute(
                "CREATE TABLE accounts (
                    id INTEGER PRIMARY KEY,
                    email VARCHAR(120) NOT NULL UNIQUE,
                    balance DOUBLE DEFAULT 0,
                    active BOOLEAN,
                    avatar BLOB
                )",
                &[],
            )
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let handle = SqliteHandle::open(DbConfig::in_memory()).await.unwrap();
        assert!(handle.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .foreign_keys(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.foreign_keys);
        assert!(DbConfig::in_memory().idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_table_columns() {
        let handle = handle().await;
        let columns = handle.table_columns("accounts").await.unwrap();

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "balance", "active", "avatar"]);
        assert!(columns[0].primary_key);
        assert!(!columns[1].nullable);
        assert_eq!(columns[1].raw_type, "VARCHAR(120)");
        assert_eq!(columns[2].default.as_deref(), Some("0"));

        assert!(handle.table_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cells_carry_storage_and_declared_types() {
        let handle = handle().await;
        let affected = handle
            .execute(
                "INSERT INTO accounts (email, balance, active, avatar) VALUES (?, ?, ?, ?)",
                &[
                    Param::Text("a@b.c".into()),
                    Param::Float(2.5),
                    Param::Bool(true),
                    Param::Bytes(vec![1, 2, 3]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = handle
            .fetch_all("SELECT id, email, balance, active, avatar FROM accounts", &[])
            .await
            .unwrap();
        let row = &rows[0];

        assert_eq!(row[0].value, RawCell::Integer(1));
        assert_eq!(row[1].value, RawCell::Text("a@b.c".into()));
        assert_eq!(row[2].value, RawCell::Real(2.5));
        assert_eq!(row[3].value, RawCell::Bool(true));
        assert_eq!(row[3].native_type, "BOOLEAN");
        assert_eq!(row[4].value, RawCell::Blob(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_null_binding() {
        let handle = handle().await;
        handle
            .execute(
                "INSERT INTO accounts (email, balance) VALUES (?, ?)",
                &[Param::Text("x@y.z".into()), Param::Null],
            )
            .await
            .unwrap();

        let rows = handle
            .fetch_all("SELECT balance FROM accounts", &[])
            .await
            .unwrap();
        assert_eq!(rows[0][0].value, RawCell::Null);
    }

    #[tokio::test]
    async fn test_vendor_codes_reported() {
        let handle = handle().await;
        let insert = "INSERT INTO accounts (id, email) VALUES (?, ?)";
        handle
            .execute(insert, &[Param::Int(1), Param::Text("a@b.c".into())])
            .await
            .unwrap();

        let unique = handle
            .execute(insert, &[Param::Int(2), Param::Text("a@b.c".into())])
            .await
            .unwrap_err();
        assert_eq!(unique.code.as_deref(), Some("2067"));

        let primary = handle
            .execute(insert, &[Param::Int(1), Param::Text("other@b.c".into())])
            .await
            .unwrap_err();
        assert_eq!(primary.code.as_deref(), Some("1555"));

        let not_null = handle
            .execute("INSERT INTO accounts (id) VALUES (3)", &[])
            .await
            .unwrap_err();
        assert_eq!(not_null.code.as_deref(), Some("1299"));
    }
}
