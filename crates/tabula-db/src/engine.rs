//! # Persistence Engine
//!
//! Owns everything the generic CRUD operations share: configuration, the SQL
//! compiler for the configured dialect, the metadata registry and the error
//! translator.
//!
//! ## Usage Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EngineConfig ──► Engine::new(config)                                   │
//! │                        │                                                │
//! │                        │  engine.table(&conn, "users").await?           │
//! │                        ▼                                                │
//! │                   Table<'_>  (metadata loaded once, shared via Arc)     │
//! │                        │                                                │
//! │                        │  get_one / get_many / insert / update / ...    │
//! │                        ▼                                                │
//! │   Statement ──► Engine::execute / fetch ──► &dyn Connection             │
//! │                        │                         │                      │
//! │                        │   debug! literal SQL    │ DriverError          │
//! │                        ▼                         ▼                      │
//! │                 rows decoded by codec    ErrorTranslator → DbError      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never opens, commits or rolls back transactions. Every call
//! runs against the handle the caller passes in.

use std::sync::Arc;

use tabula_core::{
    Criteria, Dialect, EngineConfig, Record, SqlCompiler, Statement, TableMetadata, Value,
    ValueCodec,
};
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::DbResult;
use crate::registry::MetadataRegistry;
use crate::table::Table;
use crate::translate::ErrorTranslator;

/// Shared state of the persistence operations.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    compiler: SqlCompiler,
    registry: Arc<MetadataRegistry>,
    translator: ErrorTranslator,
}

impl Engine {
    /// Creates an engine with its own metadata registry.
    pub fn new(config: EngineConfig) -> DbResult<Self> {
        Self::with_registry(config, Arc::new(MetadataRegistry::new()))
    }

    /// Creates an engine sharing an existing metadata registry.
    pub fn with_registry(config: EngineConfig, registry: Arc<MetadataRegistry>) -> DbResult<Self> {
        config.validate()?;

        let compiler = SqlCompiler::new(config.build_dialect(), ValueCodec::from_config(&config));
        let translator = ErrorTranslator::new(config.translate_errors);

        debug!(
            dialect = %config.dialect,
            translate_errors = config.translate_errors,
            "Engine created"
        );

        Ok(Engine {
            config,
            compiler,
            registry,
            translator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compiler(&self) -> &SqlCompiler {
        &self.compiler
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.compiler.dialect()
    }

    pub fn codec(&self) -> &ValueCodec {
        self.compiler.codec()
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    pub fn translator(&self) -> ErrorTranslator {
        self.translator
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Column descriptors of `table`, loaded through the registry.
    pub async fn describe(
        &self,
        conn: &dyn Connection,
        table: &str,
    ) -> DbResult<Arc<TableMetadata>> {
        self.registry.describe(conn, table).await
    }

    /// Handle for the CRUD operations on `table`.
    ///
    /// ## Errors
    /// `MetadataUnavailable` when the table cannot be described.
    pub async fn table(&self, conn: &dyn Connection, table: &str) -> DbResult<Table<'_>> {
        let meta = self.describe(conn, table).await?;
        Ok(Table::new(self, meta))
    }

    // =========================================================================
    // Free-form queries
    // =========================================================================

    /// Next value of `sequence`, or `None` when the dialect relies on the
    /// database assigning ids on insert.
    pub async fn next_id(&self, conn: &dyn Connection, sequence: &str) -> DbResult<Option<i64>> {
        let Some(stmt) = self.dialect().next_id(sequence) else {
            return Ok(None);
        };

        let row = self.fetch(conn, &stmt).await?.into_iter().next();
        Ok(row.and_then(|record| record.iter().next().and_then(|(_, v)| to_i64(v))))
    }

    /// Runs caller-written SELECT text with the criteria's WHERE, ordering
    /// and pagination appended.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let filter = Filter::new().add(Condition::new("total", Operator::Gt, 100));
    /// let rows = engine
    ///     .query(&conn, "SELECT id, total FROM orders", &filter.into())
    ///     .await?;
    /// ```
    pub async fn query(
        &self,
        conn: &dyn Connection,
        sql: &str,
        criteria: &Criteria,
    ) -> DbResult<Vec<Record>> {
        let stmt = self.compiler.extend_query(sql, criteria, None)?;
        self.fetch(conn, &stmt).await
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runs a statement, returning rows affected.
    pub(crate) async fn execute(&self, conn: &dyn Connection, stmt: &Statement) -> DbResult<u64> {
        debug!(sql = %self.compiler.render(stmt), "Executing statement");

        let affected = conn
            .execute(&stmt.sql(self.dialect()), &stmt.params())
            .await
            .map_err(|e| self.translator.translate(e, self.dialect()))?;

        debug!(rows = affected, "Statement executed");
        Ok(affected)
    }

    /// Runs a query, decoding every row.
    pub(crate) async fn fetch(
        &self,
        conn: &dyn Connection,
        stmt: &Statement,
    ) -> DbResult<Vec<Record>> {
        debug!(sql = %self.compiler.render(stmt), "Running query");

        let rows = conn
            .fetch_all(&stmt.sql(self.dialect()), &stmt.params())
            .await
            .map_err(|e| self.translator.translate(e, self.dialect()))?;

        debug!(rows = rows.len(), "Query returned rows");
        Ok(rows.into_iter().map(|row| self.decode_row(row)).collect())
    }

    fn decode_row(&self, row: Row) -> Record {
        let codec = self.codec();
        row.into_iter()
            .map(|cell| (cell.name, codec.decode(cell.value, &cell.native_type)))
            .collect()
    }
}

/// Integer view of a scalar result (`count(*)`, sequence values).
pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Double(d) if d.is_finite() => Some(*d as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
