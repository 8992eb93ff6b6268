//! # Table Operations
//!
//! Generic CRUD over one table, driven entirely by its metadata.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  exists(keys)            SELECT <keys> ... WHERE <keys> (single row)    │
//! │  get_one(keys, fields)   SELECT <fields|*> ... WHERE <keys> (1 row)     │
//! │  get_many(criteria, ..)  SELECT ... WHERE .. GROUP BY .. ORDER BY .. ⟂  │
//! │  count(criteria)         SELECT count(*) AS total ... WHERE ..          │
//! │  insert(record)          INSERT INTO t (<present fields>) VALUES (..)   │
//! │  update(record, filter)  UPDATE t SET .. WHERE <keys | filter>          │
//! │  upsert(record)          exists ? update : insert  (not atomic)         │
//! │  delete(criteria)        DELETE FROM t WHERE ..   (never unconditional) │
//! │  increase/decrease       UPDATE t SET f = COALESCE(f,0) ± n WHERE <keys>│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures (`EmptyKeySet`, `NoKeysProvided`, `MissingFilter`)
//! are raised before any SQL reaches the connection.

use std::sync::Arc;

use tabula_core::{
    Adjustment, ColumnDescriptor, Criteria, Filter, Keys, Param, Record, TableMetadata, Value,
};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::engine::{to_i64, Engine};
use crate::error::{DbError, DbResult};

/// Options of [`Table::insert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Best-effort insert: rows rejected by a constraint are skipped.
    pub ignore_errors: bool,
}

impl InsertOptions {
    pub fn ignore_errors() -> Self {
        InsertOptions {
            ignore_errors: true,
        }
    }
}

/// CRUD handle for one table.
///
/// ## Usage
/// ```rust,ignore
/// let users = engine.table(&conn, "users").await?;
///
/// let id = Keys::new().with("id", 7);
/// if let Some(user) = users.get_one(&conn, &id, &[]).await? {
///     println!("{:?}", user.get("email"));
/// }
///
/// users.increase(&conn, "logins", &id, 1).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Table<'e> {
    engine: &'e Engine,
    meta: Arc<TableMetadata>,
}

impl<'e> Table<'e> {
    pub(crate) fn new(engine: &'e Engine, meta: Arc<TableMetadata>) -> Self {
        Table { engine, meta }
    }

    pub fn name(&self) -> &str {
        self.meta.table()
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.meta
    }

    /// Primary-key columns, in column order.
    pub fn primary_keys(&self) -> Vec<&ColumnDescriptor> {
        self.meta.primary_keys().collect()
    }

    /// Primary-key values of `record`. Absent key fields become NULL.
    ///
    /// ## Errors
    /// `NoKeysProvided` when the table has no primary key.
    pub fn keys_of(&self, record: &Record) -> DbResult<Keys> {
        let keys: Keys = self
            .meta
            .primary_keys()
            .map(|pk| {
                let value = record.get(&pk.name).cloned().unwrap_or(Value::Null);
                (pk.name.clone(), value)
            })
            .collect();

        if keys.is_empty() {
            return Err(DbError::NoKeysProvided);
        }
        Ok(keys)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// True when a row matches `keys`.
    pub async fn exists(&self, conn: &dyn Connection, keys: &Keys) -> DbResult<bool> {
        if keys.is_empty() {
            return Err(DbError::NoKeysProvided);
        }

        let fields: Vec<String> = keys.iter().map(|(name, _)| name.to_string()).collect();
        Ok(self.get_one(conn, keys, &fields).await?.is_some())
    }

    /// True when a row matches the primary key of `record`.
    pub async fn exists_record(&self, conn: &dyn Connection, record: &Record) -> DbResult<bool> {
        let keys = self.keys_of(record)?;
        self.exists(conn, &keys).await
    }

    /// The row matching `keys`, or `None`.
    ///
    /// Fetches with a single-row limit: when several rows match, the first
    /// one in the database's fetch order is returned.
    pub async fn get_one(
        &self,
        conn: &dyn Connection,
        keys: &Keys,
        fields: &[String],
    ) -> DbResult<Option<Record>> {
        let criteria = Criteria::Keys(keys.clone());
        let stmt = self.compiler().select(
            self.name(),
            fields,
            &criteria,
            Some(&self.meta),
            Some((1, 0)),
        )?;

        Ok(self.engine.fetch(conn, &stmt).await?.into_iter().next())
    }

    /// Every row matching the criteria, with the filter's grouping, ordering
    /// and pagination applied.
    pub async fn get_many(
        &self,
        conn: &dyn Connection,
        criteria: &Criteria,
        fields: &[String],
    ) -> DbResult<Vec<Record>> {
        let stmt = self
            .compiler()
            .select(self.name(), fields, criteria, Some(&self.meta), None)?;
        self.engine.fetch(conn, &stmt).await
    }

    /// Number of rows matching the criteria's predicate.
    pub async fn count(&self, conn: &dyn Connection, criteria: &Criteria) -> DbResult<i64> {
        let stmt = self.compiler().count(self.name(), criteria, Some(&self.meta))?;
        let rows = self.engine.fetch(conn, &stmt).await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(to_i64)
            .unwrap_or(0))
    }

    /// One binary column of the row matching `keys`.
    pub async fn fetch_blob(
        &self,
        conn: &dyn Connection,
        keys: &Keys,
        field: &str,
    ) -> DbResult<Option<Vec<u8>>> {
        self.column(field)?;

        let row = self.get_one(conn, keys, &[field.to_string()]).await?;
        Ok(row.and_then(|mut r| match r.unset(field) {
            Some(Value::Binary(bytes)) => Some(bytes),
            Some(Value::String(text)) => Some(text.into_bytes()),
            _ => None,
        }))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts the fields present on `record`; absent fields are left to the
    /// column defaults.
    ///
    /// With `ignore_errors`, a constraint violation skips the row. Dialects
    /// without an insert-ignore keyword report it as 0 rows affected.
    pub async fn insert(
        &self,
        conn: &dyn Connection,
        record: &Record,
        options: InsertOptions,
    ) -> DbResult<u64> {
        let stmt = self
            .compiler()
            .insert(self.name(), record, &self.meta, options.ignore_errors)?;

        match self.engine.execute(conn, &stmt).await {
            Err(DbError::ConstraintViolation {
                violation, message, ..
            }) if options.ignore_errors && self.engine.dialect().insert_ignore().is_none() => {
                warn!(
                    table = %self.name(),
                    %violation,
                    %message,
                    "Best-effort insert skipped a row"
                );
                Ok(0)
            }
            result => result,
        }
    }

    /// Updates a row by key, or every row matching `filter`.
    ///
    /// Only non-key fields are assigned. A record with no non-key field
    /// updates nothing and issues no SQL.
    ///
    /// ## Without a filter
    /// The primary-key fields present on the record form the WHERE clause.
    ///
    /// ## With a filter
    /// The rows matching the filter's predicate are updated; key fields on
    /// the record are ignored.
    pub async fn update(
        &self,
        conn: &dyn Connection,
        record: &Record,
        filter: Option<&Filter>,
    ) -> DbResult<u64> {
        let mut keys = Keys::new();
        let mut assignments = Vec::new();
        for column in self.meta.columns() {
            let Some(value) = record.get(&column.name) else {
                continue;
            };
            if column.primary_key {
                keys.insert(column.name.clone(), value.clone());
            } else {
                assignments.push((column, value));
            }
        }

        if assignments.is_empty() {
            debug!(table = %self.name(), "No non-key fields to update");
            return Ok(0);
        }

        let predicate = match filter {
            None => self.compiler().compile_keys(&keys, Some(&self.meta))?,
            Some(filter) => {
                let predicate = self.compiler().compile_filter(filter, Some(&self.meta))?;
                if predicate.is_empty() {
                    return Err(DbError::MissingFilter);
                }
                predicate
            }
        };

        let stmt = self.compiler().update(self.name(), &assignments, predicate)?;
        self.engine.execute(conn, &stmt).await
    }

    /// Updates the row if its key exists, inserts it otherwise.
    ///
    /// Two concurrent upserts of the same key may both insert; the second
    /// then fails with a constraint violation.
    pub async fn upsert(&self, conn: &dyn Connection, record: &Record) -> DbResult<u64> {
        let keys = self.keys_of(record)?;

        if self.exists(conn, &keys).await? {
            self.update(conn, record, None).await
        } else {
            self.insert(conn, record, InsertOptions::default()).await
        }
    }

    /// Deletes the rows matching the criteria.
    ///
    /// ## Errors
    /// `EmptyKeySet` for empty keys, `MissingFilter` when the predicate is
    /// empty.
    pub async fn delete(&self, conn: &dyn Connection, criteria: &Criteria) -> DbResult<u64> {
        let predicate = self.non_empty_predicate(criteria)?;
        let stmt = self.compiler().delete(self.name(), predicate);
        self.engine.execute(conn, &stmt).await
    }

    /// Sets one column on the rows matching the criteria.
    pub async fn update_field(
        &self,
        conn: &dyn Connection,
        field: &str,
        value: impl Into<Value>,
        criteria: &Criteria,
    ) -> DbResult<u64> {
        let column = self.column(field)?;
        let value = value.into();

        let predicate = self.non_empty_predicate(criteria)?;
        let stmt = self
            .compiler()
            .update(self.name(), &[(column, &value)], predicate)?;
        self.engine.execute(conn, &stmt).await
    }

    /// `field = COALESCE(field,0) + quantity` on the row matching `keys`.
    pub async fn increase(
        &self,
        conn: &dyn Connection,
        field: &str,
        keys: &Keys,
        quantity: impl Into<Value>,
    ) -> DbResult<u64> {
        self.adjust(conn, field, keys, Adjustment::Increase, quantity.into())
            .await
    }

    /// `field = COALESCE(field,0) - quantity` on the row matching `keys`.
    pub async fn decrease(
        &self,
        conn: &dyn Connection,
        field: &str,
        keys: &Keys,
        quantity: impl Into<Value>,
    ) -> DbResult<u64> {
        self.adjust(conn, field, keys, Adjustment::Decrease, quantity.into())
            .await
    }

    async fn adjust(
        &self,
        conn: &dyn Connection,
        field: &str,
        keys: &Keys,
        adjustment: Adjustment,
        quantity: Value,
    ) -> DbResult<u64> {
        self.column(field)?;

        let quantity = match quantity {
            Value::Integer(i) => Param::Int(i),
            Value::Double(d) if d.is_finite() => Param::Float(d),
            other => {
                return Err(DbError::InvalidValue {
                    column: field.to_string(),
                    expected: "number",
                    found: other.to_string(),
                })
            }
        };

        let predicate = self.compiler().compile_keys(keys, Some(&self.meta))?;
        let stmt = self
            .compiler()
            .adjust(self.name(), field, adjustment, quantity, predicate);
        self.engine.execute(conn, &stmt).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn compiler(&self) -> &tabula_core::SqlCompiler {
        self.engine.compiler()
    }

    fn column(&self, field: &str) -> DbResult<&ColumnDescriptor> {
        self.meta.column(field).ok_or_else(|| DbError::UnknownColumn {
            table: self.name().to_string(),
            column: field.to_string(),
        })
    }

    fn non_empty_predicate(&self, criteria: &Criteria) -> DbResult<tabula_core::Statement> {
        let predicate = self.compiler().compile_predicate(criteria, Some(&self.meta))?;
        if predicate.is_empty() {
            return Err(DbError::MissingFilter);
        }
        Ok(predicate)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
