//! # Database Error Types
//!
//! The stable error vocabulary seen by callers of the persistence engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (tabula-core)          sqlx::Error / scripted failure        │
//! │  raised before any SQL runs            │                                │
//! │       │                                ▼                                │
//! │       │                          DriverError { code, message }          │
//! │       │                                │                                │
//! │       │                                ▼                                │
//! │       │                          ErrorTranslator (vendor code table)    │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  DbError (this module) ◄── QueryExecutionFailed / ConstraintViolation   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Controller layer maps kinds to status classes                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tabula_core::{CoreError, Violation};
use thiserror::Error;

/// A failure reported by a database handle, with the vendor code if any.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    /// Vendor error code, e.g. `1062` (MySQL) or `2067` (SQLite).
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        DriverError {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Convert sqlx errors to DriverError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database   → vendor code from DatabaseError::code()
/// Other                   → no code, display text only
/// ```
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DriverError {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            other => DriverError {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// Persistence engine errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Table metadata could not be discovered.
    ///
    /// ## When This Occurs
    /// - The table does not exist (introspection returns zero columns)
    /// - The introspection query itself failed
    #[error("Metadata unavailable for table '{table}': {reason}")]
    MetadataUnavailable { table: String, reason: String },

    /// A key clause was requested for an empty key set.
    #[error("Empty key set: refusing to address an unbounded row set")]
    EmptyKeySet,

    /// A key with an empty field name.
    #[error("Empty key name in key set")]
    EmptyKeyName,

    /// Key resolution yielded no primary-key fields.
    #[error("No keys provided")]
    NoKeysProvided,

    /// Refusing to update or delete without a WHERE clause.
    #[error("Missing filter: refusing to run an unconditional statement")]
    MissingFilter,

    #[error("Unsupported filter value: {0}")]
    UnsupportedFilterValue(String),

    /// A value that cannot be coerced to its column's semantic type.
    #[error("Invalid value for column '{column}': expected {expected}, got {found}")]
    InvalidValue {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A single-column operation named a column the table does not have.
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The database rejected a statement.
    ///
    /// `message` is the translated text when translation is enabled and the
    /// vendor code is known, else the driver's own message.
    #[error("Query failed: {message}")]
    QueryExecutionFailed {
        message: String,
        code: Option<String>,
        #[source]
        source: DriverError,
    },

    /// A statement failed on a not-null, foreign-key or unique constraint.
    #[error("Constraint violation ({violation}): {message}")]
    ConstraintViolation {
        violation: Violation,
        message: String,
        code: String,
        #[source]
        source: DriverError,
    },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - Pool is closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl DbError {
    /// Creates a MetadataUnavailable error.
    pub fn metadata_unavailable(table: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::MetadataUnavailable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Vendor code of an execution failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            DbError::QueryExecutionFailed { code, .. } => code.as_deref(),
            DbError::ConstraintViolation { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True for errors raised by the database rather than by validation.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            DbError::QueryExecutionFailed { .. } | DbError::ConstraintViolation { .. }
        )
    }
}

/// Flattens compile-time errors into the domain vocabulary.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyKeySet => DbError::EmptyKeySet,
            CoreError::EmptyKeyName => DbError::EmptyKeyName,
            CoreError::UnsupportedFilterValue(msg) => DbError::UnsupportedFilterValue(msg),
            CoreError::UnknownGroup(group) => DbError::UnsupportedFilterValue(format!(
                "group map references unknown or empty group '{}'",
                group
            )),
            CoreError::InvalidValue {
                column,
                expected,
                found,
            } => DbError::InvalidValue {
                column,
                expected,
                found,
            },
            other @ (CoreError::InvalidConfig(_)
            | CoreError::ConfigIo(_)
            | CoreError::ConfigParse(_)) => DbError::InvalidConfig(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_flatten() {
        assert!(matches!(DbError::from(CoreError::EmptyKeySet), DbError::EmptyKeySet));
        assert!(matches!(
            DbError::from(CoreError::UnknownGroup("vip".into())),
            DbError::UnsupportedFilterValue(ref m) if m.contains("vip")
        ));
        assert!(matches!(
            DbError::from(CoreError::invalid_value("age", "integer", "abc")),
            DbError::InvalidValue { ref column, .. } if column == "age"
        ));
    }

    #[test]
    fn test_code_accessor() {
        let err = DbError::QueryExecutionFailed {
            message: "boom".into(),
            code: Some("1054".into()),
            source: DriverError::new(Some("1054"), "boom"),
        };
        assert_eq!(err.code(), Some("1054"));
        assert!(err.is_execution_failure());
        assert_eq!(DbError::MissingFilter.code(), None);
    }
}
