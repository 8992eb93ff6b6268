//! # Error Types
//!
//! Errors raised while turning values, keys and filters into SQL.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tabula-core errors (this file)                                        │
//! │  └── CoreError        - Compile, coercion and config failures          │
//! │                                                                         │
//! │  tabula-db errors (separate crate)                                     │
//! │  └── DbError          - Domain error vocabulary seen by callers        │
//! │                                                                         │
//! │  Flow: CoreError → DbError → controller layer                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is raised before any SQL reaches a database.

use thiserror::Error;

/// SQL generation and configuration errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A key clause was requested for an empty key set.
    ///
    /// ## When This Occurs
    /// - `get_one` / `delete` / `increase` called with no keys
    /// - A keyed update on a record without primary-key fields
    #[error("Empty key set: refusing to build an unbounded WHERE clause")]
    EmptyKeySet,

    /// A key with an empty field name.
    #[error("Empty key name in key set")]
    EmptyKeyName,

    /// A filter condition whose operand cannot be compiled.
    ///
    /// ## When This Occurs
    /// - Unknown operator token
    /// - `BT` / `NBT` without a second operand
    /// - NULL operand for a comparison operator
    /// - Non-finite double
    #[error("Unsupported filter value: {0}")]
    UnsupportedFilterValue(String),

    /// A value that cannot be coerced to its column's semantic type.
    #[error("Invalid value for column '{column}': expected {expected}, got {found}")]
    InvalidValue {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A group-combination template names a declared group with no
    /// conditions.
    #[error("Group map references empty group: {0}")]
    UnknownGroup(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("Config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl CoreError {
    /// Creates an UnsupportedFilterValue error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        CoreError::UnsupportedFilterValue(message.into())
    }

    /// Creates an InvalidValue error.
    pub fn invalid_value(
        column: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        CoreError::InvalidValue {
            column: column.into(),
            expected,
            found: found.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
