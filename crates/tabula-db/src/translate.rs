//! # Error Translator
//!
//! Maps driver failures to the domain error vocabulary.
//!
//! ```text
//! DriverError { code: "1062", message: "Duplicate entry 'a@b' for key 'email'" }
//!       │
//!       ▼  dialect.lookup_code("1062")
//! VendorCode { violation: Some(Unique), message: "The record has a duplicate key ..." }
//!       │
//!       ├── translation on  ──► ConstraintViolation { message: table text }
//!       └── translation off ──► ConstraintViolation { message: driver text }
//! ```
//!
//! The error kind is decided by the vendor code alone. The translation switch
//! only picks which message travels with it.

use tabula_core::Dialect;

use crate::error::{DbError, DriverError};

/// Vendor-code based error translation with an on/off message policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorTranslator {
    enabled: bool,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ErrorTranslator {
    pub fn new(enabled: bool) -> Self {
        ErrorTranslator { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wraps a driver failure into `QueryExecutionFailed` or, for a known
    /// constraint code, `ConstraintViolation`.
    pub fn translate(&self, err: DriverError, dialect: &dyn Dialect) -> DbError {
        let entry = err.code.as_deref().and_then(|code| dialect.lookup_code(code));

        let message = match entry {
            Some(entry) if self.enabled => entry.message.to_string(),
            _ => err.message.clone(),
        };

        match entry {
            Some(entry) => match entry.violation {
                Some(violation) => DbError::ConstraintViolation {
                    violation,
                    message,
                    code: entry.code.to_string(),
                    source: err,
                },
                None => DbError::QueryExecutionFailed {
                    message,
                    code: Some(entry.code.to_string()),
                    source: err,
                },
            },
            None => DbError::QueryExecutionFailed {
                message,
                code: err.code.clone(),
                source: err,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
