//! # tabula-db: Persistence Engine for Tabula
//!
//! Runs the statements compiled by `tabula-core` against a database handle:
//! metadata discovery, generic CRUD over any table, and translation of
//! vendor failures into one error vocabulary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tabula Data Flow                                 │
//! │                                                                         │
//! │  Controller: users.get_many(&conn, &filter.into(), &[])                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tabula-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Engine     │    │     Table     │    │   Registry   │  │   │
//! │  │   │  (engine.rs)  │◄───│  (table.rs)   │───►│(registry.rs) │  │   │
//! │  │   │ compiler      │    │ exists/get    │    │ compute-once │  │   │
//! │  │   │ translator    │    │ insert/update │    │ per table    │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │           ▼                                                     │   │
//! │  │   ┌───────────────────────────────┐   ┌─────────────────────┐  │   │
//! │  │   │  dyn Connection               │   │   ErrorTranslator   │  │   │
//! │  │   │  (connection.rs, sqlite.rs)   │──►│   (translate.rs)    │  │   │
//! │  │   └───────────────────────────────┘   └─────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │       Database (SQLite via sqlx, or any Connection impl)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`connection`] - The database handle trait
//! - [`sqlite`] - sqlx SQLite handle and pool configuration
//! - [`registry`] - Table metadata cache
//! - [`engine`] - Shared compiler, registry and translator
//! - [`table`] - CRUD operations on one table
//! - [`translate`] - Vendor code translation
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tabula_core::{Condition, EngineConfig, Filter, Keys, Operator, Record};
//! use tabula_db::{DbConfig, Engine, InsertOptions, SqliteHandle};
//!
//! let conn = SqliteHandle::open(DbConfig::new("app.db")).await?;
//! let engine = Engine::new(EngineConfig::load(None)?)?;
//!
//! let users = engine.table(&conn, "users").await?;
//! users
//!     .insert(&conn, &Record::new().with("name", "Ada"), InsertOptions::default())
//!     .await?;
//!
//! let adults = Filter::new().add(Condition::new("age", Operator::Ge, 18));
//! let rows = users.get_many(&conn, &adults.into(), &[]).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod connection;
pub mod engine;
pub mod error;
pub mod registry;
pub mod sqlite;
pub mod table;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use connection::{Cell, Connection, Row};
pub use engine::Engine;
pub use error::{DbError, DbResult, DriverError};
pub use registry::MetadataRegistry;
pub use sqlite::{DbConfig, SqliteHandle};
pub use table::{InsertOptions, Table};
pub use translate::ErrorTranslator;
