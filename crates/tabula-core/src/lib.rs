//! # tabula-core: Pure SQL Generation for Tabula
//!
//! This crate holds everything the persistence engine knows about values,
//! schemas and filters, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tabula Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Controllers (outside this repo)                 │   │
//! │  │        Record / Keys / Filter ──► CRUD call on a table          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tabula-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  value   │ │ metadata │ │  filter  │ │     compiler     │  │   │
//! │  │   │  Record  │ │  Column  │ │ Operator │ │ Keys/Filter→SQL  │  │   │
//! │  │   │   Keys   │ │ Semantic │ │  Groups  │ │  SELECT/INSERT.. │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                        │   │
//! │  │   │  codec   │ │ dialect  │ │  config  │                        │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO ASYNC                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tabula-db (Persistence Operations)                 │   │
//! │  │     metadata registry, connections, CRUD, error translation     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`value`] - `Value`, `Record` (sparse row) and `Keys`
//! - [`metadata`] - Column descriptors and native type classification
//! - [`filter`] - The structured filter model
//! - [`codec`] - Value encoding/decoding
//! - [`dialect`] - Per-engine SQL syntax
//! - [`statement`] - SQL text with bound parameters
//! - [`compiler`] - Keys/filters to SQL
//! - [`config`] - Engine configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tabula_core::{Condition, Criteria, Filter, Operator, Sqlite, SqlCompiler, ValueCodec};
//!
//! let compiler = SqlCompiler::new(Arc::new(Sqlite), ValueCodec::default());
//! let filter = Filter::new().add(Condition::between("age", 18, 30));
//!
//! let stmt = compiler
//!     .select("users", &[], &Criteria::Filter(filter), None, None)
//!     .unwrap();
//!
//! assert_eq!(stmt.sql(compiler.dialect()), "SELECT * FROM users WHERE (age BETWEEN ? AND ?)");
//! assert_eq!(
//!     compiler.render(&stmt),
//!     "SELECT * FROM users WHERE (age BETWEEN 18 AND 30)"
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod compiler;
pub mod config;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod statement;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use codec::ValueCodec;
pub use compiler::{Adjustment, Criteria, SqlCompiler};
pub use config::EngineConfig;
pub use dialect::{Dialect, DialectKind, MySql, SqlServer, Sqlite, VendorCode, Violation};
pub use error::{CoreError, CoreResult};
pub use filter::{Condition, ConditionGroup, Direction, Filter, Logic, Operator, Sort};
pub use metadata::{ColumnDescriptor, RawColumn, SemanticType, TableMetadata};
pub use statement::{Param, Statement};
pub use value::{Keys, RawCell, Record, Value};
