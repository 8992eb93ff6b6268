//! # SQL Dialects
//!
//! The small capability interface that isolates every engine-specific bit of
//! syntax. Generic CRUD code never branches on the database vendor.
//!
//! ## Variance
//! ```text
//! ┌──────────────┬────────────┬──────────────────────────┬───────────────────┐
//! │ Dialect      │ Quoting    │ Row limiting             │ Next id           │
//! ├──────────────┼────────────┼──────────────────────────┼───────────────────┤
//! │ MySql        │ `name`     │ LIMIT n OFFSET m         │ SELECT fn('seq')  │
//! │ SqlServer    │ [name]     │ TOP n / OFFSET..FETCH    │ NEXT VALUE FOR    │
//! │ Sqlite       │ name       │ LIMIT n OFFSET m         │ auto-increment    │
//! └──────────────┴────────────┴──────────────────────────┴───────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::statement::{Param, Statement};

// =============================================================================
// Vendor Error Codes
// =============================================================================

/// Constraint family recognized from a vendor error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    NotNull,
    ForeignKey,
    Unique,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotNull => write!(f, "not-null"),
            Violation::ForeignKey => write!(f, "foreign-key"),
            Violation::Unique => write!(f, "unique"),
        }
    }
}

/// One entry of a vendor's error translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorCode {
    pub code: &'static str,
    /// `None` for failures that are not constraint violations.
    pub violation: Option<Violation>,
    pub message: &'static str,
}

const MSG_REQUIRED: &str = "A required field was not filled in or was not provided";
const MSG_UNKNOWN_COLUMN: &str = "The query references a column that does not exist in the database";
const MSG_FOREIGN_KEY: &str = "The record references a row in another table that does not exist";
const MSG_FOREIGN_KEY_PARENT: &str = "The record is still referenced by rows in another table";
const MSG_DUPLICATE: &str = "The record has a duplicate key (primary or unique)";

const MYSQL_CODES: &[VendorCode] = &[
    VendorCode { code: "1364", violation: Some(Violation::NotNull), message: MSG_REQUIRED },
    VendorCode { code: "1048", violation: Some(Violation::NotNull), message: MSG_REQUIRED },
    VendorCode { code: "1054", violation: None, message: MSG_UNKNOWN_COLUMN },
    VendorCode { code: "1452", violation: Some(Violation::ForeignKey), message: MSG_FOREIGN_KEY },
    VendorCode { code: "1451", violation: Some(Violation::ForeignKey), message: MSG_FOREIGN_KEY_PARENT },
    VendorCode { code: "1062", violation: Some(Violation::Unique), message: MSG_DUPLICATE },
];

const SQLSERVER_CODES: &[VendorCode] = &[
    VendorCode { code: "515", violation: Some(Violation::NotNull), message: MSG_REQUIRED },
    VendorCode { code: "207", violation: None, message: MSG_UNKNOWN_COLUMN },
    VendorCode { code: "547", violation: Some(Violation::ForeignKey), message: MSG_FOREIGN_KEY },
    VendorCode { code: "2601", violation: Some(Violation::Unique), message: MSG_DUPLICATE },
    VendorCode { code: "2627", violation: Some(Violation::Unique), message: MSG_DUPLICATE },
];

// SQLite extended result codes
const SQLITE_CODES: &[VendorCode] = &[
    VendorCode { code: "1299", violation: Some(Violation::NotNull), message: MSG_REQUIRED },
    VendorCode { code: "787", violation: Some(Violation::ForeignKey), message: MSG_FOREIGN_KEY },
    VendorCode { code: "1555", violation: Some(Violation::Unique), message: MSG_DUPLICATE },
    VendorCode { code: "2067", violation: Some(Violation::Unique), message: MSG_DUPLICATE },
];

// =============================================================================
// Dialect Trait
// =============================================================================

/// Engine-specific SQL syntax.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quotes an identifier; qualified names are quoted per segment.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Placeholder for the `index`-th (1-based) bound parameter.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Single-quoted, escaped string literal.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Hex-encoded binary literal wrapped in an unhex call.
    fn binary_literal(&self, bytes: &[u8]) -> String {
        format!("UNHEX('{}')", to_hex(bytes))
    }

    /// Text placed right after `SELECT` to limit rows, if any.
    fn limit_prefix(&self, _limit: u64, _offset: u64) -> Option<String> {
        None
    }

    /// Text appended after `ORDER BY` to limit rows, if any.
    fn limit_suffix(&self, limit: u64, offset: u64, _ordered: bool) -> Option<String> {
        if offset > 0 {
            Some(format!(" LIMIT {} OFFSET {}", limit, offset))
        } else {
            Some(format!(" LIMIT {}", limit))
        }
    }

    /// Row limiting for caller-written SELECT text, where no prefix can be
    /// injected.
    fn trailing_limit(&self, limit: u64, offset: u64, ordered: bool) -> String {
        self.limit_suffix(limit, offset, ordered).unwrap_or_default()
    }

    /// Insert verb that skips rows violating constraints, if supported.
    fn insert_ignore(&self) -> Option<&'static str> {
        None
    }

    /// Column/value list for an insert that sets no columns.
    fn default_values(&self) -> &'static str {
        " DEFAULT VALUES"
    }

    /// Statement returning the next value of a sequence. `None` when the
    /// engine assigns ids itself on insert.
    fn next_id(&self, _sequence: &str) -> Option<Statement> {
        None
    }

    /// Vendor error codes recognized by the error translator.
    fn vendor_codes(&self) -> &'static [VendorCode] {
        &[]
    }

    /// Looks up a vendor code in this dialect's table.
    fn lookup_code(&self, code: &str) -> Option<&'static VendorCode> {
        self.vendor_codes().iter().find(|c| c.code == code)
    }
}

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn quote_segments(ident: &str, quote: impl Fn(&str) -> String) -> String {
    ident
        .split('.')
        .map(|segment| {
            if segment == "*" {
                segment.to_string()
            } else {
                quote(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

// =============================================================================
// MySQL
// =============================================================================

/// MySQL / MariaDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySql {
    /// Stored function returning the next id of a named sequence.
    pub sequence_function: String,
}

impl MySql {
    pub fn new(sequence_function: impl Into<String>) -> Self {
        MySql {
            sequence_function: sequence_function.into(),
        }
    }
}

impl Default for MySql {
    fn default() -> Self {
        MySql::new("nextval")
    }
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_segments(ident, |s| format!("`{}`", s.replace('`', "``")))
    }

    fn quote_string(&self, value: &str) -> String {
        // backslash is an escape character in MySQL string literals
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn insert_ignore(&self) -> Option<&'static str> {
        Some("INSERT IGNORE")
    }

    fn default_values(&self) -> &'static str {
        " () VALUES ()"
    }

    fn next_id(&self, sequence: &str) -> Option<Statement> {
        let mut stmt = Statement::from_sql(format!("SELECT {}(", self.sequence_function));
        stmt.push_param(Param::Text(sequence.to_string()))
            .push_sql(") AS `nextval`");
        Some(stmt)
    }

    fn vendor_codes(&self) -> &'static [VendorCode] {
        MYSQL_CODES
    }
}

// =============================================================================
// SQL Server
// =============================================================================

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_segments(ident, |s| format!("[{}]", s.replace(']', "]]")))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    fn binary_literal(&self, bytes: &[u8]) -> String {
        format!("CONVERT(VARBINARY(MAX), '{}', 2)", to_hex(bytes))
    }

    fn limit_prefix(&self, limit: u64, offset: u64) -> Option<String> {
        (offset == 0).then(|| format!("TOP {}", limit))
    }

    fn limit_suffix(&self, limit: u64, offset: u64, ordered: bool) -> Option<String> {
        if offset == 0 {
            return None;
        }
        // OFFSET..FETCH is only valid after an ORDER BY
        let order = if ordered { "" } else { " ORDER BY (SELECT NULL)" };
        Some(format!(
            "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            order, offset, limit
        ))
    }

    fn trailing_limit(&self, limit: u64, offset: u64, ordered: bool) -> String {
        let order = if ordered { "" } else { " ORDER BY (SELECT NULL)" };
        format!(
            "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            order, offset, limit
        )
    }

    fn next_id(&self, sequence: &str) -> Option<Statement> {
        Some(Statement::from_sql(format!(
            "SELECT NEXT VALUE FOR {} AS nextval",
            self.quote_identifier(sequence)
        )))
    }

    fn vendor_codes(&self) -> &'static [VendorCode] {
        SQLSERVER_CODES
    }
}

// =============================================================================
// SQLite
// =============================================================================

const SQLITE_RESERVED: &[&str] = &[
    "add", "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "collate",
    "column", "constraint", "create", "default", "delete", "desc", "distinct", "drop", "else",
    "end", "escape", "except", "exists", "foreign", "from", "group", "having", "in", "index",
    "insert", "intersect", "into", "is", "join", "key", "like", "limit", "not", "null", "offset",
    "on", "or", "order", "primary", "references", "select", "set", "table", "then", "to",
    "transaction", "union", "unique", "update", "using", "values", "when", "where",
];

/// SQLite. Plain identifiers are emitted unquoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite;

impl Sqlite {
    fn needs_quoting(segment: &str) -> bool {
        let mut chars = segment.chars();
        let simple = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        !simple || SQLITE_RESERVED.contains(&segment.to_ascii_lowercase().as_str())
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_segments(ident, |s| {
            if Sqlite::needs_quoting(s) {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.to_string()
            }
        })
    }

    fn binary_literal(&self, bytes: &[u8]) -> String {
        format!("unhex('{}')", to_hex(bytes))
    }

    fn insert_ignore(&self) -> Option<&'static str> {
        Some("INSERT OR IGNORE")
    }

    fn vendor_codes(&self) -> &'static [VendorCode] {
        SQLITE_CODES
    }
}

// =============================================================================
// Dialect Selection
// =============================================================================

/// Configurable dialect choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DialectKind {
    #[serde(rename = "mysql", alias = "mariadb")]
    MySql,
    #[serde(rename = "sqlserver", alias = "mssql")]
    SqlServer,
    #[default]
    #[serde(rename = "sqlite", alias = "sqlite3")]
    Sqlite,
}

impl DialectKind {
    /// Instantiates the dialect.
    pub fn build(&self, sequence_function: &str) -> Arc<dyn Dialect> {
        match self {
            DialectKind::MySql => Arc::new(MySql::new(sequence_function)),
            DialectKind::SqlServer => Arc::new(SqlServer),
            DialectKind::Sqlite => Arc::new(Sqlite),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectKind::MySql => write!(f, "mysql"),
            DialectKind::SqlServer => write!(f, "sqlserver"),
            DialectKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DialectKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "my_sql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlserver" | "sql_server" | "mssql" => Ok(DialectKind::SqlServer),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            other => Err(CoreError::InvalidConfig(format!(
                "Unknown dialect: '{}'. Valid options: mysql, sqlserver, sqlite",
                other
            ))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(MySql::default().quote_identifier("age"), "`age`");
        assert_eq!(MySql::default().quote_identifier("u.age"), "`u`.`age`");
        assert_eq!(SqlServer.quote_identifier("age"), "[age]");
        assert_eq!(SqlServer.quote_identifier("we]ird"), "[we]]ird]");
        assert_eq!(Sqlite.quote_identifier("age"), "age");
        assert_eq!(Sqlite.quote_identifier("order"), "\"order\"");
        assert_eq!(Sqlite.quote_identifier("first name"), "\"first name\"");
        assert_eq!(Sqlite.quote_identifier("t.*"), "t.*");
    }

    #[test]
    fn test_pagination() {
        assert_eq!(Sqlite.limit_suffix(10, 0, false).as_deref(), Some(" LIMIT 10"));
        assert_eq!(
            MySql::default().limit_suffix(10, 20, true).as_deref(),
            Some(" LIMIT 10 OFFSET 20")
        );
        assert_eq!(Sqlite.limit_prefix(10, 0), None);

        assert_eq!(SqlServer.limit_prefix(1, 0).as_deref(), Some("TOP 1"));
        assert_eq!(SqlServer.limit_suffix(1, 0, false), None);
        assert_eq!(SqlServer.limit_prefix(10, 5), None);
        assert_eq!(
            SqlServer.limit_suffix(10, 5, false).as_deref(),
            Some(" ORDER BY (SELECT NULL) OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY")
        );
        assert_eq!(
            SqlServer.trailing_limit(10, 0, true),
            " OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(Sqlite.trailing_limit(10, 0, false), " LIMIT 10");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(Sqlite.quote_string("it's"), "'it''s'");
        assert_eq!(MySql::default().quote_string("a\\'b"), "'a\\\\''b'");
    }

    #[test]
    fn test_next_id_strategy() {
        assert!(Sqlite.next_id("orders").is_none());

        let stmt = MySql::default().next_id("orders").unwrap();
        assert_eq!(
            stmt.to_literal(&MySql::default()),
            "SELECT nextval('orders') AS `nextval`"
        );

        let stmt = SqlServer.next_id("orders").unwrap();
        assert_eq!(stmt.to_literal(&SqlServer), "SELECT NEXT VALUE FOR [orders] AS nextval");
    }

    #[test]
    fn test_vendor_code_lookup() {
        let entry = MySql::default().lookup_code("1062").unwrap();
        assert_eq!(entry.violation, Some(Violation::Unique));

        let entry = MySql::default().lookup_code("1054").unwrap();
        assert_eq!(entry.violation, None);

        assert!(Sqlite.lookup_code("2067").is_some());
        assert!(SqlServer.lookup_code("9999").is_none());
    }

    #[test]
    fn test_dialect_kind_parsing() {
        assert_eq!("mysql".parse::<DialectKind>().unwrap(), DialectKind::MySql);
        assert_eq!("MSSQL".parse::<DialectKind>().unwrap(), DialectKind::SqlServer);
        assert_eq!("sqlite3".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);
        assert!("oracle".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::MySql.build("nextval").name(), "mysql");
    }
}
