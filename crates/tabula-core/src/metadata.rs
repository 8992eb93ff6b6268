//! # Column Metadata
//!
//! Per-column schema facts used to drive encoding and clause generation.
//!
//! ## Type Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Raw type string → SemanticType                          │
//! │                                                                         │
//! │  tinyint(1), bool, boolean              → Boolean                      │
//! │  tinyint, smallint, int, bigint, long   → Integer                      │
//! │  float, double, real                    → Double                       │
//! │  date                                   → Date                         │
//! │  datetime, timestamp                    → DateTime                     │
//! │  blob family, binary, varbinary         → Binary                       │
//! │  anything else (varchar, decimal, ...)  → String                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// The semantic type set every native column type maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Double,
    Date,
    DateTime,
    Boolean,
    Binary,
    String,
}

impl SemanticType {
    pub fn is_temporal(&self) -> bool {
        matches!(self, SemanticType::Date | SemanticType::DateTime)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Double => "double",
            SemanticType::Date => "date",
            SemanticType::DateTime => "datetime",
            SemanticType::Boolean => "boolean",
            SemanticType::Binary => "binary",
            SemanticType::String => "string",
        }
    }
}

/// One row of schema introspection output, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    /// Declared type as reported by the database, e.g. `varchar(120)`.
    pub raw_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<String>,
}

/// Immutable description of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Lowercased base type name, e.g. `varchar`.
    pub database_type: String,
    pub semantic: SemanticType,
    /// Declared size; never zero.
    pub size: u32,
    pub required: bool,
    pub primary_key: bool,
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Classifies an introspection row.
    pub fn from_raw(raw: RawColumn) -> Self {
        let (database_type, size) = split_raw_type(&raw.raw_type);
        let semantic = classify(&database_type, size);

        ColumnDescriptor {
            name: raw.name,
            database_type,
            semantic,
            size: size.unwrap_or(0).max(1),
            required: !raw.nullable,
            primary_key: raw.primary_key,
            default: raw.default,
        }
    }
}

/// Splits `bigint(20) unsigned` into (`bigint`, Some(20)).
///
/// The base type is the first alphabetic word; the size is the first run of
/// digits, so `decimal(10,2)` yields 10.
pub fn split_raw_type(raw: &str) -> (String, Option<u32>) {
    let lower = raw.trim().to_ascii_lowercase();

    let base: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    let digits: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    (base, digits.parse().ok())
}

/// Maps a base type name (and optional declared size) onto a semantic type.
pub fn classify(base: &str, size: Option<u32>) -> SemanticType {
    match base {
        "tinyint" if size == Some(1) => SemanticType::Boolean,
        "bool" | "boolean" | "bit" => SemanticType::Boolean,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "long" => {
            SemanticType::Integer
        }
        "float" | "double" | "real" => SemanticType::Double,
        "date" => SemanticType::Date,
        "datetime" | "timestamp" => SemanticType::DateTime,
        "tinyblob" | "smallblob" | "blob" | "mediumblob" | "longblob" | "bigblob" | "binary"
        | "varbinary" => SemanticType::Binary,
        _ => SemanticType::String,
    }
}

// =============================================================================
// Table Metadata
// =============================================================================

/// Ordered column descriptors for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    table: String,
    columns: Vec<ColumnDescriptor>,
}

impl TableMetadata {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        TableMetadata {
            table: table.into(),
            columns,
        }
    }

    /// Builds metadata straight from introspection rows.
    pub fn from_raw(table: impl Into<String>, raw: Vec<RawColumn>) -> Self {
        Self::new(table, raw.into_iter().map(ColumnDescriptor::from_raw).collect())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary-key subset, in column order. Composite keys yield several.
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, raw_type: &str) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    #[test]
    fn test_split_raw_type() {
        assert_eq!(split_raw_type("varchar(120)"), ("varchar".into(), Some(120)));
        assert_eq!(
            split_raw_type("bigint(20) unsigned"),
            ("bigint".into(), Some(20))
        );
        assert_eq!(split_raw_type("DECIMAL(10,2)"), ("decimal".into(), Some(10)));
        assert_eq!(split_raw_type("TEXT"), ("text".into(), None));
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("int", Some(11)), SemanticType::Integer);
        assert_eq!(classify("bigint", None), SemanticType::Integer);
        assert_eq!(classify("tinyint", Some(4)), SemanticType::Integer);
        assert_eq!(classify("tinyint", Some(1)), SemanticType::Boolean);
        assert_eq!(classify("boolean", None), SemanticType::Boolean);
        assert_eq!(classify("double", None), SemanticType::Double);
        assert_eq!(classify("float", None), SemanticType::Double);
        assert_eq!(classify("date", None), SemanticType::Date);
        assert_eq!(classify("datetime", None), SemanticType::DateTime);
        assert_eq!(classify("timestamp", None), SemanticType::DateTime);
        assert_eq!(classify("longblob", None), SemanticType::Binary);
        assert_eq!(classify("varchar", Some(20)), SemanticType::String);
        assert_eq!(classify("decimal", Some(10)), SemanticType::String);
        assert_eq!(classify("geometry", None), SemanticType::String);
    }

    #[test]
    fn test_descriptor_size_zero_normalized() {
        let d = ColumnDescriptor::from_raw(raw("created", "datetime"));
        assert_eq!(d.size, 1);
        assert_eq!(d.semantic, SemanticType::DateTime);

        let d = ColumnDescriptor::from_raw(raw("name", "varchar(0)"));
        assert_eq!(d.size, 1);
    }

    #[test]
    fn test_primary_keys_in_column_order() {
        let mut a = raw("order_id", "int");
        a.primary_key = true;
        a.nullable = false;
        let mut b = raw("line", "int");
        b.primary_key = true;
        let meta = TableMetadata::from_raw("lines", vec![a, raw("qty", "int"), b]);

        let pks: Vec<&str> = meta.primary_keys().map(|c| c.name.as_str()).collect();
        assert_eq!(pks, vec!["order_id", "line"]);
        assert!(meta.column("order_id").unwrap().required);
        assert!(!meta.column("qty").unwrap().required);
    }
}
