//! # Statements
//!
//! SQL text interleaved with bound parameters.
//!
//! ```text
//! Statement: [Sql("age BETWEEN "), Param(18), Sql(" AND "), Param(30)]
//!
//!   .sql(&Sqlite)        → "age BETWEEN ? AND ?"      (executed)
//!   .params()            → [Int(18), Int(30)]         (bound)
//!   .to_literal(&Sqlite) → "age BETWEEN 18 AND 30"    (logged)
//! ```

use crate::dialect::Dialect;

/// A bind value, already coerced and formatted for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl Param {
    /// Renders the parameter as inline SQL literal text.
    pub fn to_literal(&self, dialect: &dyn Dialect) -> String {
        match self {
            Param::Null => "NULL".to_string(),
            Param::Int(i) => i.to_string(),
            Param::Float(f) => f.to_string(),
            Param::Bool(true) => "'1'".to_string(),
            Param::Bool(false) => "'0'".to_string(),
            Param::Text(s) => dialect.quote_string(s),
            Param::Bytes(b) => dialect.binary_literal(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Sql(String),
    Param(Param),
}

/// An SQL statement (or clause) under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    parts: Vec<Part>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a statement from plain SQL text.
    pub fn from_sql(sql: impl Into<String>) -> Self {
        let mut stmt = Statement::new();
        stmt.push_sql(&sql.into());
        stmt
    }

    /// Appends SQL text, merging with a trailing text part.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        if let Some(Part::Sql(last)) = self.parts.last_mut() {
            last.push_str(sql);
        } else {
            self.parts.push(Part::Sql(sql.to_string()));
        }
        self
    }

    /// Appends a bound parameter.
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.parts.push(Part::Param(param));
        self
    }

    /// Appends another statement's text and parameters.
    pub fn append(&mut self, other: Statement) -> &mut Self {
        for part in other.parts {
            match part {
                Part::Sql(sql) => {
                    self.push_sql(&sql);
                }
                Part::Param(p) => {
                    self.push_param(p);
                }
            }
        }
        self
    }

    /// Joins statements with a separator.
    pub fn join(items: Vec<Statement>, separator: &str) -> Statement {
        let mut out = Statement::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push_sql(separator);
            }
            out.append(item);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// SQL text with dialect placeholders, ready to execute.
    pub fn sql(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();
        let mut index = 0;
        for part in &self.parts {
            match part {
                Part::Sql(sql) => out.push_str(sql),
                Part::Param(_) => {
                    index += 1;
                    out.push_str(&dialect.placeholder(index));
                }
            }
        }
        out
    }

    /// Bind values, in placeholder order.
    pub fn params(&self) -> Vec<Param> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Param(param) => Some(param.clone()),
                Part::Sql(_) => None,
            })
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::Param(_)))
            .count()
    }

    /// SQL text with parameters inlined as literals. Never executed.
    pub fn to_literal(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Sql(sql) => out.push_str(sql),
                Part::Param(p) => out.push_str(&p.to_literal(dialect)),
            }
        }
        out
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
