//! # Filter Model
//!
//! A structured, serializable predicate with sorting, grouping and
//! pagination.
//!
//! ## Shape
//! ```text
//! Filter
//! ├── groups (ordered)
//! │   ├── "default": [age >= 18, AND name %LIKE% "an"]
//! │   └── "vip":     [tier = "gold", OR spend > 1000]
//! ├── group_map: ":default: AND (:vip:)"   (optional, else groups are OR-ed)
//! ├── sort:      [created DESC]
//! ├── group_by:  []
//! └── limit / offset: 20 / 40              (limit <= 0 disables paging)
//! ```
//!
//! Filters usually arrive as JSON from the controller layer:
//! ```json
//! {"groups":[{"name":"default","conditions":[
//!     {"field":"age","operator":"BT","value1":18,"value2":30}]}],
//!  "sort":[{"field":"age","direction":"DESC"}],"limit":10}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::value::Value;

/// Name of the group used by [`Filter::add`].
pub const DEFAULT_GROUP: &str = "default";

// =============================================================================
// Operator
// =============================================================================

/// The closed set of condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>", alias = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "%LIKE%")]
    Contains,
    #[serde(rename = "LIKE%")]
    StartsWith,
    #[serde(rename = "%LIKE")]
    EndsWith,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NI")]
    NotIn,
    #[serde(rename = "BT")]
    Between,
    #[serde(rename = "NBT")]
    NotBetween,
    #[serde(rename = "RGXP")]
    Regexp,
    #[serde(rename = "NULL")]
    IsNull,
    #[serde(rename = "NNULL")]
    NotNull,
}

impl Operator {
    /// The wire token for this operator.
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Contains => "%LIKE%",
            Operator::StartsWith => "LIKE%",
            Operator::EndsWith => "%LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NI",
            Operator::Between => "BT",
            Operator::NotBetween => "NBT",
            Operator::Regexp => "RGXP",
            Operator::IsNull => "NULL",
            Operator::NotNull => "NNULL",
        }
    }

    /// Number of operands the operator consumes.
    pub fn operand_count(&self) -> usize {
        match self {
            Operator::IsNull | Operator::NotNull => 0,
            Operator::Between | Operator::NotBetween => 2,
            _ => 1,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le
        )
    }

    pub fn is_like(&self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            "%LIKE%" => Operator::Contains,
            "LIKE%" => Operator::StartsWith,
            "%LIKE" => Operator::EndsWith,
            "IN" => Operator::In,
            "NI" => Operator::NotIn,
            "BT" => Operator::Between,
            "NBT" => Operator::NotBetween,
            "RGXP" => Operator::Regexp,
            "NULL" => Operator::IsNull,
            "NNULL" => Operator::NotNull,
            other => {
                return Err(CoreError::unsupported(format!(
                    "unknown operator '{}'",
                    other
                )))
            }
        };
        Ok(op)
    }
}

// =============================================================================
// Logic / Direction
// =============================================================================

/// Combinator placed before a condition (ignored on a group's first one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

impl Logic {
    pub fn keyword(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

// =============================================================================
// Condition
// =============================================================================

/// One predicate: `field operator value1 [value2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default = "null_value")]
    pub value1: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    #[serde(default)]
    pub logic: Logic,
}

fn null_value() -> Value {
    Value::Null
}

impl Condition {
    /// Single-operand condition joined with AND.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Condition {
            field: field.into(),
            operator,
            value1: value.into(),
            value2: None,
            logic: Logic::And,
        }
    }

    pub fn between(field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Condition {
            value2: Some(to.into()),
            ..Condition::new(field, Operator::Between, from)
        }
    }

    pub fn not_between(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Condition {
            value2: Some(to.into()),
            ..Condition::new(field, Operator::NotBetween, from)
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Condition::new(field, Operator::IsNull, Value::Null)
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Condition::new(field, Operator::NotNull, Value::Null)
    }

    /// Joins this condition to the previous one with OR.
    pub fn or(mut self) -> Self {
        self.logic = Logic::Or;
        self
    }

    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }
}

/// A named, ordered list of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// One ORDER BY entry. The field is emitted verbatim, so it may be an
/// expression such as `COALESCE(updated, created)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

// =============================================================================
// Filter
// =============================================================================

/// Grouped conditions plus sort, group-by and pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub groups: Vec<ConditionGroup>,
    /// Boolean template over `:group:` placeholders, e.g. `:a: AND (:b:)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_map: Option<String>,
    pub sort: Vec<Sort>,
    pub group_by: Vec<String>,
    /// Pagination is disabled when `limit <= 0`.
    pub limit: i64,
    pub offset: i64,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition to the default group.
    pub fn add(self, condition: Condition) -> Self {
        self.add_to(DEFAULT_GROUP, condition)
    }

    /// Adds a condition to a named group, creating the group on first use.
    pub fn add_to(mut self, group: &str, condition: Condition) -> Self {
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(g) => g.conditions.push(condition),
            None => self.groups.push(ConditionGroup {
                name: group.to_string(),
                conditions: vec![condition],
            }),
        }
        self
    }

    /// Shorthand for `add(Condition::new(..))`.
    pub fn when(self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.add(Condition::new(field, operator, value))
    }

    pub fn group_map(mut self, template: impl Into<String>) -> Self {
        self.group_map = Some(template.into());
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Page bounds, or `None` when pagination is disabled.
    pub fn page(&self) -> Option<(u64, u64)> {
        if self.limit <= 0 {
            return None;
        }
        Some((self.limit as u64, self.offset.max(0) as u64))
    }

    /// True when no group holds a condition.
    pub fn has_conditions(&self) -> bool {
        self.groups.iter().any(|g| !g.conditions.is_empty())
    }

    pub fn group(&self, name: &str) -> Option<&ConditionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!("%like%".parse::<Operator>().unwrap(), Operator::Contains);
        assert_eq!("bt".parse::<Operator>().unwrap(), Operator::Between);
        assert_eq!("NNULL".parse::<Operator>().unwrap(), Operator::NotNull);
        assert!(matches!(
            "~=".parse::<Operator>(),
            Err(CoreError::UnsupportedFilterValue(_))
        ));
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Operator::IsNull.operand_count(), 0);
        assert_eq!(Operator::In.operand_count(), 1);
        assert_eq!(Operator::NotBetween.operand_count(), 2);
    }

    #[test]
    fn test_builder_groups() {
        let filter = Filter::new()
            .when("age", Operator::Ge, 18)
            .add(Condition::new("name", Operator::Contains, "an").or())
            .add_to("vip", Condition::new("tier", Operator::Eq, "gold"))
            .group_map(":default: AND :vip:")
            .sort("age", Direction::Desc)
            .limit(10);

        assert_eq!(filter.groups.len(), 2);
        assert_eq!(filter.group("default").unwrap().conditions.len(), 2);
        assert_eq!(filter.groups[0].conditions[1].logic, Logic::Or);
        assert_eq!(filter.page(), Some((10, 0)));
        assert!(filter.has_conditions());
    }

    #[test]
    fn test_pagination_disabled() {
        assert_eq!(Filter::new().page(), None);
        assert_eq!(Filter::new().limit(-1).offset(5).page(), None);
        assert_eq!(Filter::new().limit(5).offset(-3).page(), Some((5, 0)));
    }

    #[test]
    fn test_filter_from_json() {
        let json = r#"{
            "groups": [{"name": "default", "conditions": [
                {"field": "age", "operator": "BT", "value1": 18, "value2": 30},
                {"field": "email", "operator": "NULL", "logic": "OR"}
            ]}],
            "sort": [{"field": "age", "direction": "DESC"}],
            "limit": 10
        }"#;

        let filter: Filter = serde_json::from_str(json).unwrap();
        let conds = &filter.groups[0].conditions;

        assert_eq!(conds[0].operator, Operator::Between);
        assert_eq!(conds[0].value2, Some(Value::Integer(30)));
        assert_eq!(conds[1].operator, Operator::IsNull);
        assert_eq!(conds[1].value1, Value::Null);
        assert_eq!(conds[1].logic, Logic::Or);
        assert_eq!(filter.sort[0].direction, Direction::Desc);
        assert_eq!(filter.limit, 10);
        assert_eq!(filter.offset, 0);
    }
}
