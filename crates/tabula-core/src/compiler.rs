//! # Filter / Key Compiler
//!
//! Turns keys and filters into parameterized SQL clauses, and assembles the
//! CRUD statements around them.
//!
//! ## Clause Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Criteria::Keys   {id: 7, branch: NULL}                                 │
//! │      └──► id = ? AND branch IS NULL                                     │
//! │                                                                         │
//! │  Criteria::Filter                                                       │
//! │      group "a" ──► (c1 AND c2 OR c3)  ─┐                                │
//! │      group "b" ──► (c4)               ─┼──► (a) OR (b)                  │
//! │                                        └──► group map ":a: AND :b:"     │
//! │                                                                         │
//! │  SELECT [TOP n] fields FROM t                                           │
//! │      WHERE .. GROUP BY .. ORDER BY .. [LIMIT n OFFSET m]                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operands are always bound. Sort and group-by entries are emitted verbatim
//! so callers may pass expressions such as `COALESCE(a, b)`.

use std::sync::Arc;

use crate::codec::ValueCodec;
use crate::dialect::Dialect;
use crate::error::{CoreError, CoreResult};
use crate::filter::{Condition, ConditionGroup, Filter, Operator};
use crate::metadata::{ColumnDescriptor, SemanticType, TableMetadata};
use crate::statement::{Param, Statement};
use crate::value::{Keys, Record, Value};

/// What a statement is restricted by.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Criteria {
    #[default]
    None,
    Keys(Keys),
    Filter(Filter),
}

impl Criteria {
    pub fn is_none(&self) -> bool {
        matches!(self, Criteria::None)
    }

    /// Page bounds requested by a filter, if any.
    pub fn page(&self) -> Option<(u64, u64)> {
        match self {
            Criteria::Filter(f) => f.page(),
            _ => None,
        }
    }
}

impl From<Keys> for Criteria {
    fn from(keys: Keys) -> Self {
        Criteria::Keys(keys)
    }
}

impl From<Filter> for Criteria {
    fn from(filter: Filter) -> Self {
        Criteria::Filter(filter)
    }
}

impl From<Option<Filter>> for Criteria {
    fn from(filter: Option<Filter>) -> Self {
        filter.map(Criteria::Filter).unwrap_or_default()
    }
}

/// Sign of an increase/decrease statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Increase,
    Decrease,
}

impl Adjustment {
    fn sign(&self) -> &'static str {
        match self {
            Adjustment::Increase => "+",
            Adjustment::Decrease => "-",
        }
    }
}

/// Dialect-aware SQL builder.
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    dialect: Arc<dyn Dialect>,
    codec: ValueCodec,
}

impl SqlCompiler {
    pub fn new(dialect: Arc<dyn Dialect>, codec: ValueCodec) -> Self {
        SqlCompiler { dialect, codec }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn quote(&self, ident: &str) -> String {
        self.dialect.quote_identifier(ident)
    }

    /// Literal rendering of a statement, for logs.
    pub fn render(&self, stmt: &Statement) -> String {
        stmt.to_literal(self.dialect.as_ref())
    }

    // =========================================================================
    // WHERE
    // =========================================================================

    /// `k1 = ? AND k2 IS NULL`, in key order.
    pub fn compile_keys(&self, keys: &Keys, meta: Option<&TableMetadata>) -> CoreResult<Statement> {
        if keys.is_empty() {
            return Err(CoreError::EmptyKeySet);
        }
        if keys.iter().any(|(name, _)| name.trim().is_empty()) {
            return Err(CoreError::EmptyKeyName);
        }

        let mut parts = Vec::with_capacity(keys.len());
        for (name, value) in keys.iter() {
            let mut part = Statement::from_sql(self.quote(name));
            if value.is_null() {
                part.push_sql(" IS NULL");
            } else {
                let param = match meta.and_then(|m| m.column(name)) {
                    Some(column) => self.codec.bind(value, column)?,
                    None => self.codec.bind_operand(value)?,
                };
                part.push_sql(" = ").push_param(param);
            }
            parts.push(part);
        }

        Ok(Statement::join(parts, " AND "))
    }

    /// One condition, without a leading combinator.
    pub fn compile_condition(
        &self,
        cond: &Condition,
        meta: Option<&TableMetadata>,
    ) -> CoreResult<Statement> {
        let column = meta.and_then(|m| m.column(unqualified(&cond.field)));
        let mut stmt = Statement::from_sql(self.quote(&cond.field));

        match cond.operator {
            Operator::IsNull => {
                stmt.push_sql(" IS NULL");
            }
            Operator::NotNull => {
                stmt.push_sql(" IS NOT NULL");
            }
            op @ (Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Lt
            | Operator::Ge
            | Operator::Le) => {
                let param = self.operand(&cond.value1, column, op)?;
                stmt.push_sql(&format!(" {} ", op.token())).push_param(param);
            }
            op @ (Operator::Contains | Operator::StartsWith | Operator::EndsWith) => {
                let text = self.pattern_text(&cond.value1, op)?;
                let pattern = match op {
                    Operator::StartsWith => format!("{}%", text),
                    Operator::EndsWith => format!("%{}", text),
                    _ => format!("%{}%", text),
                };
                stmt.push_sql(" LIKE ").push_param(Param::Text(pattern));
            }
            Operator::In | Operator::NotIn => {
                let keyword = if cond.operator == Operator::In { " IN (" } else { " NOT IN (" };
                let params = self.in_list(&cond.value1, column, cond.operator)?;
                stmt.push_sql(keyword);
                for (i, param) in params.into_iter().enumerate() {
                    if i > 0 {
                        stmt.push_sql(", ");
                    }
                    stmt.push_param(param);
                }
                stmt.push_sql(")");
            }
            Operator::Between | Operator::NotBetween => {
                let upper = cond.value2.as_ref().ok_or_else(|| {
                    CoreError::unsupported(format!(
                        "{} on '{}' requires two operands",
                        cond.operator, cond.field
                    ))
                })?;
                let keyword = if cond.operator == Operator::Between {
                    " BETWEEN "
                } else {
                    " NOT BETWEEN "
                };
                let lower = self.operand(&cond.value1, column, cond.operator)?;
                let upper = self.operand(upper, column, cond.operator)?;
                stmt.push_sql(keyword)
                    .push_param(lower)
                    .push_sql(" AND ")
                    .push_param(upper);
            }
            Operator::Regexp => {
                let text = self.pattern_text(&cond.value1, Operator::Regexp)?;
                let alternatives: Vec<&str> = text.split('|').filter(|a| !a.is_empty()).collect();
                if alternatives.is_empty() {
                    return Err(CoreError::unsupported(format!(
                        "RGXP on '{}' has no alternatives",
                        cond.field
                    )));
                }
                stmt.push_sql(" REGEXP ")
                    .push_param(Param::Text(alternatives.join("|")));
            }
        }

        Ok(stmt)
    }

    /// `(c1 AND c2 OR c3)`; `None` for an empty group.
    fn compile_group(
        &self,
        group: &ConditionGroup,
        meta: Option<&TableMetadata>,
    ) -> CoreResult<Option<Statement>> {
        if group.conditions.is_empty() {
            return Ok(None);
        }

        let mut stmt = Statement::from_sql("(");
        for (i, cond) in group.conditions.iter().enumerate() {
            if i > 0 {
                stmt.push_sql(&format!(" {} ", cond.logic.keyword()));
            }
            stmt.append(self.compile_condition(cond, meta)?);
        }
        stmt.push_sql(")");
        Ok(Some(stmt))
    }

    /// Predicate of a filter; empty when it holds no conditions.
    pub fn compile_filter(&self, filter: &Filter, meta: Option<&TableMetadata>) -> CoreResult<Statement> {
        let mut compiled = Vec::new();
        for group in &filter.groups {
            if let Some(stmt) = self.compile_group(group, meta)? {
                compiled.push((group.name.as_str(), stmt));
            }
        }

        match filter.group_map.as_deref().map(str::trim) {
            Some(template) if !template.is_empty() => {
                let declared: Vec<&str> = filter.groups.iter().map(|g| g.name.as_str()).collect();
                apply_group_map(template, &declared, &compiled)
            }
            _ if compiled.is_empty() => Ok(Statement::new()),
            _ => Ok(Statement::join(
                compiled.into_iter().map(|(_, s)| s).collect(),
                " OR ",
            )),
        }
    }

    /// Predicate of any criteria, without the `WHERE` keyword.
    pub fn compile_predicate(
        &self,
        criteria: &Criteria,
        meta: Option<&TableMetadata>,
    ) -> CoreResult<Statement> {
        match criteria {
            Criteria::None => Ok(Statement::new()),
            Criteria::Keys(keys) => self.compile_keys(keys, meta),
            Criteria::Filter(filter) => self.compile_filter(filter, meta),
        }
    }

    /// `GROUP BY .. ORDER BY ..` of a filter, verbatim.
    pub fn compile_ordering(&self, filter: &Filter) -> String {
        let mut sql = String::new();
        if !filter.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&filter.group_by.join(", "));
        }
        if !filter.sort.is_empty() {
            let sorts: Vec<String> = filter
                .sort
                .iter()
                .map(|s| format!("{} {}", s.field, s.direction.keyword()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&sorts.join(", "));
        }
        sql
    }

    // =========================================================================
    // Operands
    // =========================================================================

    fn operand(
        &self,
        value: &Value,
        column: Option<&ColumnDescriptor>,
        op: Operator,
    ) -> CoreResult<Param> {
        match (value, column) {
            (Value::Null, _) => Err(CoreError::unsupported(format!(
                "NULL operand for operator {}",
                op
            ))),
            // temporal operands follow the column's date or datetime format
            (Value::Date(_) | Value::DateTime(_) | Value::String(_), Some(col))
                if col.semantic.is_temporal() =>
            {
                self.codec.bind(value, col)
            }
            _ => self.codec.bind_operand(value),
        }
    }

    fn pattern_text(&self, value: &Value, op: Operator) -> CoreResult<String> {
        match value {
            Value::Null | Value::Binary(_) => Err(CoreError::unsupported(format!(
                "{} operand for operator {}",
                value.type_name(),
                op
            ))),
            Value::Double(d) if !d.is_finite() => {
                Err(CoreError::unsupported(format!("non-finite double {}", d)))
            }
            other => Ok(self.codec.text_of(other)),
        }
    }

    fn in_list(
        &self,
        value: &Value,
        column: Option<&ColumnDescriptor>,
        op: Operator,
    ) -> CoreResult<Vec<Param>> {
        let text = match value {
            Value::String(s) => s,
            other => return Ok(vec![self.operand(other, column, op)?]),
        };

        let numeric_column = column.filter(|c| {
            matches!(c.semantic, SemanticType::Integer | SemanticType::Double)
        });

        let params = text
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|element| match numeric_column {
                Some(col) => self.codec.bind(&Value::from(element), col),
                None => Ok(Param::Text(element.to_string())),
            })
            .collect::<CoreResult<Vec<_>>>()?;

        if params.is_empty() {
            return Err(CoreError::unsupported(format!("{} with an empty list", op)));
        }
        Ok(params)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// `*` or the quoted field list.
    pub fn compile_fields(&self, fields: &[String]) -> String {
        if fields.is_empty() {
            return "*".to_string();
        }
        fields
            .iter()
            .map(|f| self.quote(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Full SELECT. `page` overrides the filter's own pagination.
    pub fn select(
        &self,
        table: &str,
        fields: &[String],
        criteria: &Criteria,
        meta: Option<&TableMetadata>,
        page: Option<(u64, u64)>,
    ) -> CoreResult<Statement> {
        let page = page.or_else(|| criteria.page());

        let mut head = String::from("SELECT ");
        if let Some(prefix) = page.and_then(|(l, o)| self.dialect.limit_prefix(l, o)) {
            head.push_str(&prefix);
            head.push(' ');
        }
        head.push_str(&self.compile_fields(fields));
        head.push_str(" FROM ");
        head.push_str(&self.quote(table));

        let mut stmt = Statement::from_sql(head);
        stmt.append(where_clause(self.compile_predicate(criteria, meta)?));

        let mut ordered = false;
        if let Criteria::Filter(filter) = criteria {
            stmt.push_sql(&self.compile_ordering(filter));
            ordered = !filter.sort.is_empty();
        }

        if let Some(suffix) = page.and_then(|(l, o)| self.dialect.limit_suffix(l, o, ordered)) {
            stmt.push_sql(&suffix);
        }
        Ok(stmt)
    }

    /// Appends WHERE, ordering and pagination to caller-written SELECT text.
    pub fn extend_query(
        &self,
        sql: &str,
        criteria: &Criteria,
        meta: Option<&TableMetadata>,
    ) -> CoreResult<Statement> {
        let mut stmt = Statement::from_sql(sql);
        stmt.append(where_clause(self.compile_predicate(criteria, meta)?));

        if let Criteria::Filter(filter) = criteria {
            stmt.push_sql(&self.compile_ordering(filter));
            if let Some((limit, offset)) = filter.page() {
                stmt.push_sql(&self.dialect.trailing_limit(limit, offset, !filter.sort.is_empty()));
            }
        }
        Ok(stmt)
    }

    /// `SELECT count(*)` over the criteria's predicate only.
    pub fn count(
        &self,
        table: &str,
        criteria: &Criteria,
        meta: Option<&TableMetadata>,
    ) -> CoreResult<Statement> {
        let mut stmt = Statement::from_sql(format!(
            "SELECT count(*) AS total FROM {}",
            self.quote(table)
        ));
        stmt.append(where_clause(self.compile_predicate(criteria, meta)?));
        Ok(stmt)
    }

    /// INSERT of the record fields that match a column, in column order.
    pub fn insert(
        &self,
        table: &str,
        record: &Record,
        meta: &TableMetadata,
        ignore: bool,
    ) -> CoreResult<Statement> {
        let verb = match self.dialect.insert_ignore() {
            Some(keyword) if ignore => keyword,
            _ => "INSERT",
        };

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for column in meta.columns() {
            if let Some(value) = record.get(&column.name) {
                columns.push(self.quote(&column.name));
                let mut v = Statement::new();
                v.push_param(self.codec.bind(value, column)?);
                values.push(v);
            }
        }

        let mut stmt = Statement::from_sql(format!("{} INTO {}", verb, self.quote(table)));
        if columns.is_empty() {
            stmt.push_sql(self.dialect.default_values());
        } else {
            stmt.push_sql(&format!(" ({}) VALUES (", columns.join(", ")))
                .append(Statement::join(values, ", "))
                .push_sql(")");
        }
        Ok(stmt)
    }

    /// `UPDATE t SET a = ?, b = ? WHERE ..`
    pub fn update(
        &self,
        table: &str,
        assignments: &[(&ColumnDescriptor, &Value)],
        predicate: Statement,
    ) -> CoreResult<Statement> {
        let mut sets = Vec::with_capacity(assignments.len());
        for (column, value) in assignments {
            let mut set = Statement::from_sql(format!("{} = ", self.quote(&column.name)));
            set.push_param(self.codec.bind(value, column)?);
            sets.push(set);
        }

        let mut stmt = Statement::from_sql(format!("UPDATE {} SET ", self.quote(table)));
        stmt.append(Statement::join(sets, ", "))
            .append(where_clause(predicate));
        Ok(stmt)
    }

    /// `UPDATE t SET f = COALESCE(f,0) + n WHERE ..`
    pub fn adjust(
        &self,
        table: &str,
        field: &str,
        adjustment: Adjustment,
        quantity: Param,
        predicate: Statement,
    ) -> Statement {
        let field = self.quote(field);
        let mut stmt = Statement::from_sql(format!(
            "UPDATE {} SET {} = COALESCE({},0) {} ",
            self.quote(table),
            field,
            field,
            adjustment.sign()
        ));
        stmt.push_param(quantity).append(where_clause(predicate));
        stmt
    }

    pub fn delete(&self, table: &str, predicate: Statement) -> Statement {
        let mut stmt = Statement::from_sql(format!("DELETE FROM {}", self.quote(table)));
        stmt.append(where_clause(predicate));
        stmt
    }
}

/// ` WHERE <predicate>`, or nothing for an empty predicate.
pub fn where_clause(predicate: Statement) -> Statement {
    if predicate.is_empty() {
        return predicate;
    }
    let mut stmt = Statement::from_sql(" WHERE ");
    stmt.append(predicate);
    stmt
}

fn unqualified(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

/// Substitutes compiled groups into `:name:` placeholders.
///
/// Only names of declared groups are placeholders; any other text, colons
/// included, is copied through. A declared group with no conditions is
/// `UnknownGroup`.
fn apply_group_map(
    template: &str,
    declared: &[&str],
    compiled: &[(&str, Statement)],
) -> CoreResult<Statement> {
    let mut out = Statement::new();
    let mut rest = template;

    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        match after.find(':') {
            Some(end) if declared.contains(&&after[..end]) => {
                let name = &after[..end];
                let group = compiled
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, stmt)| stmt.clone())
                    .ok_or_else(|| CoreError::UnknownGroup(name.to_string()))?;
                out.push_sql(&rest[..start]).append(group);
                rest = &after[end + 1..];
            }
            _ => {
                out.push_sql(&rest[..=start]);
                rest = after;
            }
        }
    }

    out.push_sql(rest);
    Ok(out)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, SqlServer, Sqlite};
    use crate::filter::Direction;
    use crate::metadata::RawColumn;
    use chrono::NaiveDate;

    fn sqlite() -> SqlCompiler {
        SqlCompiler::new(Arc::new(Sqlite), ValueCodec::default())
    }

    fn users() -> TableMetadata {
        let col = |name: &str, raw_type: &str, pk: bool| RawColumn {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            nullable: !pk,
            primary_key: pk,
            default: None,
        };
        TableMetadata::from_raw(
            "users",
            vec![
                col("id", "integer", true),
                col("name", "varchar(80)", false),
                col("age", "int", false),
                col("birthday", "date", false),
                col("created", "datetime", false),
            ],
        )
    }

    fn cond_sql(cond: Condition) -> String {
        let c = sqlite();
        c.render(&c.compile_condition(&cond, None).unwrap())
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(cond_sql(Condition::new("age", Operator::Eq, 18)), "age = 18");
        assert_eq!(cond_sql(Condition::new("age", Operator::Gt, 18)), "age > 18");
        assert_eq!(cond_sql(Condition::new("age", Operator::Lt, 18)), "age < 18");
        assert_eq!(cond_sql(Condition::new("age", Operator::Ge, 1.5)), "age >= 1.5");
        assert_eq!(cond_sql(Condition::new("age", Operator::Le, 18)), "age <= 18");
        assert_eq!(
            cond_sql(Condition::new("name", Operator::Ne, "O'Hara")),
            "name <> 'O''Hara'"
        );
    }

    #[test]
    fn test_like_operators() {
        assert_eq!(
            cond_sql(Condition::new("name", Operator::Contains, "an")),
            "name LIKE '%an%'"
        );
        assert_eq!(
            cond_sql(Condition::new("name", Operator::StartsWith, "an")),
            "name LIKE 'an%'"
        );
        assert_eq!(
            cond_sql(Condition::new("name", Operator::EndsWith, "an")),
            "name LIKE '%an'"
        );
    }

    #[test]
    fn test_in_operators() {
        assert_eq!(cond_sql(Condition::new("id", Operator::In, 5)), "id IN (5)");
        assert_eq!(
            cond_sql(Condition::new("code", Operator::In, "a, b,,c")),
            "code IN ('a', 'b', 'c')"
        );
        assert_eq!(
            cond_sql(Condition::new("code", Operator::NotIn, "x'y")),
            "code NOT IN ('x''y')"
        );
    }

    #[test]
    fn test_in_list_coerced_by_numeric_column() {
        let c = sqlite();
        let meta = users();
        let stmt = c
            .compile_condition(&Condition::new("age", Operator::In, "18,21"), Some(&meta))
            .unwrap();
        assert_eq!(c.render(&stmt), "age IN (18, 21)");
        assert_eq!(stmt.params(), vec![Param::Int(18), Param::Int(21)]);
    }

    #[test]
    fn test_between_operators() {
        assert_eq!(
            cond_sql(Condition::between("age", 18, 30)),
            "age BETWEEN 18 AND 30"
        );
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            cond_sql(Condition::not_between("birthday", from, to)),
            "birthday NOT BETWEEN '2024-01-01' AND '2024-12-31'"
        );
    }

    #[test]
    fn test_regexp_and_null_operators() {
        assert_eq!(
            cond_sql(Condition::new("name", Operator::Regexp, "ana||bob|")),
            "name REGEXP 'ana|bob'"
        );
        assert_eq!(cond_sql(Condition::is_null("email")), "email IS NULL");
        assert_eq!(cond_sql(Condition::not_null("email")), "email IS NOT NULL");
    }

    #[test]
    fn test_unsupported_operands() {
        let c = sqlite();
        let bad = [
            Condition::new("age", Operator::Eq, Value::Null),
            Condition::new("age", Operator::Between, 18),
            Condition::new("data", Operator::Contains, Value::Binary(vec![1])),
            Condition::new("code", Operator::In, " , "),
            Condition::new("name", Operator::Regexp, "||"),
            Condition::new("age", Operator::Gt, f64::NAN),
        ];
        for cond in bad {
            assert!(
                matches!(
                    c.compile_condition(&cond, None),
                    Err(CoreError::UnsupportedFilterValue(_))
                ),
                "expected rejection for {:?}",
                cond
            );
        }
    }

    #[test]
    fn test_temporal_operand_uses_column_format() {
        let c = sqlite();
        let meta = users();
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let on_date = c
            .compile_condition(&Condition::new("birthday", Operator::Ge, ts), Some(&meta))
            .unwrap();
        assert_eq!(c.render(&on_date), "birthday >= '2024-03-01'");

        let on_datetime = c
            .compile_condition(&Condition::new("created", Operator::Ge, ts), Some(&meta))
            .unwrap();
        assert_eq!(c.render(&on_datetime), "created >= '2024-03-01 10:00:00'");
    }

    #[test]
    fn test_group_joining_uses_each_condition_logic() {
        let c = sqlite();
        let filter = Filter::new()
            .when("age", Operator::Ge, 18)
            .add(Condition::new("name", Operator::Contains, "an").or())
            .add_to("vip", Condition::new("tier", Operator::Eq, "gold"));

        let stmt = c.compile_filter(&filter, None).unwrap();
        assert_eq!(
            c.render(&stmt),
            "(age >= 18 OR name LIKE '%an%') OR (tier = 'gold')"
        );
    }

    #[test]
    fn test_group_map_substitution() {
        let c = sqlite();
        let filter = Filter::new()
            .when("age", Operator::Ge, 18)
            .add_to("vip", Condition::new("tier", Operator::Eq, "gold"))
            .group_map(":default: AND NOT :vip:");

        let stmt = c.compile_filter(&filter, None).unwrap();
        assert_eq!(c.render(&stmt), "(age >= 18) AND NOT (tier = 'gold')");

        let mut empty = filter.clone().group_map(":default: OR :other:");
        empty.groups.push(ConditionGroup {
            name: "other".to_string(),
            conditions: Vec::new(),
        });
        assert!(matches!(
            c.compile_filter(&empty, None),
            Err(CoreError::UnknownGroup(ref g)) if g == "other"
        ));
    }

    #[test]
    fn test_json_date_text_follows_column_type() {
        let c = SqlCompiler::new(Arc::new(Sqlite), ValueCodec::new("%d/%m/%Y", "%d/%m/%Y %H:%M"));
        let meta = users();
        let json = r#"{"groups":[{"name":"default","conditions":[
            {"field":"name","operator":"=","value1":"2024-03-01"},
            {"field":"birthday","operator":"=","value1":"2024-03-01"}
        ]}]}"#;
        let filter: Filter = serde_json::from_str(json).unwrap();

        let stmt = c.compile_filter(&filter, Some(&meta)).unwrap();
        assert_eq!(
            c.render(&stmt),
            "(name = '2024-03-01' AND birthday = '01/03/2024')"
        );
    }

    #[test]
    fn test_group_map_keeps_literal_text() {
        let c = sqlite();
        let filter = Filter::new()
            .when("age", Operator::Ge, 18)
            .group_map(":default: AND created > '2024-01-01 10:30:00' AND note <> ':vip:'");

        let stmt = c.compile_filter(&filter, None).unwrap();
        assert_eq!(
            c.render(&stmt),
            "(age >= 18) AND created > '2024-01-01 10:30:00' AND note <> ':vip:'"
        );
    }

    #[test]
    fn test_empty_filter_compiles_to_nothing() {
        let c = sqlite();
        assert!(c.compile_filter(&Filter::new(), None).unwrap().is_empty());
        assert!(c
            .compile_predicate(&Criteria::None, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_key_compilation() {
        let c = sqlite();
        let keys = Keys::new().with("id", 7).with("branch", Value::Null);
        let stmt = c.compile_keys(&keys, None).unwrap();
        assert_eq!(c.render(&stmt), "id = 7 AND branch IS NULL");
        assert_eq!(stmt.param_count(), 1);

        assert!(matches!(
            c.compile_keys(&Keys::new(), None),
            Err(CoreError::EmptyKeySet)
        ));
        assert!(matches!(
            c.compile_keys(&Keys::new().with("", 1), None),
            Err(CoreError::EmptyKeyName)
        ));
    }

    #[test]
    fn test_select_with_paging_and_order() {
        let c = SqlCompiler::new(Arc::new(MySql::default()), ValueCodec::default());
        let filter = Filter::new()
            .when("age", Operator::Gt, 18)
            .group_by("age")
            .sort("COALESCE(updated, created)", Direction::Desc)
            .limit(10)
            .offset(20);

        let stmt = c
            .select("users", &[], &Criteria::Filter(filter), None, None)
            .unwrap();
        assert_eq!(
            c.render(&stmt),
            "SELECT * FROM `users` WHERE (`age` > 18) GROUP BY age \
             ORDER BY COALESCE(updated, created) DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.sql(c.dialect()), "SELECT * FROM `users` WHERE (`age` > ?) GROUP BY age ORDER BY COALESCE(updated, created) DESC LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_select_single_row_per_dialect() {
        let keys = Criteria::Keys(Keys::new().with("id", 7));
        let fields = vec!["id".to_string(), "name".to_string()];

        let c = SqlCompiler::new(Arc::new(SqlServer), ValueCodec::default());
        let stmt = c.select("users", &fields, &keys, None, Some((1, 0))).unwrap();
        assert_eq!(
            c.render(&stmt),
            "SELECT TOP 1 [id], [name] FROM [users] WHERE [id] = 7"
        );
        assert_eq!(stmt.sql(c.dialect()), "SELECT TOP 1 [id], [name] FROM [users] WHERE [id] = @P1");

        let c = sqlite();
        let stmt = c.select("users", &[], &keys, None, Some((1, 0))).unwrap();
        assert_eq!(c.render(&stmt), "SELECT * FROM users WHERE id = 7 LIMIT 1");
    }

    #[test]
    fn test_count_ignores_ordering_and_paging() {
        let c = sqlite();
        let filter = Filter::new()
            .when("age", Operator::Gt, 18)
            .sort("age", Direction::Asc)
            .limit(5);
        let stmt = c.count("users", &Criteria::Filter(filter), None).unwrap();
        assert_eq!(
            c.render(&stmt),
            "SELECT count(*) AS total FROM users WHERE (age > 18)"
        );
    }

    #[test]
    fn test_extend_caller_query() {
        let c = SqlCompiler::new(Arc::new(SqlServer), ValueCodec::default());
        let filter = Filter::new().when("total", Operator::Gt, 100).limit(5);
        let stmt = c
            .extend_query("SELECT id, total FROM orders", &Criteria::Filter(filter), None)
            .unwrap();
        assert_eq!(
            c.render(&stmt),
            "SELECT id, total FROM orders WHERE ([total] > 100) \
             ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_insert_only_present_columns() {
        let c = sqlite();
        let meta = users();
        let record = Record::new()
            .with("name", "Ana")
            .with("age", Value::Null)
            .with("nickname", "ignored");

        let stmt = c.insert("users", &record, &meta, false).unwrap();
        assert_eq!(
            c.render(&stmt),
            "INSERT INTO users (name, age) VALUES ('Ana', NULL)"
        );

        let ignored = c.insert("users", &record, &meta, true).unwrap();
        assert!(c.render(&ignored).starts_with("INSERT OR IGNORE INTO users"));

        let empty = c.insert("users", &Record::new(), &meta, false).unwrap();
        assert_eq!(c.render(&empty), "INSERT INTO users DEFAULT VALUES");
    }

    #[test]
    fn test_update_and_delete() {
        let c = sqlite();
        let meta = users();
        let name = meta.column("name").unwrap();
        let age = meta.column("age").unwrap();
        let ana = Value::from("Ana");
        let thirty = Value::from("30");

        let predicate = c.compile_keys(&Keys::new().with("id", 7), Some(&meta)).unwrap();
        let stmt = c
            .update("users", &[(name, &ana), (age, &thirty)], predicate.clone())
            .unwrap();
        assert_eq!(
            c.render(&stmt),
            "UPDATE users SET name = 'Ana', age = 30 WHERE id = 7"
        );

        assert_eq!(
            c.render(&c.delete("users", predicate)),
            "DELETE FROM users WHERE id = 7"
        );
    }

    #[test]
    fn test_adjust() {
        let c = sqlite();
        let predicate = c.compile_keys(&Keys::new().with("id", 7), None).unwrap();
        let stmt = c.adjust("t", "balance", Adjustment::Increase, Param::Int(5), predicate.clone());
        assert_eq!(
            c.render(&stmt),
            "UPDATE t SET balance = COALESCE(balance,0) + 5 WHERE id = 7"
        );

        let stmt = c.adjust("t", "balance", Adjustment::Decrease, Param::Float(2.5), predicate);
        assert_eq!(
            c.render(&stmt),
            "UPDATE t SET balance = COALESCE(balance,0) - 2.5 WHERE id = 7"
        );
    }
}
