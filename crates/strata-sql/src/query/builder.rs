//! The immutable query builder.

use std::sync::Arc;

use super::clause::{
    Aggregate, BoolOp, CombinedClause, Condition, HavingClause, JoinClause, JoinKind, OrderClause,
    OrderDirection, Predicate, WhereClause,
};
use super::render::SqlWriter;
use crate::dialect::Dialect;
use crate::error::{QueryError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// A persistent, composable SQL query builder.
///
/// Every method takes `&self` and returns a new builder; the receiver is
/// never modified, so a builder can be shared freely and used as the base of
/// several queries. Nested boolean nodes and subqueries are reference counted
/// and shared between copies.
///
/// # Example
///
/// ```rust
/// use strata_sql::{params, QueryBuilder};
///
/// let base = QueryBuilder::new("posts").where_clause("published = ?", params![true])?;
/// let recent = base.order_by_desc("created_at").limit(10);
///
/// let (sql, _) = recent.build_select();
/// assert_eq!(
///     sql,
///     r#"SELECT * FROM "posts" WHERE published = $1 ORDER BY created_at DESC LIMIT 10"#
/// );
/// // `base` is untouched
/// assert_eq!(base.limit_value(), None);
/// # Ok::<(), strata_sql::QueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    dialect: Dialect,
    table: String,
    selects: Vec<String>,
    distinct: bool,
    conditions: Vec<Condition>,
    orders: Vec<OrderClause>,
    group_columns: Vec<String>,
    havings: Vec<HavingClause>,
    limit: Option<u64>,
    offset: Option<u64>,
    joins: Vec<JoinClause>,
}

impl QueryBuilder {
    /// Creates an empty builder for `table` using the default dialect.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::default(),
            table: table.into(),
            selects: Vec::new(),
            distinct: false,
            conditions: Vec::new(),
            orders: Vec::new(),
            group_columns: Vec::new(),
            havings: Vec::new(),
            limit: None,
            offset: None,
            joins: Vec::new(),
        }
    }

    fn with(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        f(&mut next);
        next
    }

    fn with_condition(&self, condition: Condition) -> Self {
        self.with(|q| q.conditions.push(condition))
    }

    fn ensure_same_table(&self, operation: &'static str, other: &Self) -> Result<()> {
        if self.table == other.table {
            Ok(())
        } else {
            Err(QueryError::TableMismatch {
                operation,
                left: self.table.clone(),
                right: other.table.clone(),
            })
        }
    }

    // Accessors

    /// The target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The dialect used when rendering.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Selected columns; empty means `*`.
    #[must_use]
    pub fn selects(&self) -> &[String] {
        &self.selects
    }

    /// Whether `SELECT DISTINCT` is rendered.
    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// The top-level AND-list of the WHERE tree.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// ORDER BY terms.
    #[must_use]
    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    /// GROUP BY columns.
    #[must_use]
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// HAVING fragments.
    #[must_use]
    pub fn havings(&self) -> &[HavingClause] {
        &self.havings
    }

    /// JOIN clauses.
    #[must_use]
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// The LIMIT, if any.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// The OFFSET, if any.
    #[must_use]
    pub const fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Returns `true` when the WHERE tree is non-empty.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    // Configuration

    /// Renders with `dialect` instead of the default.
    #[must_use]
    pub fn with_dialect(&self, dialect: Dialect) -> Self {
        self.with(|q| q.dialect = dialect)
    }

    /// Returns an empty builder for the same table and dialect.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::new(self.table.clone()).with_dialect(self.dialect)
    }

    // WHERE

    /// AND-s a raw fragment with `?` markers onto the WHERE tree.
    ///
    /// When the tree already holds a combined node, the fragment is AND-ed
    /// alongside it: `(<combined>) AND <fragment>`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::PlaceholderMismatch`] when the markers and
    /// values do not line up.
    pub fn where_clause(&self, fragment: impl Into<String>, values: Vec<SqlValue>) -> Result<Self> {
        let clause = WhereClause::new(fragment, values)?;
        Ok(self.with_condition(clause.into()))
    }

    /// `column = ?`.
    #[must_use]
    pub fn where_eq(&self, column: &str, value: impl ToSqlValue) -> Self {
        let clause = WhereClause::trusted(format!("{column} = ?"), vec![value.to_sql_value()]);
        self.with_condition(clause.into())
    }

    /// `column IN (?, ?, ...)`. An empty list renders `1=0`.
    #[must_use]
    pub fn where_in<I, V>(&self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.with_condition(in_list(column, values, false).into())
    }

    /// `column NOT IN (?, ?, ...)`. An empty list renders `1=1`.
    #[must_use]
    pub fn where_not_in<I, V>(&self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.with_condition(in_list(column, values, true).into())
    }

    /// `column IS NULL`.
    #[must_use]
    pub fn where_null(&self, column: &str) -> Self {
        let clause = WhereClause::trusted(format!("{column} IS NULL"), Vec::new());
        self.with_condition(clause.into())
    }

    /// `column IS NOT NULL`.
    #[must_use]
    pub fn where_not_null(&self, column: &str) -> Self {
        let clause = WhereClause::trusted(format!("{column} IS NOT NULL"), Vec::new());
        self.with_condition(clause.into())
    }

    /// `column IN (<subquery>)`. The subquery may target another table.
    #[must_use]
    pub fn where_in_subquery(&self, column: &str, subquery: &Self) -> Self {
        self.subquery_condition(column, subquery, false)
    }

    /// `column NOT IN (<subquery>)`.
    #[must_use]
    pub fn where_not_in_subquery(&self, column: &str, subquery: &Self) -> Self {
        self.subquery_condition(column, subquery, true)
    }

    fn subquery_condition(&self, column: &str, subquery: &Self, negated: bool) -> Self {
        let predicate = Predicate::Subquery {
            column: column.to_owned(),
            negated,
            query: Arc::new(subquery.clone()),
        };
        self.with_condition(Condition::Predicate(predicate))
    }

    // Boolean combination

    /// OR-s the WHERE trees of two builders on the same table.
    ///
    /// If either side has no conditions the other side's tree is kept as is.
    /// Everything except the WHERE tree comes from `self`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::TableMismatch`] when the tables differ.
    pub fn or(&self, other: &Self) -> Result<Self> {
        self.combine(BoolOp::Or, other)
    }

    /// AND-s the WHERE trees of two builders on the same table.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::TableMismatch`] when the tables differ.
    pub fn and(&self, other: &Self) -> Result<Self> {
        self.combine(BoolOp::And, other)
    }

    fn combine(&self, op: BoolOp, other: &Self) -> Result<Self> {
        self.ensure_same_table(op.operation(), other)?;
        if other.conditions.is_empty() {
            return Ok(self.clone());
        }
        if self.conditions.is_empty() {
            return Ok(self.with(|q| q.conditions.clone_from(&other.conditions)));
        }

        let node = CombinedClause {
            op,
            left: self.conditions.clone(),
            right: other.conditions.clone(),
        };
        Ok(self.with(|q| q.conditions = vec![node.into()]))
    }

    /// Merges two builders on the same table.
    ///
    /// Conditions, orders, groups, havings, and joins are concatenated
    /// (exact duplicate joins dropped); selects are unioned in first-seen
    /// order; `distinct` is OR-ed; limit and offset prefer `self`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::TableMismatch`] when the tables differ.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        self.ensure_same_table("merge", other)?;
        Ok(self.with(|q| {
            q.conditions.extend(other.conditions.iter().cloned());
            for column in &other.selects {
                if !q.selects.contains(column) {
                    q.selects.push(column.clone());
                }
            }
            q.distinct |= other.distinct;
            q.orders.extend(other.orders.iter().cloned());
            q.group_columns.extend(other.group_columns.iter().cloned());
            q.havings.extend(other.havings.iter().cloned());
            q.limit = q.limit.or(other.limit);
            q.offset = q.offset.or(other.offset);
            for join in &other.joins {
                if !q.joins.contains(join) {
                    q.joins.push(join.clone());
                }
            }
        }))
    }

    // Projection, ordering, paging

    /// Adds selected columns or expressions, skipping ones already present.
    #[must_use]
    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(|q| {
            for column in columns {
                let column = column.into();
                if !q.selects.contains(&column) {
                    q.selects.push(column);
                }
            }
        })
    }

    /// Renders `SELECT DISTINCT`.
    #[must_use]
    pub fn distinct(&self) -> Self {
        self.with(|q| q.distinct = true)
    }

    /// Appends an ORDER BY term.
    #[must_use]
    pub fn order_by(&self, column: impl Into<String>, direction: OrderDirection) -> Self {
        let order = OrderClause {
            column: column.into(),
            direction,
        };
        self.with(|q| q.orders.push(order))
    }

    /// Appends an ascending ORDER BY term.
    #[must_use]
    pub fn order_by_asc(&self, column: impl Into<String>) -> Self {
        self.order_by(column, OrderDirection::Asc)
    }

    /// Appends a descending ORDER BY term.
    #[must_use]
    pub fn order_by_desc(&self, column: impl Into<String>) -> Self {
        self.order_by(column, OrderDirection::Desc)
    }

    /// Appends an ORDER BY term from `"col"` / `"-col"`.
    #[must_use]
    pub fn order_by_spec(&self, spec: &str) -> Self {
        let order = OrderClause::parse(spec);
        self.with(|q| q.orders.push(order))
    }

    /// Appends GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(|q| q.group_columns.extend(columns.into_iter().map(Into::into)))
    }

    /// AND-s a HAVING fragment.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::PlaceholderMismatch`] when the markers and
    /// values do not line up.
    pub fn having(&self, fragment: impl Into<String>, values: Vec<SqlValue>) -> Result<Self> {
        let clause = HavingClause::new(fragment, values)?;
        Ok(self.with(|q| q.havings.push(clause)))
    }

    /// Sets LIMIT.
    #[must_use]
    pub fn limit(&self, n: u64) -> Self {
        self.with(|q| q.limit = Some(n))
    }

    /// Sets OFFSET.
    #[must_use]
    pub fn offset(&self, n: u64) -> Self {
        self.with(|q| q.offset = Some(n))
    }

    // Joins

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn join(&self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Inner, table, None, on)
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(&self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Left, table, None, on)
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(&self, table: &str, on: &str) -> Self {
        self.push_join(JoinKind::Right, table, None, on)
    }

    /// Adds a join with an alias for the joined table.
    #[must_use]
    pub fn join_as(&self, kind: JoinKind, table: &str, alias: &str, on: &str) -> Self {
        self.push_join(kind, table, Some(alias), on)
    }

    fn push_join(&self, kind: JoinKind, table: &str, alias: Option<&str>, on: &str) -> Self {
        let join = JoinClause {
            kind,
            table: table.to_owned(),
            alias: alias.map(str::to_owned),
            on_condition: on.to_owned(),
        };
        self.with(|q| q.joins.push(join))
    }

    // Rendering

    fn writer(&self) -> SqlWriter {
        SqlWriter::new(self.dialect.rules())
    }

    /// Renders the SELECT statement and its arguments.
    #[must_use]
    pub fn build_select(&self) -> (String, Vec<SqlValue>) {
        let mut w = self.writer();
        w.write_select(self);
        w.finish()
    }

    /// The arguments of [`build_select`](Self::build_select), in
    /// placeholder order.
    #[must_use]
    pub fn all_args(&self) -> Vec<SqlValue> {
        self.build_select().1
    }

    /// Renders `SELECT COUNT(*)`. Grouped, distinct or paged queries are
    /// counted through a subquery, so LIMIT and OFFSET bound the count.
    #[must_use]
    pub fn build_count(&self) -> (String, Vec<SqlValue>) {
        let mut w = self.writer();
        w.write_count(self);
        w.finish()
    }

    /// Renders `SELECT <FN>(column)`.
    #[must_use]
    pub fn build_aggregate(&self, aggregate: Aggregate, column: &str) -> (String, Vec<SqlValue>) {
        let mut w = self.writer();
        w.write_aggregate(self, aggregate, column);
        w.finish()
    }

    /// Renders `SELECT SUM(column)`.
    #[must_use]
    pub fn build_sum(&self, column: &str) -> (String, Vec<SqlValue>) {
        self.build_aggregate(Aggregate::Sum, column)
    }

    /// Renders `SELECT AVG(column)`.
    #[must_use]
    pub fn build_avg(&self, column: &str) -> (String, Vec<SqlValue>) {
        self.build_aggregate(Aggregate::Avg, column)
    }

    /// Renders `SELECT MIN(column)`.
    #[must_use]
    pub fn build_min(&self, column: &str) -> (String, Vec<SqlValue>) {
        self.build_aggregate(Aggregate::Min, column)
    }

    /// Renders `SELECT MAX(column)`.
    #[must_use]
    pub fn build_max(&self, column: &str) -> (String, Vec<SqlValue>) {
        self.build_aggregate(Aggregate::Max, column)
    }

    /// Renders an INSERT of one row. No values renders `DEFAULT VALUES`.
    /// WHERE, ordering, and paging are ignored.
    #[must_use]
    pub fn build_insert<I, K, V>(&self, values: I) -> (String, Vec<SqlValue>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToSqlValue,
    {
        let mut w = self.writer();
        w.write_insert(self, collect_assignments(values));
        w.finish()
    }

    /// Renders an UPDATE of the rows matched by the WHERE tree.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyAssignment`] when `values` is empty.
    pub fn build_update<I, K, V>(&self, values: I) -> Result<(String, Vec<SqlValue>)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToSqlValue,
    {
        let values = collect_assignments(values);
        if values.is_empty() {
            return Err(QueryError::EmptyAssignment {
                statement: "UPDATE",
                table: self.table.clone(),
            });
        }
        let mut w = self.writer();
        w.write_update(self, values);
        Ok(w.finish())
    }

    /// Renders a DELETE of the rows matched by the WHERE tree.
    #[must_use]
    pub fn build_delete(&self) -> (String, Vec<SqlValue>) {
        let mut w = self.writer();
        w.write_delete(self);
        w.finish()
    }
}

fn in_list<I, V>(column: &str, values: I, negated: bool) -> WhereClause
where
    I: IntoIterator<Item = V>,
    V: ToSqlValue,
{
    let values: Vec<SqlValue> = values.into_iter().map(ToSqlValue::to_sql_value).collect();
    if values.is_empty() {
        let always = if negated { "1=1" } else { "1=0" };
        return WhereClause::trusted(always.to_owned(), values);
    }
    let markers = vec!["?"; values.len()].join(", ");
    let keyword = if negated { "NOT IN" } else { "IN" };
    WhereClause::trusted(format!("{column} {keyword} ({markers})"), values)
}

fn collect_assignments<I, K, V>(values: I) -> Vec<(String, SqlValue)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToSqlValue,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_sql_value()))
        .collect()
}
