//! Statement rendering.
//!
//! A single [`SqlWriter`] walks the builder in document order and appends
//! text and arguments together. A placeholder's number is always the length
//! of the argument list right after its value is pushed, so renumbering across
//! combined builders and subqueries falls out of the traversal.

use super::builder::QueryBuilder;
use super::clause::{Aggregate, CombinedClause, Condition, Predicate, WhereClause};
use crate::dialect::DialectRules;
use crate::value::SqlValue;

pub(crate) struct SqlWriter {
    rules: &'static DialectRules,
    sql: String,
    args: Vec<SqlValue>,
}

impl SqlWriter {
    pub(crate) fn new(rules: &'static DialectRules) -> Self {
        Self {
            rules,
            sql: String::new(),
            args: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.args)
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn push_ident(&mut self, name: &str) {
        let quoted = self.rules.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    fn push_value(&mut self, value: SqlValue) {
        self.args.push(value);
        let placeholder = self.rules.placeholder(self.args.len());
        self.sql.push_str(&placeholder);
    }

    /// Copies `fragment`, replacing each `?` outside string literals with the
    /// next placeholder.
    fn push_fragment(&mut self, clause: &WhereClause) {
        let mut values = clause.values().iter();
        let mut in_literal = false;
        for c in clause.fragment().chars() {
            match c {
                '\'' => {
                    in_literal = !in_literal;
                    self.sql.push(c);
                }
                '?' if !in_literal => match values.next() {
                    Some(value) => self.push_value(value.clone()),
                    None => self.sql.push(c),
                },
                _ => self.sql.push(c),
            }
        }
    }

    fn push_list(&mut self, items: &[String]) {
        self.push(&items.join(", "));
    }

    fn write_conditions(&mut self, conditions: &[Condition]) {
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.write_condition(condition);
        }
    }

    fn write_condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Predicate(predicate) => self.write_predicate(predicate),
            Condition::Combined(node) => self.write_combined(node),
        }
    }

    fn write_predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Clause(clause) => self.push_fragment(clause),
            Predicate::Subquery {
                column,
                negated,
                query,
            } => {
                self.push(column);
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                self.write_select(query);
                self.push(")");
            }
        }
    }

    fn write_combined(&mut self, node: &CombinedClause) {
        self.push("(");
        self.write_group(&node.left);
        self.push(" ");
        self.push(node.op.as_sql());
        self.push(" ");
        self.write_group(&node.right);
        self.push(")");
    }

    /// A single condition renders bare (a combined node brings its own
    /// parentheses); several are AND-ed inside parentheses.
    fn write_group(&mut self, group: &[Condition]) {
        if let [single] = group {
            self.write_condition(single);
        } else {
            self.push("(");
            self.write_conditions(group);
            self.push(")");
        }
    }

    fn write_where(&mut self, query: &QueryBuilder) {
        if query.has_conditions() {
            self.push(" WHERE ");
            self.write_conditions(query.conditions());
        }
    }

    /// `FROM "table"` plus joins and WHERE.
    fn write_source(&mut self, query: &QueryBuilder) {
        self.push(" FROM ");
        self.push_ident(query.table());
        for join in query.joins() {
            self.push(" ");
            self.push(join.kind.as_sql());
            self.push(" ");
            self.push_ident(&join.table);
            if let Some(alias) = &join.alias {
                self.push(" AS ");
                self.push_ident(alias);
            }
            self.push(" ON ");
            self.push(&join.on_condition);
        }
        self.write_where(query);
    }

    fn write_grouping(&mut self, query: &QueryBuilder) {
        if !query.group_columns().is_empty() {
            self.push(" GROUP BY ");
            self.push_list(query.group_columns());
        }
        for (i, having) in query.havings().iter().enumerate() {
            self.push(if i == 0 { " HAVING " } else { " AND " });
            self.push_fragment(having);
        }
    }

    pub(crate) fn write_select(&mut self, query: &QueryBuilder) {
        self.push("SELECT ");
        if query.is_distinct() {
            self.push("DISTINCT ");
        }
        if query.selects().is_empty() {
            self.push("*");
        } else {
            self.push_list(query.selects());
        }
        self.write_source(query);
        self.write_grouping(query);

        if !query.orders().is_empty() {
            let orders: Vec<String> = query.orders().iter().map(|o| o.to_sql()).collect();
            self.push(" ORDER BY ");
            self.push_list(&orders);
        }
        if let Some(limit) = query.limit_value() {
            self.push(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset_value() {
            self.push(&format!(" OFFSET {offset}"));
        }
    }

    pub(crate) fn write_count(&mut self, query: &QueryBuilder) {
        let paged = query.limit_value().is_some() || query.offset_value().is_some();
        if paged || query.is_distinct() || !query.group_columns().is_empty() {
            self.push("SELECT COUNT(*) FROM (");
            self.write_select(query);
            self.push(") AS ");
            self.push_ident("counted");
        } else {
            self.push("SELECT COUNT(*)");
            self.write_source(query);
        }
    }

    pub(crate) fn write_aggregate(&mut self, query: &QueryBuilder, aggregate: Aggregate, column: &str) {
        self.push("SELECT ");
        self.push(aggregate.function());
        self.push("(");
        self.push(column);
        self.push(")");
        self.write_source(query);
        self.write_grouping(query);
    }

    pub(crate) fn write_insert(&mut self, query: &QueryBuilder, values: Vec<(String, SqlValue)>) {
        self.push("INSERT INTO ");
        self.push_ident(query.table());
        if values.is_empty() {
            self.push(" DEFAULT VALUES");
            return;
        }

        self.push(" (");
        for (i, (column, _)) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(column);
        }
        self.push(") VALUES (");
        for (i, (_, value)) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_value(value);
        }
        self.push(")");
    }

    pub(crate) fn write_update(&mut self, query: &QueryBuilder, values: Vec<(String, SqlValue)>) {
        self.push("UPDATE ");
        self.push_ident(query.table());
        self.push(" SET ");
        for (i, (column, value)) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(&column);
            self.push(" = ");
            self.push_value(value);
        }
        self.write_where(query);
    }

    pub(crate) fn write_delete(&mut self, query: &QueryBuilder) {
        self.push("DELETE FROM ");
        self.push_ident(query.table());
        self.write_where(query);
    }
}
