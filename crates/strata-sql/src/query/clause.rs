//! Clause primitives collected by [`QueryBuilder`].
//!
//! The WHERE part of a builder is a tree: the top level is an AND-list of
//! [`Condition`]s, each either a leaf [`Predicate`] or a [`CombinedClause`]
//! joining two AND-lists with a boolean operator.

use std::sync::Arc;

use super::builder::QueryBuilder;
use crate::error::{QueryError, Result};
use crate::value::SqlValue;

/// Counts the `?` markers in `fragment`, skipping single-quoted literals.
///
/// A doubled quote inside a literal (`'it''s'`) toggles twice and leaves the
/// scanner inside the literal, so escaped quotes need no special handling.
pub(crate) fn count_markers(fragment: &str) -> usize {
    let mut in_literal = false;
    let mut markers = 0;
    for c in fragment.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => markers += 1,
            _ => {}
        }
    }
    markers
}

/// A raw SQL fragment with positional `?` markers and their bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    fragment: String,
    values: Vec<SqlValue>,
}

impl WhereClause {
    /// Creates a clause, checking that markers and values line up.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::PlaceholderMismatch`] when the number of `?`
    /// markers outside string literals differs from `values.len()`.
    pub fn new(fragment: impl Into<String>, values: Vec<SqlValue>) -> Result<Self> {
        let fragment = fragment.into();
        let markers = count_markers(&fragment);
        if markers != values.len() {
            return Err(QueryError::PlaceholderMismatch {
                fragment,
                markers,
                values: values.len(),
            });
        }
        Ok(Self { fragment, values })
    }

    /// Builds a clause whose markers are known to match.
    pub(crate) fn trusted(fragment: String, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(count_markers(&fragment), values.len());
        Self { fragment, values }
    }

    /// The SQL fragment with `?` markers.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The bound values, in marker order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// A HAVING fragment. Same shape and invariant as [`WhereClause`].
pub type HavingClause = WhereClause;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl OrderDirection {
    /// The SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Column or expression to sort by.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderClause {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses `"-col"` as descending and `"col"` as ascending.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }

    /// Returns the SQL representation.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
}

impl JoinKind {
    /// The SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Join flavor.
    pub kind: JoinKind,
    /// Joined table.
    pub table: String,
    /// Optional alias for the joined table.
    pub alias: Option<String>,
    /// ON condition, emitted as given.
    pub on_condition: String,
}

/// Boolean operator of a [`CombinedClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// AND
    And,
    /// OR
    Or,
}

impl BoolOp {
    /// The SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    pub(crate) const fn operation(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Leaf of the WHERE tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A raw fragment with bound values.
    Clause(WhereClause),
    /// `column [NOT] IN (<subquery>)`.
    Subquery {
        /// Column compared against the subquery.
        column: String,
        /// Whether this is `NOT IN`.
        negated: bool,
        /// The subquery; its arguments are spliced where its text appears.
        query: Arc<QueryBuilder>,
    },
}

/// A boolean node joining two AND-lists.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedClause {
    /// Operator joining the two sides.
    pub op: BoolOp,
    /// Left operand group.
    pub left: Vec<Condition>,
    /// Right operand group.
    pub right: Vec<Condition>,
}

/// One entry of an AND-list.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A leaf predicate.
    Predicate(Predicate),
    /// A nested boolean node.
    Combined(Arc<CombinedClause>),
}

impl From<WhereClause> for Condition {
    fn from(clause: WhereClause) -> Self {
        Self::Predicate(Predicate::Clause(clause))
    }
}

impl From<CombinedClause> for Condition {
    fn from(node: CombinedClause) -> Self {
        Self::Combined(Arc::new(node))
    }
}

/// Aggregate functions a builder can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// COUNT
    Count,
    /// SUM
    Sum,
    /// AVG
    Avg,
    /// MIN
    Min,
    /// MAX
    Max,
}

impl Aggregate {
    /// The SQL function name.
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}
