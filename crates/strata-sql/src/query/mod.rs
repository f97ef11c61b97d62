//! Query building.
//!
//! [`QueryBuilder`] collects clauses; rendering turns them into SQL text and
//! an argument list for the builder's dialect.

mod builder;
mod clause;
mod render;

pub use builder::QueryBuilder;
pub use clause::{
    Aggregate, BoolOp, CombinedClause, Condition, HavingClause, JoinClause, JoinKind, OrderClause,
    OrderDirection, Predicate, WhereClause,
};
