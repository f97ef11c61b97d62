//! # strata-sql
//!
//! A composable, dialect-aware SQL query builder.
//!
//! This crate provides:
//! - An immutable [`QueryBuilder`] whose every method returns a new value
//! - Boolean combination of independently built queries (`or` / `and`)
//!   with placeholders renumbered across both sides
//! - A [`Dialect`] strategy table for placeholders, quoting, and type names
//!
//! ## Building Queries
//!
//! ```rust
//! use strata_sql::{params, QueryBuilder, SqlValue};
//!
//! let adults = QueryBuilder::new("users").where_clause("age > ?", params![18])?;
//! let admins = QueryBuilder::new("users").where_clause("role = ?", params!["admin"])?;
//!
//! let (sql, args) = adults.or(&admins)?.build_select();
//!
//! assert_eq!(sql, r#"SELECT * FROM "users" WHERE (age > $1 OR role = $2)"#);
//! assert_eq!(args, vec![SqlValue::Int(18), SqlValue::Text("admin".into())]);
//! # Ok::<(), strata_sql::QueryError>(())
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values never reach the SQL text; they are returned as an ordered argument
//! list that lines up with the placeholders:
//!
//! ```rust
//! use strata_sql::{Dialect, QueryBuilder};
//!
//! let (sql, args) = QueryBuilder::new("users")
//!     .with_dialect(Dialect::Sqlite)
//!     .where_eq("name", "'; DROP TABLE users; --")
//!     .build_select();
//!
//! assert_eq!(sql, r#"SELECT * FROM "users" WHERE name = ?"#);
//! assert_eq!(args.len(), 1);
//! ```

pub mod dialect;
pub mod error;
pub mod query;
pub mod types;
pub mod value;

pub use dialect::{AutoIncrement, Dialect, DialectRules, PlaceholderStyle};
pub use error::{QueryError, Result};
pub use query::{
    Aggregate, BoolOp, CombinedClause, Condition, HavingClause, JoinClause, JoinKind, OrderClause,
    OrderDirection, Predicate, QueryBuilder, WhereClause,
};
pub use types::SqlType;
pub use value::{SqlValue, ToSqlValue};
