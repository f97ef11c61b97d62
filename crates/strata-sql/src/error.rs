//! Error types for query building.

/// Errors raised while assembling a query.
///
/// All of these are programmer errors detected synchronously, before any SQL
/// leaves the builder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A fragment's `?` markers do not match the number of bound values.
    #[error("fragment `{fragment}` has {markers} placeholder(s) but {values} value(s) were bound")]
    PlaceholderMismatch {
        /// The offending fragment.
        fragment: String,
        /// Number of `?` markers found in the fragment.
        markers: usize,
        /// Number of values supplied.
        values: usize,
    },

    /// Two builders targeting different tables were combined.
    #[error("cannot {operation} a query on \"{right}\" into a query on \"{left}\"")]
    TableMismatch {
        /// The combining operation (`or`, `and`, `merge`).
        operation: &'static str,
        /// Table of the receiving builder.
        left: String,
        /// Table of the argument builder.
        right: String,
    },

    /// A statement that needs column values was given none.
    #[error("{statement} on \"{table}\" requires at least one column value")]
    EmptyAssignment {
        /// Statement kind (`UPDATE`).
        statement: &'static str,
        /// Target table.
        table: String,
    },

    /// A dialect identifier could not be resolved.
    #[error("unknown SQL dialect: {0}")]
    UnknownDialect(String),
}

/// Result type for query building.
pub type Result<T> = std::result::Result<T, QueryError>;
