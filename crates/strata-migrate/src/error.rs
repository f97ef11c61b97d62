//! Error types for schema comparison and migration generation.

use std::path::PathBuf;

use strata_sql::QueryError;

use crate::diff::ChangeType;

/// Errors that can occur while diffing schemas or generating migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A model foreign key points at a table that is neither declared nor
    /// kept in the database.
    #[error("Foreign key {table}.{column} references undeclared table '{to_table}'")]
    UnknownReference {
        /// Table declaring the foreign key.
        table: String,
        /// Foreign key column.
        column: String,
        /// Referenced table.
        to_table: String,
    },

    /// A diff names a table the model registry does not declare.
    #[error("No model registered for table '{0}'")]
    MissingModel(String),

    /// A diff entry lacks the column or a detail its DDL needs.
    #[error("Malformed {change_type:?} change on '{table}': missing {missing}")]
    MalformedChange {
        /// Table the change targets.
        table: String,
        /// Kind of change.
        change_type: ChangeType,
        /// The absent column or detail key.
        missing: &'static str,
    },

    /// Foreign keys form a cycle and the cycle policy forbids deferral.
    #[error("Foreign key cycle between tables: {}", .path.join(" -> "))]
    DependencyCycle {
        /// Tables along the cycle, first table repeated at the end.
        path: Vec<String>,
    },

    /// No valid creation order exists for the given dialect.
    #[error("Cannot order table creation for: {}", .tables.join(", "))]
    UnresolvableCycle {
        /// Tables involved.
        tables: Vec<String>,
    },

    /// IO error (reading schemas, writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// Error from the query layer (e.g. an unknown dialect name).
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
