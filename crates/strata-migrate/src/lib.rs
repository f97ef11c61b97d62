//! Schema comparison and migration generation for `strata-sql`.
//!
//! `strata-migrate` turns declared models into SQL migrations:
//! - The declared schema is a [`ModelRegistry`](schema::ModelRegistry)
//!   populated by explicit registration (or loaded from JSON)
//! - The [`SchemaComparator`](comparator::SchemaComparator) diffs it against
//!   an introspected [`DatabaseSchema`](schema::DatabaseSchema)
//! - The [`MigrationGenerator`](generator::MigrationGenerator) renders the
//!   diff as up and down scripts, creating referenced tables first and
//!   deferring foreign keys that close a cycle
//!
//! # Example
//!
//! ```rust
//! use strata_migrate::prelude::*;
//!
//! let models = ModelRegistry::new().with(
//!     ModelSchema::new("users")
//!         .column(ModelColumn::new("id", SqlType::BigInt).primary_key())
//!         .column(ModelColumn::new("name", SqlType::Text)),
//! );
//!
//! let diff = SchemaComparator::new(Dialect::Postgres).compare(&models, &DatabaseSchema::new())?;
//! let script = MigrationGenerator::new(Dialect::Postgres).generate(&diff, &models, "init")?;
//!
//! assert!(script.up.contains(r#""id" BIGINT PRIMARY KEY NOT NULL"#));
//! assert!(script.down.contains(r#"DROP TABLE IF EXISTS "users""#));
//! # Ok::<(), MigrateError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what changed
//! strata-migrate diff --models models.json --database db.json
//!
//! # Print the forward SQL for SQLite
//! strata-migrate --dialect sqlite sql --models models.json --database db.json
//!
//! # Write timestamped .up.sql / .down.sql files
//! strata-migrate makemigrations --models models.json --database db.json --name init
//! ```

pub mod comparator;
pub mod ddl;
pub mod diff;
pub mod error;
pub mod generator;
pub mod planner;
pub mod schema;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::comparator::SchemaComparator;
    pub use crate::diff::{ChangeType, SchemaChange, SchemaDiff};
    pub use crate::error::{MigrateError, Result};
    pub use crate::generator::{MigrationGenerator, MigrationScript};
    pub use crate::planner::{CyclePolicy, DeferredForeignKey};
    pub use crate::schema::{
        DatabaseColumn, DatabaseForeignKey, DatabaseSchema, DatabaseTable, DefaultValue,
        ModelColumn, ModelForeignKey, ModelRegistry, ModelSchema,
    };
    pub use crate::writer::{generate_migration_name, MigrationFiles, MigrationWriter};
    pub use strata_sql::{Dialect, SqlType};
}
