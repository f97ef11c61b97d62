//! Declared-vs-introspected schema comparison.

use std::collections::BTreeSet;

use strata_sql::Dialect;
use tracing::debug;

use crate::diff::{detail, SchemaChange, SchemaDiff};
use crate::error::{MigrateError, Result};
use crate::schema::{is_bookkeeping_table, DatabaseSchema, DatabaseTable, ModelRegistry, ModelSchema};

/// Compares a [`ModelRegistry`] against a [`DatabaseSchema`].
///
/// Changes are emitted in a fixed order: created tables, dropped tables,
/// then per-table column and foreign key changes. Drift is the output, not an
/// error; only structurally invalid input fails.
#[derive(Debug, Clone, Default)]
pub struct SchemaComparator {
    dialect: Dialect,
    ignored_tables: BTreeSet<String>,
}

impl SchemaComparator {
    /// Creates a comparator rendering column types for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ignored_tables: BTreeSet::new(),
        }
    }

    /// Database tables that are never reported as dropped.
    #[must_use]
    pub fn ignore_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_tables
            .extend(tables.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, table: &str) -> bool {
        is_bookkeeping_table(table) || self.ignored_tables.contains(table)
    }

    /// Compares declared models with the database.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::UnknownReference`] when a model foreign key
    /// references a table that is not declared and will not survive the
    /// migration: absent from the database, or present but about to be
    /// dropped because it is neither ignored nor bookkeeping.
    pub fn compare(&self, models: &ModelRegistry, database: &DatabaseSchema) -> Result<SchemaDiff> {
        self.validate_references(models, database)?;

        let mut changes = Vec::new();

        let created: BTreeSet<&str> = models
            .iter()
            .map(|m| m.table_name.as_str())
            .filter(|name| !database.contains(name))
            .collect();
        for model in models.iter() {
            if created.contains(model.table_name.as_str()) {
                debug!(table = %model.table_name, "table missing from database");
                changes.push(SchemaChange::create_table(&model.table_name));
            }
        }

        for name in database.tables.keys() {
            if !models.contains(name) && !self.is_ignored(name) {
                debug!(table = %name, "table no longer declared");
                changes.push(SchemaChange::drop_table(name));
            }
        }

        for model in models.iter() {
            if let Some(table) = database.get_table(&model.table_name) {
                self.compare_table(model, table, &created, &mut changes);
            }
        }

        debug!(changes = changes.len(), "schema comparison finished");
        Ok(SchemaDiff::new(changes))
    }

    fn compare_table(
        &self,
        model: &ModelSchema,
        table: &DatabaseTable,
        created: &BTreeSet<&str>,
        changes: &mut Vec<SchemaChange>,
    ) {
        let rules = self.dialect.rules();
        let name = model.table_name.as_str();

        for column in &model.columns {
            if !table.has_column(&column.name) {
                let type_name = rules.type_name(column.sql_type);
                let mut change =
                    SchemaChange::add_column(name, &column.name, &type_name, column.nullable);
                if let Some(default) = &column.default {
                    change = change.with_detail(detail::DEFAULT, default.to_sql(rules));
                }
                changes.push(change);
            }
        }

        for column in &table.columns {
            if model.get_column(&column.name).is_none() {
                changes.push(SchemaChange::remove_column(name, &column.name));
            }
        }

        // Tables created in this run get their foreign keys inline.
        if created.contains(name) {
            return;
        }
        for fk in &model.foreign_keys {
            if !table.foreign_keys.iter().any(|existing| existing.matches(fk)) {
                changes.push(SchemaChange::add_foreign_key(
                    name,
                    &fk.column,
                    &fk.to_table,
                    &fk.to_column,
                ));
            }
        }
    }

    fn validate_references(&self, models: &ModelRegistry, database: &DatabaseSchema) -> Result<()> {
        for model in models.iter() {
            for fk in &model.foreign_keys {
                let target = fk.to_table.as_str();
                let kept = models.contains(target)
                    || (database.contains(target) && self.is_ignored(target));
                if !kept {
                    return Err(MigrateError::UnknownReference {
                        table: model.table_name.clone(),
                        column: fk.column.clone(),
                        to_table: fk.to_table.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeType;
    use crate::schema::{DatabaseColumn, DefaultValue, ModelColumn};
    use strata_sql::SqlType;

    fn comparator() -> SchemaComparator {
        SchemaComparator::new(Dialect::Postgres)
    }

    fn users_model() -> ModelSchema {
        ModelSchema::new("users")
            .column(ModelColumn::new("id", SqlType::BigInt).primary_key())
            .column(ModelColumn::new("name", SqlType::Text))
    }

    fn users_table() -> DatabaseTable {
        DatabaseTable::new("users")
            .column(DatabaseColumn::new("id", "BIGINT"))
            .column(DatabaseColumn::new("name", "TEXT"))
    }

    #[test]
    fn test_detect_new_table() {
        let models = ModelRegistry::new().with(users_model());
        let diff = comparator().compare(&models, &DatabaseSchema::new()).unwrap();

        assert_eq!(diff.changes, vec![SchemaChange::create_table("users")]);
    }

    #[test]
    fn test_no_changes() {
        let models = ModelRegistry::new().with(users_model());
        let db = DatabaseSchema::new().table(users_table());
        assert!(comparator().compare(&models, &db).unwrap().is_empty());
    }

    #[test]
    fn test_detect_dropped_table_skips_bookkeeping_and_ignored() {
        let models = ModelRegistry::new().with(users_model());
        let db = DatabaseSchema::new()
            .table(users_table())
            .table(DatabaseTable::new("legacy"))
            .table(DatabaseTable::new("strata_migrations"))
            .table(DatabaseTable::new("schema_migrations"))
            .table(DatabaseTable::new("sessions"));

        let diff = comparator()
            .ignore_tables(["sessions"])
            .compare(&models, &db)
            .unwrap();

        assert_eq!(diff.changes, vec![SchemaChange::drop_table("legacy")]);
    }

    #[test]
    fn test_detect_added_and_removed_columns() {
        let models = ModelRegistry::new().with(
            users_model()
                .column(ModelColumn::new("email", SqlType::Varchar(255)).nullable())
                .column(
                    ModelColumn::new("active", SqlType::Boolean)
                        .default(DefaultValue::Bool(true)),
                ),
        );
        let db = DatabaseSchema::new().table(
            users_table()
                .column(DatabaseColumn::new("age", "INTEGER"))
                .column(DatabaseColumn::new("nickname", "TEXT")),
        );

        let diff = comparator().compare(&models, &db).unwrap();

        assert_eq!(
            diff.changes,
            vec![
                SchemaChange::add_column("users", "email", "VARCHAR(255)", true),
                SchemaChange::add_column("users", "active", "BOOLEAN", false)
                    .with_detail(detail::DEFAULT, "TRUE"),
                SchemaChange::remove_column("users", "age"),
                SchemaChange::remove_column("users", "nickname"),
            ]
        );
    }

    #[test]
    fn test_column_types_follow_dialect() {
        let models = ModelRegistry::new()
            .with(users_model().column(ModelColumn::new("meta", SqlType::Json)));
        let db = DatabaseSchema::new().table(users_table());

        let diff = SchemaComparator::new(Dialect::Sqlite)
            .compare(&models, &db)
            .unwrap();
        assert_eq!(diff.changes[0].detail(detail::TYPE), Some("TEXT"));
    }

    #[test]
    fn test_missing_foreign_key_on_existing_table() {
        let models = ModelRegistry::new().with(users_model()).with(
            ModelSchema::new("posts")
                .column(ModelColumn::new("id", SqlType::BigInt).primary_key())
                .column(ModelColumn::new("user_id", SqlType::BigInt))
                .references("user_id", "users", "id"),
        );
        let db = DatabaseSchema::new().table(users_table()).table(
            DatabaseTable::new("posts")
                .column(DatabaseColumn::new("id", "BIGINT"))
                .column(DatabaseColumn::new("user_id", "BIGINT")),
        );

        let diff = comparator().compare(&models, &db).unwrap();
        assert_eq!(
            diff.changes,
            vec![SchemaChange::add_foreign_key("posts", "user_id", "users", "id")]
        );

        let db_with_fk = db.clone().table(
            db.get_table("posts")
                .unwrap()
                .clone()
                .references("user_id", "users", "id"),
        );
        assert!(comparator().compare(&models, &db_with_fk).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_keys_of_created_tables_are_not_emitted() {
        let models = ModelRegistry::new().with(users_model()).with(
            ModelSchema::new("posts")
                .column(ModelColumn::new("user_id", SqlType::BigInt))
                .references("user_id", "users", "id"),
        );
        let db = DatabaseSchema::new().table(users_table());

        let diff = comparator().compare(&models, &db).unwrap();
        assert_eq!(diff.changes, vec![SchemaChange::create_table("posts")]);
        assert_eq!(diff.of_type(ChangeType::AddForeignKey).count(), 0);
    }

    #[test]
    fn test_fixed_change_order() {
        let models = ModelRegistry::new()
            .with(users_model().column(ModelColumn::new("email", SqlType::Text)))
            .with(ModelSchema::new("accounts").column(ModelColumn::new("id", SqlType::BigInt)));
        let db = DatabaseSchema::new()
            .table(users_table())
            .table(DatabaseTable::new("zombies"));

        let kinds: Vec<ChangeType> = comparator()
            .compare(&models, &db)
            .unwrap()
            .iter()
            .map(|c| c.change_type)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeType::CreateTable, ChangeType::DropTable, ChangeType::AddColumn]
        );
    }

    #[test]
    fn test_unknown_reference_is_error() {
        let models = ModelRegistry::new().with(
            ModelSchema::new("posts")
                .column(ModelColumn::new("author_id", SqlType::BigInt))
                .references("author_id", "authors", "id"),
        );

        let err = comparator()
            .compare(&models, &DatabaseSchema::new())
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::UnknownReference { ref table, ref to_table, .. }
                if table == "posts" && to_table == "authors"
        ));
    }

    #[test]
    fn test_reference_to_dropped_table_is_error() {
        let models = ModelRegistry::new().with(
            ModelSchema::new("posts")
                .column(ModelColumn::new("author_id", SqlType::BigInt))
                .references("author_id", "authors", "id"),
        );
        let db = DatabaseSchema::new().table(DatabaseTable::new("authors"));

        let err = comparator().compare(&models, &db).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::UnknownReference { ref table, ref column, ref to_table }
                if table == "posts" && column == "author_id" && to_table == "authors"
        ));
    }

    #[test]
    fn test_reference_to_ignored_database_table_is_valid() {
        let models = ModelRegistry::new().with(
            ModelSchema::new("posts")
                .column(ModelColumn::new("author_id", SqlType::BigInt))
                .references("author_id", "authors", "id"),
        );
        let db = DatabaseSchema::new().table(DatabaseTable::new("authors"));

        let diff = comparator()
            .ignore_tables(["authors"])
            .compare(&models, &db)
            .unwrap();
        assert_eq!(diff.changes, vec![SchemaChange::create_table("posts")]);
    }
}
