//! End-to-end comparator + generator scenarios.

use std::collections::HashMap;

use strata_migrate::prelude::*;

fn id() -> ModelColumn {
    ModelColumn::new("id", SqlType::BigInt).primary_key()
}

fn fk_table(name: &str, target: &str) -> ModelSchema {
    let column = format!("{target}_id");
    ModelSchema::new(name)
        .column(id())
        .column(ModelColumn::new(column.clone(), SqlType::BigInt).nullable())
        .references(column, target, "id")
}

fn generate(dialect: Dialect, models: &ModelRegistry, database: &DatabaseSchema) -> MigrationScript {
    let diff = SchemaComparator::new(dialect)
        .compare(models, database)
        .expect("compare");
    MigrationGenerator::new(dialect)
        .generate(&diff, models, "scenario")
        .expect("generate")
}

#[test]
fn test_round_trip_single_table() {
    let models = ModelRegistry::new().with(
        ModelSchema::new("users")
            .column(id())
            .column(ModelColumn::from_rust("name", "String").expect("known type")),
    );

    let diff = SchemaComparator::new(Dialect::Postgres)
        .compare(&models, &DatabaseSchema::new())
        .unwrap();
    assert_eq!(diff.changes, vec![SchemaChange::create_table("users")]);

    let script = MigrationGenerator::new(Dialect::Postgres)
        .generate(&diff, &models, "init")
        .unwrap();
    assert!(script.up.contains(r#"CREATE TABLE "users""#));
    assert!(script.up.contains(r#""id" BIGINT PRIMARY KEY NOT NULL"#));
    assert!(script.up.contains(r#""name" TEXT NOT NULL"#));
    assert!(script.down.contains(r#"DROP TABLE IF EXISTS "users""#));
}

#[test]
fn test_two_table_cycle_postgres() {
    let models = ModelRegistry::new()
        .with(fk_table("a", "b"))
        .with(fk_table("b", "a"));

    let script = generate(Dialect::Postgres, &models, &DatabaseSchema::new());

    assert!(script.up.contains(r#"CREATE TABLE "a""#));
    assert!(script.up.contains(r#"CREATE TABLE "b""#));
    assert_eq!(script.up.matches("ADD CONSTRAINT").count(), 1);
    assert_eq!(script.deferred.len(), 1);

    let alter_at = script.up.find("ALTER TABLE").unwrap();
    let last_create = script.up.rfind("CREATE TABLE").unwrap();
    assert!(alter_at > last_create);
}

#[test]
fn test_three_table_cycle_postgres() {
    let models = ModelRegistry::new()
        .with(fk_table("a", "b"))
        .with(fk_table("b", "c"))
        .with(fk_table("c", "a"));

    let script = generate(Dialect::Postgres, &models, &DatabaseSchema::new());

    assert_eq!(script.creation_order.len(), 3);
    assert_eq!(script.deferred.len(), 1);
    assert_eq!(script.up.matches("CREATE TABLE").count(), 3);
    assert_eq!(script.up.matches("ADD CONSTRAINT").count(), 1);
    assert_eq!(script.down.matches("DROP CONSTRAINT").count(), 1);
}

#[test]
fn test_creation_order_is_topological() {
    let models = ModelRegistry::new()
        .with(fk_table("comments", "posts"))
        .with(fk_table("posts", "users"))
        .with(ModelSchema::new("tags").column(id()))
        .with(fk_table("users", "teams"))
        .with(ModelSchema::new("teams").column(id()));

    let script = generate(Dialect::Postgres, &models, &DatabaseSchema::new());
    assert!(script.deferred.is_empty());

    let position: HashMap<&str, usize> = script
        .creation_order
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    for model in models.iter() {
        for fk in &model.foreign_keys {
            assert!(
                position[fk.to_table.as_str()] < position[model.table_name.as_str()],
                "{} must be created before {}",
                fk.to_table,
                model.table_name
            );
        }
    }
}

#[test]
fn test_reject_policy_names_cycle() {
    let models = ModelRegistry::new()
        .with(fk_table("a", "b"))
        .with(fk_table("b", "a"));
    let diff = SchemaComparator::new(Dialect::Postgres)
        .compare(&models, &DatabaseSchema::new())
        .unwrap();

    let err = MigrationGenerator::new(Dialect::Postgres)
        .cycle_policy(CyclePolicy::Reject)
        .generate(&diff, &models, "cycle")
        .unwrap_err();

    assert_eq!(err.to_string(), "Foreign key cycle between tables: a -> b -> a");
}

#[test]
fn test_diff_without_model_is_rejected() {
    let diff = SchemaDiff::new(vec![SchemaChange::create_table("ghosts")]);
    let err = MigrationGenerator::new(Dialect::Sqlite)
        .generate(&diff, &ModelRegistry::new(), "x")
        .unwrap_err();
    assert_eq!(err.to_string(), "No model registered for table 'ghosts'");
}

#[test]
fn test_new_table_referencing_existing_table() {
    let models = ModelRegistry::new()
        .with(ModelSchema::new("users").column(id()))
        .with(fk_table("posts", "users"));
    let database = DatabaseSchema::new().table(
        DatabaseTable::new("users").column(DatabaseColumn::new("id", "BIGINT")),
    );

    let script = generate(Dialect::Postgres, &models, &database);

    assert_eq!(script.creation_order, vec!["posts"]);
    assert!(script.up.contains(
        r#"CONSTRAINT "fk_posts_users_id" FOREIGN KEY ("users_id") REFERENCES "users" ("id")"#
    ));
    assert!(!script.up.contains("ALTER TABLE"));
}

#[test]
fn test_sqlite_types_and_literals() {
    let models = ModelRegistry::new().with(
        ModelSchema::new("events")
            .column(id().auto_increment())
            .column(ModelColumn::new("payload", SqlType::Json))
            .column(ModelColumn::new("ref", SqlType::Uuid))
            .column(ModelColumn::new("score", SqlType::Double).nullable())
            .column(
                ModelColumn::new("archived", SqlType::Boolean).default(DefaultValue::Bool(true)),
            ),
    );

    let sqlite = generate(Dialect::Sqlite, &models, &DatabaseSchema::new()).up;
    assert!(sqlite.contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"#));
    assert!(sqlite.contains(r#""payload" TEXT NOT NULL"#));
    assert!(sqlite.contains(r#""ref" TEXT NOT NULL"#));
    assert!(sqlite.contains(r#""score" REAL"#));
    assert!(sqlite.contains(r#""archived" INTEGER NOT NULL DEFAULT 1"#));

    let postgres = generate(Dialect::Postgres, &models, &DatabaseSchema::new()).up;
    assert!(postgres.contains(r#""id" BIGSERIAL PRIMARY KEY NOT NULL"#));
    assert!(postgres.contains(r#""payload" JSONB NOT NULL"#));
    assert!(postgres.contains(r#""ref" UUID NOT NULL"#));
    assert!(postgres.contains(r#""score" DOUBLE PRECISION"#));
    assert!(postgres.contains(r#""archived" BOOLEAN NOT NULL DEFAULT TRUE"#));
}

#[test]
fn test_up_to_date_schema_generates_headers_only() {
    let models = ModelRegistry::new().with(ModelSchema::new("users").column(id()));
    let database = DatabaseSchema::new().table(
        DatabaseTable::new("users").column(DatabaseColumn::new("id", "BIGINT")),
    );

    let script = generate(Dialect::Postgres, &models, &database);
    assert_eq!(script.up, "-- Migration: scenario (up)\n-- Dialect: postgres\n");
    assert_eq!(script.down, "-- Migration: scenario (down)\n-- Dialect: postgres\n");
}

#[test]
fn test_schemas_load_from_json() {
    let models: ModelRegistry = serde_json::from_str(
        r#"[
            {
                "table_name": "users",
                "columns": [{"name": "id", "sql_type": "big_int", "is_primary": true}]
            },
            {
                "table_name": "posts",
                "columns": [
                    {"name": "id", "sql_type": "big_int", "is_primary": true},
                    {"name": "user_id", "sql_type": "big_int"}
                ],
                "foreign_keys": [
                    {"column": "user_id", "to_table": "users", "to_column": "id"}
                ]
            }
        ]"#,
    )
    .unwrap();
    let database: DatabaseSchema = serde_json::from_str(
        r#"[{"name": "users", "columns": [{"name": "id", "sql_type_text": "BIGINT"}]}]"#,
    )
    .unwrap();

    let diff = SchemaComparator::new(Dialect::Postgres)
        .compare(&models, &database)
        .unwrap();
    assert_eq!(diff.summary(), "+ create table posts");
}
