//! Schema representation types.
//!
//! Two views of the same database: the declared [`ModelRegistry`] (what the
//! code expects) and the introspected [`DatabaseSchema`] (what the database
//! has). Both are plain data and load from JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_sql::{DialectRules, SqlType};

/// Tables that record applied migrations. Never dropped by the comparator.
pub const BOOKKEEPING_TABLES: &[&str] = &["strata_migrations", "schema_migrations"];

/// Returns `true` if `name` is a migration bookkeeping table.
#[must_use]
pub fn is_bookkeeping_table(name: &str) -> bool {
    BOOKKEEPING_TABLES.contains(&name)
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL literal for this default in the given dialect.
    #[must_use]
    pub fn to_sql(&self, rules: &DialectRules) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => rules.bool_literal(*b).to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => rules.float_literal(*f),
            Self::Text(s) => rules.quote_literal(s),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// A declared model column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelColumn {
    /// Column name.
    pub name: String,
    /// Rust type the column was declared with, if known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_type_name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Whether this column is the primary key.
    #[serde(default)]
    pub is_primary: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl ModelColumn {
    /// Creates a NOT NULL column.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            source_type_name: String::new(),
            sql_type,
            nullable: false,
            is_primary: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Creates a column from a Rust type name; `Option<T>` is nullable.
    ///
    /// Returns `None` when the type has no SQL mapping.
    #[must_use]
    pub fn from_rust(name: impl Into<String>, source_type_name: &str) -> Option<Self> {
        let (sql_type, nullable) = SqlType::from_rust_type(source_type_name)?;
        Some(Self {
            source_type_name: source_type_name.trim().to_string(),
            nullable,
            ..Self::new(name, sql_type)
        })
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.is_primary = true;
        self.nullable = false;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// A declared foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelForeignKey {
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub to_table: String,
    /// Referenced column.
    pub to_column: String,
}

impl ModelForeignKey {
    /// Creates a foreign key.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }

    /// Constraint name used in DDL: `fk_<table>_<column>`.
    #[must_use]
    pub fn constraint_name(&self, table: &str) -> String {
        constraint_name(table, &self.column)
    }
}

/// Foreign key constraint name for `table.column`.
#[must_use]
pub fn constraint_name(table: &str, column: &str) -> String {
    format!("fk_{table}_{column}")
}

/// The declared schema of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Table name.
    pub table_name: String,
    /// Columns in declaration order.
    pub columns: Vec<ModelColumn>,
    /// Foreign keys in declaration order.
    #[serde(default)]
    pub foreign_keys: Vec<ModelForeignKey>,
}

impl ModelSchema {
    /// Creates an empty model schema.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ModelColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a foreign key `column -> to_table(to_column)`.
    #[must_use]
    pub fn references(
        mut self,
        column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys
            .push(ModelForeignKey::new(column, to_table, to_column));
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ModelColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Declared models, keyed and ordered by table name.
///
/// Populated by explicit registration at startup. Serialized as a list of
/// [`ModelSchema`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ModelSchema>", into = "Vec<ModelSchema>")]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelSchema>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model, returning the one it replaced.
    pub fn register(&mut self, schema: ModelSchema) -> Option<ModelSchema> {
        self.models.insert(schema.table_name.clone(), schema)
    }

    /// Registers a model (builder form).
    #[must_use]
    pub fn with(mut self, schema: ModelSchema) -> Self {
        self.register(schema);
        self
    }

    /// Gets a model by table name.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&ModelSchema> {
        self.models.get(table)
    }

    /// Returns `true` if `table` is declared.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.models.contains_key(table)
    }

    /// Models in table-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.values()
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl From<Vec<ModelSchema>> for ModelRegistry {
    fn from(models: Vec<ModelSchema>) -> Self {
        models.into_iter().collect()
    }
}

impl From<ModelRegistry> for Vec<ModelSchema> {
    fn from(registry: ModelRegistry) -> Self {
        registry.models.into_values().collect()
    }
}

impl FromIterator<ModelSchema> for ModelRegistry {
    fn from_iter<I: IntoIterator<Item = ModelSchema>>(iter: I) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}

/// An introspected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseColumn {
    /// Column name.
    pub name: String,
    /// Type as reported by the database.
    #[serde(default)]
    pub sql_type_text: String,
    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Default expression as reported by the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether this column is the primary key.
    #[serde(default)]
    pub is_primary: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
}

impl DatabaseColumn {
    /// Creates a NOT NULL column with the given type text.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type_text: sql_type_text.into(),
            nullable: false,
            default: None,
            is_primary: false,
            auto_increment: false,
        }
    }
}

/// An introspected foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseForeignKey {
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub to_table: String,
    /// Referenced column.
    pub to_column: String,
}

impl DatabaseForeignKey {
    /// Returns `true` if this is the same reference as `fk`.
    #[must_use]
    pub fn matches(&self, fk: &ModelForeignKey) -> bool {
        self.column == fk.column && self.to_table == fk.to_table && self.to_column == fk.to_column
    }
}

/// An introspected table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTable {
    /// Table name.
    pub name: String,
    /// Columns in database order.
    #[serde(default)]
    pub columns: Vec<DatabaseColumn>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<DatabaseForeignKey>,
}

impl DatabaseTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: DatabaseColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn references(
        mut self,
        column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(DatabaseForeignKey {
            column: column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        });
        self
    }

    /// Returns `true` if a column named `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// The introspected database, keyed and ordered by table name.
///
/// Serialized as a list of [`DatabaseTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DatabaseTable>", into = "Vec<DatabaseTable>")]
pub struct DatabaseSchema {
    /// All tables in the database.
    pub tables: BTreeMap<String, DatabaseTable>,
}

impl DatabaseSchema {
    /// Creates an empty database schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the schema.
    #[must_use]
    pub fn table(mut self, table: DatabaseTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&DatabaseTable> {
        self.tables.get(name)
    }

    /// Returns `true` if `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

impl From<Vec<DatabaseTable>> for DatabaseSchema {
    fn from(tables: Vec<DatabaseTable>) -> Self {
        tables.into_iter().fold(Self::new(), Self::table)
    }
}

impl From<DatabaseSchema> for Vec<DatabaseTable> {
    fn from(schema: DatabaseSchema) -> Self {
        schema.tables.into_values().collect()
    }
}
