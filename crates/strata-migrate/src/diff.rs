//! Schema diff types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Keys used in [`SchemaChange::details`].
pub mod detail {
    /// Dialect type name of an added column.
    pub const TYPE: &str = "type";
    /// `"true"` / `"false"` nullability of an added column.
    pub const NULLABLE: &str = "nullable";
    /// Rendered default literal of an added column.
    pub const DEFAULT: &str = "default";
    /// Referenced table of an added foreign key.
    pub const TO_TABLE: &str = "to_table";
    /// Referenced column of an added foreign key.
    pub const TO_COLUMN: &str = "to_column";
}

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// A declared table is missing from the database.
    CreateTable,
    /// A database table is no longer declared.
    DropTable,
    /// A declared column is missing from an existing table.
    AddColumn,
    /// A database column is no longer declared.
    RemoveColumn,
    /// A declared foreign key is missing from an existing table.
    AddForeignKey,
}

/// One structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    /// What kind of change this is.
    pub change_type: ChangeType,
    /// Affected table.
    pub table: String,
    /// Affected column, for column and foreign key changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Extra attributes, see [`detail`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl SchemaChange {
    fn new(change_type: ChangeType, table: &str, column: Option<&str>) -> Self {
        Self {
            change_type,
            table: table.to_string(),
            column: column.map(str::to_string),
            details: BTreeMap::new(),
        }
    }

    /// A `CreateTable` change.
    #[must_use]
    pub fn create_table(table: &str) -> Self {
        Self::new(ChangeType::CreateTable, table, None)
    }

    /// A `DropTable` change.
    #[must_use]
    pub fn drop_table(table: &str) -> Self {
        Self::new(ChangeType::DropTable, table, None)
    }

    /// An `AddColumn` change.
    #[must_use]
    pub fn add_column(table: &str, column: &str, type_name: &str, nullable: bool) -> Self {
        Self::new(ChangeType::AddColumn, table, Some(column))
            .with_detail(detail::TYPE, type_name)
            .with_detail(detail::NULLABLE, if nullable { "true" } else { "false" })
    }

    /// A `RemoveColumn` change.
    #[must_use]
    pub fn remove_column(table: &str, column: &str) -> Self {
        Self::new(ChangeType::RemoveColumn, table, Some(column))
    }

    /// An `AddForeignKey` change.
    #[must_use]
    pub fn add_foreign_key(table: &str, column: &str, to_table: &str, to_column: &str) -> Self {
        Self::new(ChangeType::AddForeignKey, table, Some(column))
            .with_detail(detail::TO_TABLE, to_table)
            .with_detail(detail::TO_COLUMN, to_column)
    }

    /// Sets a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Gets a detail entry.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    /// The column name, or an empty string for table-level changes.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column_name();
        match self.change_type {
            ChangeType::CreateTable => write!(f, "+ create table {}", self.table),
            ChangeType::DropTable => write!(f, "- drop table {}", self.table),
            ChangeType::AddColumn => {
                write!(f, "+ add column {}.{column}", self.table)?;
                if let Some(ty) = self.detail(detail::TYPE) {
                    write!(f, " {ty}")?;
                }
                if self.detail(detail::NULLABLE) == Some("false") {
                    write!(f, " NOT NULL")?;
                }
                Ok(())
            }
            ChangeType::RemoveColumn => write!(f, "- remove column {}.{column}", self.table),
            ChangeType::AddForeignKey => write!(
                f,
                "+ add foreign key {}.{column} -> {}.{}",
                self.table,
                self.detail(detail::TO_TABLE).unwrap_or("?"),
                self.detail(detail::TO_COLUMN).unwrap_or("?"),
            ),
        }
    }
}

/// An ordered list of structural changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Changes in emission order.
    pub changes: Vec<SchemaChange>,
}

impl SchemaDiff {
    /// Creates a diff from changes.
    #[must_use]
    pub fn new(changes: Vec<SchemaChange>) -> Self {
        Self { changes }
    }

    /// Returns `true` if there are no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over changes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SchemaChange> {
        self.changes.iter()
    }

    /// Iterates over changes of one type.
    pub fn of_type(&self, change_type: ChangeType) -> impl Iterator<Item = &SchemaChange> {
        self.changes
            .iter()
            .filter(move |c| c.change_type == change_type)
    }

    /// One human-readable line per change.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No changes detected.".to_string();
        }
        self.changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a SchemaDiff {
    type Item = &'a SchemaChange;
    type IntoIter = std::slice::Iter<'a, SchemaChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
