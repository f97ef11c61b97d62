//! DDL rendering.
//!
//! [`DdlRenderer`] turns schema pieces into statements using the active
//! [`DialectRules`]. Operations the dialect cannot express come back as
//! [`Ddl::Comment`] so scripts stay runnable.

use strata_sql::{Dialect, DialectRules};

use crate::schema::{constraint_name, ModelColumn, ModelForeignKey, ModelSchema};

/// One rendered script entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    /// An executable statement, without the trailing `;`.
    Statement(String),
    /// A line of explanation emitted as `-- ...`.
    Comment(String),
}

/// Accumulates script text.
#[derive(Debug, Clone, Default)]
pub struct Script {
    text: String,
}

impl Script {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `-- text`.
    pub fn comment(&mut self, text: &str) {
        self.text.push_str("-- ");
        self.text.push_str(text);
        self.text.push('\n');
    }

    /// Starts a section, separated from earlier content by a blank line.
    pub fn section(&mut self, title: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.comment(title);
    }

    /// Appends a statement terminated by `;`.
    pub fn statement(&mut self, sql: &str) {
        self.text.push_str(sql);
        self.text.push_str(";\n");
    }

    /// Appends a rendered entry.
    pub fn push(&mut self, ddl: Ddl) {
        match ddl {
            Ddl::Statement(sql) => self.statement(&sql),
            Ddl::Comment(text) => self.comment(&text),
        }
    }

    /// Returns the script text.
    #[must_use]
    pub fn finish(self) -> String {
        self.text
    }
}

/// Renders DDL for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct DdlRenderer {
    rules: &'static DialectRules,
}

impl DdlRenderer {
    /// Creates a renderer for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            rules: dialect.rules(),
        }
    }

    /// The dialect rules in use.
    #[must_use]
    pub const fn rules(&self) -> &'static DialectRules {
        self.rules
    }

    fn quote(&self, name: &str) -> String {
        self.rules.quote_identifier(name)
    }

    /// Generates a column definition for CREATE TABLE.
    #[must_use]
    pub fn column_definition(&self, column: &ModelColumn) -> String {
        let serial = column.auto_increment && column.sql_type.is_integer();
        let type_name = if serial {
            self.rules.serial_type_name(column.sql_type)
        } else {
            self.rules.type_name(column.sql_type)
        };

        let mut sql = format!("{} {type_name}", self.quote(&column.name));
        if column.is_primary {
            sql.push_str(" PRIMARY KEY");
            if let Some(keyword) = self.rules.auto_increment_keyword().filter(|_| serial) {
                sql.push(' ');
                sql.push_str(keyword);
            }
        }
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql(self.rules));
        }
        sql
    }

    /// `CONSTRAINT "fk_t_c" FOREIGN KEY ("c") REFERENCES "to" ("to_col")`.
    #[must_use]
    pub fn foreign_key_constraint(&self, table: &str, fk: &ModelForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&fk.constraint_name(table)),
            self.quote(&fk.column),
            self.quote(&fk.to_table),
            self.quote(&fk.to_column),
        )
    }

    /// Generates CREATE TABLE with the given foreign keys inlined.
    #[must_use]
    pub fn create_table(&self, schema: &ModelSchema, inline: &[&ModelForeignKey]) -> String {
        let mut sql = String::from("CREATE TABLE ");
        sql.push_str(&self.quote(&schema.table_name));
        sql.push_str(" (\n");

        let mut lines: Vec<String> = schema
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c)))
            .collect();
        lines.extend(
            inline
                .iter()
                .map(|fk| format!("    {}", self.foreign_key_constraint(&schema.table_name, fk))),
        );
        sql.push_str(&lines.join(",\n"));

        sql.push_str("\n)");
        sql
    }

    /// DROP TABLE IF EXISTS.
    #[must_use]
    pub fn drop_table(&self, table: &str) -> Ddl {
        Ddl::Statement(format!("DROP TABLE IF EXISTS {}", self.quote(table)))
    }

    /// ALTER TABLE ADD COLUMN from a type name and optional default literal.
    #[must_use]
    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        type_name: &str,
        nullable: bool,
        default: Option<&str>,
    ) -> Ddl {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {type_name}",
            self.quote(table),
            self.quote(column)
        );
        if !nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        Ddl::Statement(sql)
    }

    /// ALTER TABLE DROP COLUMN.
    #[must_use]
    pub fn drop_column(&self, table: &str, column: &str) -> Ddl {
        Ddl::Statement(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(table),
            self.quote(column)
        ))
    }

    /// ALTER TABLE ADD CONSTRAINT, or a comment when unsupported.
    #[must_use]
    pub fn add_foreign_key(&self, table: &str, fk: &ModelForeignKey) -> Ddl {
        if self.rules.supports_add_constraint {
            Ddl::Statement(format!(
                "ALTER TABLE {} ADD {}",
                self.quote(table),
                self.foreign_key_constraint(table, fk)
            ))
        } else {
            Ddl::Comment(format!(
                "{} cannot add constraint {} to existing table {}; recreate the table to add it",
                self.rules.name,
                fk.constraint_name(table),
                self.quote(table),
            ))
        }
    }

    /// ALTER TABLE DROP CONSTRAINT, or a comment when unsupported.
    #[must_use]
    pub fn drop_foreign_key(&self, table: &str, column: &str) -> Ddl {
        let name = constraint_name(table, column);
        if self.rules.supports_drop_constraint {
            Ddl::Statement(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote(table),
                self.quote(&name)
            ))
        } else {
            Ddl::Comment(format!(
                "{} cannot drop constraint {name} from {}; recreate the table to remove it",
                self.rules.name,
                self.quote(table),
            ))
        }
    }
}
