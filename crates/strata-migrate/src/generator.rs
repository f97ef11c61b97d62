//! Migration script generation.
//!
//! Turns a [`SchemaDiff`] into up and down DDL for one dialect. Table
//! creation follows the foreign key order computed by
//! [`plan_creation`](crate::planner::plan_creation); everything else keeps
//! diff order.

use serde::Serialize;
use strata_sql::Dialect;
use tracing::debug;

use crate::ddl::{Ddl, DdlRenderer, Script};
use crate::diff::{detail, ChangeType, SchemaChange, SchemaDiff};
use crate::error::{MigrateError, Result};
use crate::planner::{plan_creation, CreationPlan, CyclePolicy, DeferredForeignKey};
use crate::schema::{ModelForeignKey, ModelRegistry, ModelSchema};

/// A generated migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationScript {
    /// Migration name.
    pub name: String,
    /// Dialect the SQL targets.
    pub dialect: Dialect,
    /// Forward script.
    pub up: String,
    /// Best-effort reverse script.
    pub down: String,
    /// Tables created, in creation order.
    pub creation_order: Vec<String>,
    /// Foreign keys split from their `CREATE TABLE`.
    pub deferred: Vec<DeferredForeignKey>,
}

/// Generates migration scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationGenerator {
    dialect: Dialect,
    cycle_policy: CyclePolicy,
}

impl MigrationGenerator {
    /// Creates a generator for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Sets how foreign key cycles between new tables are handled.
    #[must_use]
    pub const fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Generates the up and down scripts for `diff`.
    ///
    /// Either both scripts are produced in full or an error is returned
    /// before any SQL is rendered.
    ///
    /// # Errors
    ///
    /// - [`MigrateError::MalformedChange`] if a change lacks the column or
    ///   a detail its statement needs.
    /// - [`MigrateError::MissingModel`] if a created table has no model.
    /// - [`MigrateError::DependencyCycle`] for cycles under
    ///   [`CyclePolicy::Reject`].
    /// - [`MigrateError::UnresolvableCycle`] if no valid creation order
    ///   exists for this dialect.
    pub fn generate(
        &self,
        diff: &SchemaDiff,
        models: &ModelRegistry,
        name: &str,
    ) -> Result<MigrationScript> {
        let (to_create, rest): (Vec<&SchemaChange>, Vec<&SchemaChange>) = diff
            .iter()
            .partition(|c| c.change_type == ChangeType::CreateTable);
        for change in &rest {
            check_change(change)?;
        }

        let schemas = to_create
            .iter()
            .map(|c| {
                models
                    .get(&c.table)
                    .ok_or_else(|| MigrateError::MissingModel(c.table.clone()))
            })
            .collect::<Result<Vec<&ModelSchema>>>()?;

        let plan = plan_creation(&schemas, self.cycle_policy)?;
        let ddl = DdlRenderer::new(self.dialect);
        let rules = ddl.rules();

        if !plan.deferred.is_empty() && !rules.supports_add_constraint && !rules.lazy_foreign_keys {
            return Err(MigrateError::UnresolvableCycle {
                tables: plan.deferred.iter().map(|d| d.table.clone()).collect(),
            });
        }

        let writer = ScriptWriter {
            ddl,
            models,
            plan: &plan,
            rest: &rest,
        };
        let up = writer.up(name, self.dialect);
        let down = writer.down(name, self.dialect);

        debug!(
            migration = name,
            dialect = %self.dialect,
            created = plan.order.len(),
            deferred = plan.deferred.len(),
            changes = rest.len(),
            "generated migration"
        );

        Ok(MigrationScript {
            name: name.to_string(),
            dialect: self.dialect,
            up,
            down,
            creation_order: plan.order,
            deferred: plan.deferred,
        })
    }
}

/// Rejects changes that would render an empty identifier or type.
fn check_change(change: &SchemaChange) -> Result<()> {
    let required: &[&'static str] = match change.change_type {
        ChangeType::AddColumn => &[detail::TYPE],
        ChangeType::AddForeignKey => &[detail::TO_TABLE, detail::TO_COLUMN],
        ChangeType::RemoveColumn | ChangeType::DropTable | ChangeType::CreateTable => &[],
    };
    let needs_column = matches!(
        change.change_type,
        ChangeType::AddColumn | ChangeType::RemoveColumn | ChangeType::AddForeignKey
    );

    let missing = if change.table.is_empty() {
        Some("table")
    } else if needs_column && change.column_name().is_empty() {
        Some("column")
    } else {
        required
            .iter()
            .copied()
            .find(|key| change.detail(key).map_or(true, str::is_empty))
    };

    match missing {
        Some(missing) => Err(MigrateError::MalformedChange {
            table: change.table.clone(),
            change_type: change.change_type,
            missing,
        }),
        None => Ok(()),
    }
}

struct ScriptWriter<'a> {
    ddl: DdlRenderer,
    models: &'a ModelRegistry,
    plan: &'a CreationPlan,
    rest: &'a [&'a SchemaChange],
}

impl ScriptWriter<'_> {
    /// Deferred keys are added afterwards when the dialect can; otherwise
    /// they stay inline and rely on lazy reference resolution.
    fn deferred_inline(&self) -> bool {
        !self.ddl.rules().supports_add_constraint
    }

    fn header(script: &mut Script, name: &str, dialect: Dialect, direction: &str) {
        script.comment(&format!("Migration: {name} ({direction})"));
        script.comment(&format!("Dialect: {dialect}"));
    }

    fn up(&self, name: &str, dialect: Dialect) -> String {
        let mut script = Script::new();
        Self::header(&mut script, name, dialect, "up");

        if !self.plan.order.is_empty() {
            script.section("Create tables");
            for table in &self.plan.order {
                let Some(schema) = self.models.get(table) else {
                    continue;
                };
                let inline: Vec<&ModelForeignKey> = schema
                    .foreign_keys
                    .iter()
                    .filter(|fk| self.deferred_inline() || !self.plan.is_deferred(table, &fk.column))
                    .collect();
                debug!(table = %table, inline = inline.len(), "rendering CREATE TABLE");
                script.statement(&self.ddl.create_table(schema, &inline));
            }
        }

        if !self.plan.deferred.is_empty() {
            script.section("Deferred foreign keys");
            for deferred in &self.plan.deferred {
                if self.deferred_inline() {
                    script.comment(&format!(
                        "{} on \"{}\" is declared inline; {} resolves references lazily",
                        deferred.constraint_name(),
                        deferred.table,
                        self.ddl.rules().name,
                    ));
                } else {
                    script.push(self.ddl.add_foreign_key(&deferred.table, &deferred.foreign_key()));
                }
            }
        }

        if !self.rest.is_empty() {
            script.section("Schema changes");
            for change in self.rest {
                script.push(self.forward(change));
            }
        }

        script.finish()
    }

    fn forward(&self, change: &SchemaChange) -> Ddl {
        let table = change.table.as_str();
        let column = change.column_name();
        match change.change_type {
            ChangeType::AddColumn => self.ddl.add_column(
                table,
                column,
                change.detail(detail::TYPE).unwrap_or_default(),
                change.detail(detail::NULLABLE) != Some("false"),
                change.detail(detail::DEFAULT),
            ),
            ChangeType::RemoveColumn => self.ddl.drop_column(table, column),
            ChangeType::AddForeignKey => {
                let fk = ModelForeignKey::new(
                    column,
                    change.detail(detail::TO_TABLE).unwrap_or_default(),
                    change.detail(detail::TO_COLUMN).unwrap_or_default(),
                );
                self.ddl.add_foreign_key(table, &fk)
            }
            ChangeType::DropTable => self.ddl.drop_table(table),
            ChangeType::CreateTable => Ddl::Comment(format!("table \"{table}\" created above")),
        }
    }

    fn backward(&self, change: &SchemaChange) -> Ddl {
        let table = change.table.as_str();
        let column = change.column_name();
        match change.change_type {
            ChangeType::AddColumn => self.ddl.drop_column(table, column),
            ChangeType::AddForeignKey => self.ddl.drop_foreign_key(table, column),
            ChangeType::RemoveColumn => Ddl::Comment(format!(
                "cannot restore column \"{table}\".\"{column}\": its definition is not retained"
            )),
            ChangeType::DropTable => Ddl::Comment(format!(
                "cannot restore table \"{table}\": its definition is not retained"
            )),
            ChangeType::CreateTable => self.ddl.drop_table(table),
        }
    }

    fn down(&self, name: &str, dialect: Dialect) -> String {
        let mut script = Script::new();
        Self::header(&mut script, name, dialect, "down");

        if !self.rest.is_empty() {
            script.section("Revert schema changes");
            for change in self.rest.iter().rev() {
                script.push(self.backward(change));
            }
        }

        if !self.plan.deferred.is_empty() && !self.deferred_inline() {
            script.section("Drop deferred foreign keys");
            for deferred in self.plan.deferred.iter().rev() {
                script.push(self.ddl.drop_foreign_key(&deferred.table, &deferred.column));
            }
        }

        if !self.plan.order.is_empty() {
            script.section("Drop tables");
            for table in self.plan.order.iter().rev() {
                script.push(self.ddl.drop_table(table));
            }
        }

        script.finish()
    }
}
