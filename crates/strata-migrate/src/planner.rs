//! Table creation ordering.
//!
//! Tables to create form a graph with an edge `A -> B` when `A` has a foreign
//! key to `B` and `B` is also being created. A depth-first walk emits tables
//! in post-order so every referenced table comes first. An edge reaching a
//! table still on the walk stack closes a cycle; its foreign key is deferred
//! and added after all tables exist.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::schema::{constraint_name, ModelForeignKey, ModelSchema};

/// What to do when foreign keys between new tables form a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Defer the foreign key that closes the cycle.
    #[default]
    Defer,
    /// Fail with [`MigrateError::DependencyCycle`].
    Reject,
}

/// A foreign key left out of its `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeferredForeignKey {
    /// Table declaring the foreign key.
    pub table: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub to_table: String,
    /// Referenced column.
    pub to_column: String,
}

impl DeferredForeignKey {
    fn new(table: &str, fk: &ModelForeignKey) -> Self {
        Self {
            table: table.to_string(),
            column: fk.column.clone(),
            to_table: fk.to_table.clone(),
            to_column: fk.to_column.clone(),
        }
    }

    /// Constraint name used in DDL.
    #[must_use]
    pub fn constraint_name(&self) -> String {
        constraint_name(&self.table, &self.column)
    }

    /// The foreign key in model form.
    #[must_use]
    pub fn foreign_key(&self) -> ModelForeignKey {
        ModelForeignKey::new(&self.column, &self.to_table, &self.to_column)
    }
}

/// The resolved creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationPlan {
    /// Tables in creation order.
    pub order: Vec<String>,
    /// Foreign keys that close a cycle, in discovery order.
    pub deferred: Vec<DeferredForeignKey>,
}

impl CreationPlan {
    /// Returns `true` if `table.column`'s foreign key was deferred.
    #[must_use]
    pub fn is_deferred(&self, table: &str, column: &str) -> bool {
        self.deferred
            .iter()
            .any(|d| d.table == table && d.column == column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Walk<'a> {
    schemas: HashMap<&'a str, &'a ModelSchema>,
    policy: CyclePolicy,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    plan: CreationPlan,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, table: &'a str) -> Result<()> {
        self.marks.insert(table, Mark::Visiting);
        self.stack.push(table);

        let schema = self.schemas[table];
        for fk in &schema.foreign_keys {
            let target = fk.to_table.as_str();
            // Self references are always inlined.
            if target == table {
                continue;
            }
            let Some((&target, _)) = self.schemas.get_key_value(target) else {
                continue;
            };
            match self.marks.get(target).copied() {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => self.back_edge(table, target, fk)?,
                None => self.visit(target)?,
            }
        }

        self.stack.pop();
        self.marks.insert(table, Mark::Done);
        self.plan.order.push(table.to_string());
        Ok(())
    }

    fn back_edge(&mut self, table: &str, target: &str, fk: &ModelForeignKey) -> Result<()> {
        match self.policy {
            CyclePolicy::Defer => {
                debug!(table, column = %fk.column, to_table = target, "deferring foreign key");
                self.plan.deferred.push(DeferredForeignKey::new(table, fk));
                Ok(())
            }
            CyclePolicy::Reject => {
                let start = self
                    .stack
                    .iter()
                    .position(|t| *t == target)
                    .unwrap_or_default();
                let mut path: Vec<String> =
                    self.stack[start..].iter().map(ToString::to_string).collect();
                path.push(target.to_string());
                Err(MigrateError::DependencyCycle { path })
            }
        }
    }
}

/// Orders `schemas` (in diff order) so referenced tables are created first.
///
/// # Errors
///
/// Returns [`MigrateError::DependencyCycle`] for any cycle under
/// [`CyclePolicy::Reject`], and [`MigrateError::UnresolvableCycle`] if the
/// resulting order still violates a non-deferred foreign key.
pub fn plan_creation(schemas: &[&ModelSchema], policy: CyclePolicy) -> Result<CreationPlan> {
    let mut walk = Walk {
        schemas: schemas
            .iter()
            .map(|s| (s.table_name.as_str(), *s))
            .collect(),
        policy,
        marks: HashMap::new(),
        stack: Vec::new(),
        plan: CreationPlan::default(),
    };

    for schema in schemas {
        let table = schema.table_name.as_str();
        if !walk.marks.contains_key(table) {
            walk.visit(table)?;
        }
    }

    let plan = walk.plan;
    verify(&plan, schemas)?;
    debug!(order = ?plan.order, deferred = plan.deferred.len(), "creation order resolved");
    Ok(plan)
}

/// Checks that every non-deferred edge points to an earlier table.
fn verify(plan: &CreationPlan, schemas: &[&ModelSchema]) -> Result<()> {
    let position: HashMap<&str, usize> = plan
        .order
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut offending = BTreeSet::new();
    for schema in schemas {
        let table = schema.table_name.as_str();
        for fk in &schema.foreign_keys {
            if fk.to_table == table || plan.is_deferred(table, &fk.column) {
                continue;
            }
            if let (Some(&from), Some(&to)) =
                (position.get(table), position.get(fk.to_table.as_str()))
            {
                if to > from {
                    offending.insert(table.to_string());
                    offending.insert(fk.to_table.clone());
                }
            }
        }
    }

    if offending.is_empty() {
        Ok(())
    } else {
        Err(MigrateError::UnresolvableCycle {
            tables: offending.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelColumn;
    use strata_sql::SqlType;

    fn table(name: &str, refs: &[&str]) -> ModelSchema {
        let mut schema =
            ModelSchema::new(name).column(ModelColumn::new("id", SqlType::BigInt).primary_key());
        for target in refs {
            let column = format!("{target}_id");
            schema = schema
                .column(ModelColumn::new(column.clone(), SqlType::BigInt))
                .references(column, *target, "id");
        }
        schema
    }

    fn plan(schemas: &[ModelSchema], policy: CyclePolicy) -> Result<CreationPlan> {
        let refs: Vec<&ModelSchema> = schemas.iter().collect();
        plan_creation(&refs, policy)
    }

    #[test]
    fn test_dependencies_come_first() {
        let schemas = [
            table("comments", &["posts", "users"]),
            table("posts", &["users"]),
            table("users", &[]),
        ];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();
        assert_eq!(plan.order, vec!["users", "posts", "comments"]);
        assert!(plan.deferred.is_empty());
    }

    #[test]
    fn test_independent_tables_keep_diff_order() {
        let schemas = [table("b", &[]), table("a", &[]), table("c", &[])];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();
        assert_eq!(plan.order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_references_outside_the_set_are_ignored() {
        let schemas = [table("posts", &["users"])];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();
        assert_eq!(plan.order, vec!["posts"]);
    }

    #[test]
    fn test_self_reference_is_not_an_edge() {
        let schemas = [table("nodes", &["nodes"])];
        let plan = plan(&schemas, CyclePolicy::Reject).unwrap();
        assert_eq!(plan.order, vec!["nodes"]);
        assert!(plan.deferred.is_empty());
    }

    #[test]
    fn test_two_table_cycle_defers_back_edge() {
        let schemas = [table("a", &["b"]), table("b", &["a"])];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();

        assert_eq!(plan.order, vec!["b", "a"]);
        assert_eq!(
            plan.deferred,
            vec![DeferredForeignKey {
                table: "b".into(),
                column: "a_id".into(),
                to_table: "a".into(),
                to_column: "id".into(),
            }]
        );
        assert!(plan.is_deferred("b", "a_id"));
        assert!(!plan.is_deferred("a", "b_id"));
    }

    #[test]
    fn test_three_table_cycle_defers_one_edge() {
        let schemas = [table("a", &["b"]), table("b", &["c"]), table("c", &["a"])];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();

        assert_eq!(plan.order, vec!["c", "b", "a"]);
        assert_eq!(plan.deferred.len(), 1);
        assert_eq!(plan.deferred[0].constraint_name(), "fk_c_a_id");
    }

    #[test]
    fn test_overlapping_cycles_defer_every_back_edge() {
        // a -> b -> a and a -> c -> a
        let schemas = [
            table("a", &["b", "c"]),
            table("b", &["a"]),
            table("c", &["a"]),
        ];
        let plan = plan(&schemas, CyclePolicy::Defer).unwrap();

        assert_eq!(plan.order, vec!["b", "c", "a"]);
        let deferred: Vec<&str> = plan.deferred.iter().map(|d| d.table.as_str()).collect();
        assert_eq!(deferred, vec!["b", "c"]);
    }

    #[test]
    fn test_reject_policy_reports_cycle_path() {
        let schemas = [table("a", &["b"]), table("b", &["c"]), table("c", &["a"])];
        let err = plan(&schemas, CyclePolicy::Reject).unwrap_err();
        match err {
            MigrateError::DependencyCycle { path } => {
                assert_eq!(path, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_flags_out_of_order_edges() {
        let schemas = [table("a", &["b"]), table("b", &[])];
        let refs: Vec<&ModelSchema> = schemas.iter().collect();
        let bad = CreationPlan {
            order: vec!["a".into(), "b".into()],
            deferred: Vec::new(),
        };
        let err = verify(&bad, &refs).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::UnresolvableCycle { ref tables } if tables == &["a", "b"]
        ));
    }
}
