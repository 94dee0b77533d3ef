//! Splits a batch of schema operations into ordered steps.
//!
//! Operations are bucketed by [`Phase`] (input order is kept inside each
//! bucket). The two derived-table buckets are then ordered by dependency:
//! creations so that sources come first, removals so that dependents come
//! first. Concatenating the buckets gives the step order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{audit_annotations, AnnotationWarning};
use crate::config::{CyclePolicy, SplitOptions};
use crate::error::{MigrateError, Result};
use crate::graph::DependencyGraph;
use crate::operation::Operation;
use crate::phase::{classify, Phase};
use crate::sort::stable_topological_sort;
use crate::step::{assemble, StepMigration};

/// A table that could not be ordered because of a dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedDependency {
    /// Phase of the table's operation.
    pub phase: Phase,
    /// Table name.
    pub table: String,
    /// In-phase tables it waits on that were never placed either.
    pub waiting_on: Vec<String>,
}

/// The output of [`StepSplitter::split`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Steps in execution order.
    pub steps: Vec<StepMigration>,
    /// Annotation inconsistencies found by the audit.
    pub warnings: Vec<AnnotationWarning>,
    /// Tables placed by the cycle fallback.
    pub unresolved: Vec<UnresolvedDependency>,
}

impl SplitPlan {
    /// Returns the operations in step order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.steps.iter().map(|step| &step.operation)
    }

    /// Returns the steps of one phase.
    pub fn steps_in(&self, phase: Phase) -> impl Iterator<Item = &StepMigration> {
        self.steps.iter().filter(move |step| step.phase == phase)
    }
}

/// Orders schema operations into steps.
#[derive(Debug, Clone, Default)]
pub struct StepSplitter {
    options: SplitOptions,
}

impl StepSplitter {
    /// Creates a splitter with the given options.
    #[must_use]
    pub const fn new(options: SplitOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Splits the operations into ordered steps.
    ///
    /// Every input operation appears in exactly one step.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::DependencyCycle` if derived tables of one
    /// phase depend on each other in a cycle and the cycle policy is
    /// `Fail`. The error names the tables of the first such phase.
    pub fn split(&self, operations: Vec<Operation>) -> Result<SplitPlan> {
        let plan = self.plan(operations);
        if self.options.cycle_policy == CyclePolicy::Fail {
            if let Some(first) = plan.unresolved.first() {
                let phase = first.phase;
                let tables = plan
                    .unresolved
                    .iter()
                    .filter(|u| u.phase == phase)
                    .map(|u| u.table.clone())
                    .collect();
                return Err(MigrateError::DependencyCycle { phase, tables });
            }
        }
        Ok(plan)
    }

    fn plan(&self, operations: Vec<Operation>) -> SplitPlan {
        let warnings = if self.options.audit_annotations {
            audit_annotations(&operations)
        } else {
            Vec::new()
        };

        let total = operations.len();
        let mut buckets: [Vec<(usize, Operation)>; 9] = Default::default();
        for (index, op) in operations.into_iter().enumerate() {
            buckets[classify(&op).ordinal() - 1].push((index, op));
        }

        let mut unresolved = Vec::new();
        let mut ordered = Vec::with_capacity(total);
        for (phase, bucket) in Phase::ALL.into_iter().zip(buckets) {
            debug!(phase = %phase, operations = bucket.len(), "Ordering phase");
            let bucket = if phase.is_graph_ordered() && bucket.len() > 1 {
                self.order_bucket(phase, bucket, &mut unresolved)
            } else {
                bucket
            };
            ordered.extend(bucket.into_iter().map(|(index, op)| (index, phase, op)));
        }

        SplitPlan {
            steps: assemble(ordered),
            warnings,
            unresolved,
        }
    }

    fn order_bucket(
        &self,
        phase: Phase,
        bucket: Vec<(usize, Operation)>,
        unresolved: &mut Vec<UnresolvedDependency>,
    ) -> Vec<(usize, Operation)> {
        let refs: Vec<&Operation> = bucket.iter().map(|(_, op)| op).collect();
        let graph = DependencyGraph::build(&refs);
        let outcome = stable_topological_sort(&graph);

        if !outcome.is_complete() {
            if self.options.cycle_policy == CyclePolicy::Warn {
                let tables: Vec<&str> = outcome
                    .unresolved
                    .iter()
                    .map(|&node| graph.name(node))
                    .collect();
                warn!(
                    phase = %phase,
                    tables = %tables.join(", "),
                    "Dependency cycle between derived tables, keeping input order for them"
                );
            }
            for &node in &outcome.unresolved {
                let waiting_on = graph
                    .dependencies(node)
                    .iter()
                    .filter(|&&dep| outcome.unresolved.contains(&dep))
                    .map(|&dep| graph.name(dep).to_string())
                    .collect();
                unresolved.push(UnresolvedDependency {
                    phase,
                    table: graph.name(node).to_string(),
                    waiting_on,
                });
            }
        }

        let order = if phase == Phase::DropDerivedTables {
            outcome.removal_order()
        } else {
            outcome.creation_order()
        };

        let mut slots: Vec<Option<(usize, Operation)>> = bucket.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|node| slots[node].take())
            .collect()
    }
}

/// Splits operations with default options.
///
/// Cycles fall back to input order, so this never fails.
#[must_use]
pub fn split_operations(operations: Vec<Operation>) -> Vec<StepMigration> {
    StepSplitter::default().plan(operations).steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::TableAnnotations;

    fn descriptions(steps: &[StepMigration]) -> Vec<&str> {
        steps.iter().map(|s| s.description.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(split_operations(Vec::new()).is_empty());
    }

    #[test]
    fn test_phase_order_and_numbering() {
        let steps = split_operations(vec![
            Operation::add_projection("events", "p"),
            Operation::create_index("events", "ix"),
            Operation::alter_column("events", "a"),
            Operation::add_column("events", "b"),
            Operation::create_table("events"),
            Operation::drop_table("old"),
            Operation::drop_index("events", "ix_old"),
        ]);
        assert_eq!(
            descriptions(&steps),
            vec![
                "DropIndex_ix_old",
                "DropTable_old",
                "CreateTable_events",
                "AddColumn_events_b",
                "AlterColumn_events_a",
                "CreateIndex_ix",
                "AddProjection_p",
            ]
        );
        let numbers: Vec<usize> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(steps[0].original_index, 6);
    }

    #[test]
    fn test_plain_buckets_keep_input_order() {
        let steps = split_operations(vec![
            Operation::create_table("b"),
            Operation::create_table("a"),
            Operation::create_table("c"),
        ]);
        assert_eq!(
            descriptions(&steps),
            vec!["CreateTable_b", "CreateTable_a", "CreateTable_c"]
        );
    }

    #[test]
    fn test_strict_policy_fails_on_cycle() {
        let a = TableAnnotations::materialized_view(Some("b"), None);
        let b = TableAnnotations::materialized_view(Some("a"), None);
        let result = StepSplitter::new(SplitOptions::new().strict()).split(vec![
            Operation::create_annotated("a", a),
            Operation::create_annotated("b", b),
        ]);
        assert!(matches!(
            result,
            Err(MigrateError::DependencyCycle { phase: Phase::CreateDerivedTables, ref tables })
                if tables == &["a", "b"]
        ));
    }

    #[test]
    fn test_warn_policy_reports_unresolved() {
        let plan = StepSplitter::default()
            .split(vec![
                Operation::drop_materialized_view("a", "b"),
                Operation::drop_materialized_view("b", "a"),
            ])
            .unwrap();
        assert_eq!(descriptions(&plan.steps), vec!["DropTable_a", "DropTable_b"]);
        assert_eq!(plan.unresolved.len(), 2);
        assert_eq!(plan.unresolved[0].table, "a");
        assert_eq!(plan.unresolved[0].waiting_on, vec!["b"]);
        assert_eq!(plan.unresolved[0].phase, Phase::DropDerivedTables);
    }

    #[test]
    fn test_audit_can_be_disabled() {
        let ops = vec![Operation::create_annotated(
            "x",
            TableAnnotations::materialized_view(None, None),
        )];
        let audited = StepSplitter::default().split(ops.clone()).unwrap();
        assert_eq!(audited.warnings.len(), 1);

        let quiet = StepSplitter::new(SplitOptions::new().without_audit())
            .split(ops)
            .unwrap();
        assert!(quiet.warnings.is_empty());
        assert_eq!(quiet.steps, audited.steps);
    }

    #[test]
    fn test_steps_in_phase() {
        let plan = StepSplitter::default()
            .split(vec![
                Operation::create_table("a"),
                Operation::create_materialized_view("mv", "a"),
                Operation::create_table("b"),
            ])
            .unwrap();
        assert_eq!(plan.steps_in(Phase::CreateTables).count(), 2);
        assert_eq!(plan.operations().count(), 3);
    }
}
