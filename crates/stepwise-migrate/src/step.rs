//! Numbered migration steps.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;
use crate::phase::Phase;

/// One operation wrapped as an independently applicable step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMigration {
    /// 1-based position in the plan. Steps are applied in this order.
    pub step_number: usize,
    /// Short human-readable label, e.g. `AddColumn_events_ts`.
    pub description: String,
    /// The operation, unchanged.
    pub operation: Operation,
    /// Position of the operation in the input list.
    pub original_index: usize,
    /// Phase the operation was classified into.
    pub phase: Phase,
}

/// Returns the step label for an operation.
#[must_use]
pub fn describe(operation: &Operation) -> String {
    let kind = operation.kind();
    match operation {
        Operation::CreateTable(op) => format!("{kind}_{}", op.name),
        Operation::DropTable(op) => format!("{kind}_{}", op.name),
        Operation::AddColumn(op) => format!("{kind}_{}_{}", op.table, op.column),
        Operation::DropColumn(op) => format!("{kind}_{}_{}", op.table, op.column),
        Operation::AlterColumn(op) => format!("{kind}_{}_{}", op.table, op.column),
        Operation::RenameColumn(op) => {
            format!("{kind}_{}_{}_to_{}", op.table, op.old_name, op.new_name)
        }
        Operation::Other(op) => match &op.table {
            Some(table) => format!("{kind}_{table}"),
            None => kind.to_string(),
        },
        // Indexes and projections are named by the object, not the table.
        Operation::CreateIndex(_)
        | Operation::DropIndex(_)
        | Operation::AddProjection(_)
        | Operation::DropProjection(_)
        | Operation::MaterializeProjection(_) => {
            format!("{kind}_{}", operation.object_name().unwrap_or_default())
        }
    }
}

/// Wraps phase-ordered operations into numbered steps.
///
/// Each item is `(original_index, phase, operation)`; numbering follows the
/// iteration order.
pub fn assemble<I>(ordered: I) -> Vec<StepMigration>
where
    I: IntoIterator<Item = (usize, Phase, Operation)>,
{
    ordered
        .into_iter()
        .enumerate()
        .map(|(position, (original_index, phase, operation))| StepMigration {
            step_number: position + 1,
            description: describe(&operation),
            operation,
            original_index,
            phase,
        })
        .collect()
}
