//! Execution phases and the operation classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// One of the nine execution phases, in execution order.
///
/// Every operation belongs to exactly one phase. Steps of an earlier phase
/// always run before steps of a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Drop projections and indexes before anything they hang off.
    DropProjectionsAndIndexes,
    /// Drop materialized views and dictionaries before their sources.
    DropDerivedTables,
    /// Drop plain tables.
    DropTables,
    /// Create plain tables.
    CreateTables,
    /// Add columns, so derived tables can select them.
    AddColumns,
    /// Create materialized views and dictionaries.
    CreateDerivedTables,
    /// Alter, drop, and rename columns, plus unclassified changes.
    AlterColumns,
    /// Create indexes.
    CreateIndexes,
    /// Add and materialize projections.
    AddProjections,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Self; 9] = [
        Self::DropProjectionsAndIndexes,
        Self::DropDerivedTables,
        Self::DropTables,
        Self::CreateTables,
        Self::AddColumns,
        Self::CreateDerivedTables,
        Self::AlterColumns,
        Self::CreateIndexes,
        Self::AddProjections,
    ];

    /// Returns the 1-based position of the phase.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize + 1
    }

    /// Returns true for the phases whose tables are ordered by dependency.
    #[must_use]
    pub const fn is_graph_ordered(self) -> bool {
        matches!(self, Self::DropDerivedTables | Self::CreateDerivedTables)
    }

    /// Returns the display name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DropProjectionsAndIndexes => "drop projections and indexes",
            Self::DropDerivedTables => "drop derived tables",
            Self::DropTables => "drop tables",
            Self::CreateTables => "create tables",
            Self::AddColumns => "add columns",
            Self::CreateDerivedTables => "create derived tables",
            Self::AlterColumns => "alter columns",
            Self::CreateIndexes => "create indexes",
            Self::AddProjections => "add projections",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns an operation to its execution phase.
#[must_use]
pub fn classify(operation: &Operation) -> Phase {
    match operation {
        Operation::DropProjection(_) | Operation::DropIndex(_) => {
            Phase::DropProjectionsAndIndexes
        }
        Operation::DropTable(op) if op.annotations.is_tagged() => Phase::DropDerivedTables,
        Operation::DropTable(_) => Phase::DropTables,
        Operation::CreateTable(op) if op.annotations.is_tagged() => Phase::CreateDerivedTables,
        Operation::CreateTable(_) => Phase::CreateTables,
        Operation::AddColumn(_) => Phase::AddColumns,
        Operation::AlterColumn(_)
        | Operation::DropColumn(_)
        | Operation::RenameColumn(_)
        | Operation::Other(_) => Phase::AlterColumns,
        Operation::CreateIndex(_) => Phase::CreateIndexes,
        Operation::AddProjection(_) | Operation::MaterializeProjection(_) => {
            Phase::AddProjections
        }
    }
}
