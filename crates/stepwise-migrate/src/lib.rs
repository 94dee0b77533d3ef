//! Phase-ordered step splitting for forward-only schema migrations.
//!
//! Column-oriented analytical databases such as ClickHouse run DDL without
//! transactions, so a failed migration cannot be rolled back. `stepwise-migrate`
//! takes an unordered batch of schema operations and splits it into single-
//! operation steps, ordered so that no step ever needs something a later
//! step provides:
//!
//! - **Classifier** - assigns each operation to one of nine [`Phase`](phase::Phase)s
//! - **Dependency graph** - links materialized views and dictionaries to the
//!   tables they read, parsing their stored queries with `stepwise-sql`
//! - **Sorter** - a stable Kahn sort inside the two derived-table phases
//! - **Assembler** - numbers and labels the steps
//!
//! Around the core there are step identifiers for a generation run, a
//! snapshot repository that supplies derived-table annotations, and an
//! annotation audit.
//!
//! # Example
//!
//! ```rust
//! use stepwise_migrate::prelude::*;
//!
//! let steps = split_operations(vec![
//!     Operation::create_materialized_view("daily_totals", "events"),
//!     Operation::add_column("events", "amount"),
//!     Operation::create_table("events"),
//! ]);
//!
//! let labels: Vec<&str> = steps.iter().map(|s| s.description.as_str()).collect();
//! assert_eq!(
//!     labels,
//!     ["CreateTable_events", "AddColumn_events_amount", "CreateTable_daily_totals"]
//! );
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Plan the steps for a batch of operations
//! stepwise plan --operations ops.json --previous schema.json --changeset add_totals
//!
//! # Show the tables a query reads from
//! stepwise tables "SELECT * FROM events JOIN users USING (id)"
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod graph;
pub mod naming;
pub mod operation;
pub mod phase;
pub mod snapshot;
pub mod sort;
pub mod splitter;
pub mod step;

pub use splitter::{split_operations, SplitPlan, StepSplitter, UnresolvedDependency};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::audit::{audit_annotations, AnnotationWarning};
    pub use crate::config::{CyclePolicy, SplitOptions};
    pub use crate::error::{MigrateError, Result};
    pub use crate::naming::{GenerationRun, IdentifiedStep};
    pub use crate::operation::{Operation, OperationKind, TableAnnotations};
    pub use crate::phase::{classify, Phase};
    pub use crate::snapshot::{
        enrich_annotations, InMemorySnapshotRepository, JsonSnapshotRepository, SchemaSnapshot,
        SnapshotRepository, TableKind, TableSnapshot,
    };
    pub use crate::splitter::{split_operations, SplitPlan, StepSplitter, UnresolvedDependency};
    pub use crate::step::StepMigration;
}
