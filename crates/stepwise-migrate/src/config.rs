//! Options for the step splitter.

use serde::{Deserialize, Serialize};

/// What to do when derived tables in one phase depend on each other in a
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Log a warning and place the tables of the cycle after the sorted
    /// ones, in input order.
    #[default]
    Warn,
    /// Refuse to plan with `MigrateError::DependencyCycle`.
    Fail,
}

/// Options for [`crate::StepSplitter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// How dependency cycles are handled.
    pub cycle_policy: CyclePolicy,
    /// Whether to cross-check derived-table annotations against their
    /// stored queries.
    pub audit_annotations: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitOptions {
    /// Creates default options: warn on cycles, audit annotations.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycle_policy: CyclePolicy::Warn,
            audit_annotations: true,
        }
    }

    /// Fails on dependency cycles.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.cycle_policy = CyclePolicy::Fail;
        self
    }

    /// Skips the annotation audit.
    #[must_use]
    pub const fn without_audit(mut self) -> Self {
        self.audit_annotations = false;
        self
    }

    /// Sets the cycle policy.
    #[must_use]
    pub const fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }
}
