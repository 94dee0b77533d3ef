//! Error types for step splitting and step identification.

use crate::phase::Phase;

/// Errors that can occur while planning migration steps.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Derived tables in one phase depend on each other in a cycle.
    ///
    /// Only returned when the cycle policy is `Fail`.
    #[error("Circular dependency in phase {phase} between tables: {}", .tables.join(", "))]
    DependencyCycle {
        /// The phase whose bucket contains the cycle.
        phase: Phase,
        /// Tables that never became ready, in input order.
        tables: Vec<String>,
    },

    /// A step was asked to undo itself. Steps are forward-only.
    #[error("backward migration unsupported for step {step_id}")]
    BackwardUnsupported {
        /// Identifier of the step.
        step_id: String,
    },

    /// The change-set name cannot be used in step identifiers.
    #[error("Invalid change set name: {0:?}")]
    InvalidChangeSet(String),

    /// IO error (reading operation lists or snapshot files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for migration planning.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_unsupported_message() {
        let err = MigrateError::BackwardUnsupported {
            step_id: "20240101000000_init_001".into(),
        };
        assert_eq!(
            err.to_string(),
            "backward migration unsupported for step 20240101000000_init_001"
        );
    }

    #[test]
    fn test_cycle_message_lists_tables() {
        let err = MigrateError::DependencyCycle {
            phase: Phase::CreateDerivedTables,
            tables: vec!["mv_a".into(), "mv_b".into()],
        };
        let message = err.to_string();
        assert!(message.contains("create derived tables"));
        assert!(message.ends_with("mv_a, mv_b"));
    }
}
