//! Step identifiers for one generation run.
//!
//! Every step of a run gets an id of the form
//! `<YYYYMMDDHHMMSS>_<changeset>_<NNN>`. All steps share the run's
//! timestamp and change-set name; the suffix is zero-padded so that ids sort
//! lexically in step order. Steps are forward-only.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{MigrateError, Result};
use crate::operation::Operation;
use crate::snapshot::SchemaSnapshot;
use crate::step::StepMigration;

/// `chrono` format of the timestamp part of a step id.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const MIN_SUFFIX_WIDTH: usize = 3;

/// A step with its run-unique identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifiedStep {
    id: String,
    step: StepMigration,
}

impl IdentifiedStep {
    /// Returns the step identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wrapped step.
    #[must_use]
    pub const fn step(&self) -> &StepMigration {
        &self.step
    }

    /// Returns the operations that would undo this step.
    ///
    /// # Errors
    ///
    /// Always returns `MigrateError::BackwardUnsupported`: the target
    /// database has no transactional DDL, so no step can be undone safely.
    pub fn rollback(&self) -> Result<Vec<Operation>> {
        Err(MigrateError::BackwardUnsupported {
            step_id: self.id.clone(),
        })
    }
}

/// The identified steps of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRun {
    changeset: String,
    timestamp: NaiveDateTime,
    steps: Vec<IdentifiedStep>,
    /// Shared by all steps of the run.
    snapshot: Option<SchemaSnapshot>,
}

impl GenerationRun {
    /// Assigns identifiers to `steps`.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidChangeSet` if the change-set name is
    /// empty or contains characters other than ASCII letters, digits, `_`
    /// and `-`.
    pub fn new(
        changeset: &str,
        timestamp: NaiveDateTime,
        steps: Vec<StepMigration>,
    ) -> Result<Self> {
        validate_changeset(changeset)?;

        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let width = suffix_width(steps.len());
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| IdentifiedStep {
                id: format!("{stamp}_{changeset}_{:0width$}", i + 1),
                step,
            })
            .collect();

        Ok(Self {
            changeset: changeset.to_string(),
            timestamp,
            steps,
            snapshot: None,
        })
    }

    /// Assigns identifiers using the current UTC time.
    ///
    /// # Errors
    ///
    /// See [`GenerationRun::new`].
    pub fn now(changeset: &str, steps: Vec<StepMigration>) -> Result<Self> {
        Self::new(changeset, Utc::now().naive_utc(), steps)
    }

    /// Attaches the schema snapshot for the whole run.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: SchemaSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Returns the change-set name.
    #[must_use]
    pub fn changeset(&self) -> &str {
        &self.changeset
    }

    /// Returns the run timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Returns the identified steps in order.
    #[must_use]
    pub fn steps(&self) -> &[IdentifiedStep] {
        &self.steps
    }

    /// Returns the run's snapshot, if one was attached.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&SchemaSnapshot> {
        self.snapshot.as_ref()
    }
}

/// Parses a `YYYYMMDDHHMMSS` timestamp.
///
/// # Errors
///
/// Returns the `chrono` parse error for malformed input.
pub fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

fn validate_changeset(changeset: &str) -> Result<()> {
    let valid = !changeset.is_empty()
        && changeset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(MigrateError::InvalidChangeSet(changeset.to_string()))
    }
}

fn suffix_width(count: usize) -> usize {
    count.to_string().len().max(MIN_SUFFIX_WIDTH)
}
