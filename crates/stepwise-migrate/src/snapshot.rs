//! Schema snapshots and where they are kept.
//!
//! A snapshot records which tables exist and which of them are materialized
//! views or dictionaries. Drop operations need the previous snapshot to know
//! what kind of table is going away; create operations take their
//! annotations from the current one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use stepwise_sql::TableName;
use tracing::debug;

use crate::error::Result;
use crate::operation::{Operation, TableAnnotations};

/// What kind of table a snapshot entry is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableKind {
    /// A plain table.
    #[default]
    Regular,
    /// A materialized view.
    MaterializedView {
        /// Table the view reads from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_table: Option<String>,
        /// The view's SELECT query.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    /// A dictionary.
    Dictionary {
        /// Table the dictionary loads from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_table: Option<String>,
    },
}

impl TableKind {
    /// Returns the kind described by operation annotations.
    ///
    /// The materialized view flag wins when both flags are set.
    #[must_use]
    pub fn from_annotations(annotations: &TableAnnotations) -> Self {
        if annotations.is_materialized_view {
            Self::MaterializedView {
                source_table: annotations.materialized_view_source_table.clone(),
                query: annotations.materialized_view_query.clone(),
            }
        } else if annotations.is_dictionary {
            Self::Dictionary {
                source_table: annotations.dictionary_source_table.clone(),
            }
        } else {
            Self::Regular
        }
    }

    /// Returns the operation annotations for this kind.
    #[must_use]
    pub fn to_annotations(&self) -> TableAnnotations {
        match self {
            Self::Regular => TableAnnotations::new(),
            Self::MaterializedView {
                source_table,
                query,
            } => TableAnnotations::materialized_view(source_table.as_deref(), query.as_deref()),
            Self::Dictionary { source_table } => {
                TableAnnotations::dictionary(source_table.as_deref())
            }
        }
    }
}

/// A table in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table name.
    pub name: String,
    /// Table kind.
    #[serde(default)]
    pub kind: TableKind,
}

impl TableSnapshot {
    /// Creates a plain table entry.
    #[must_use]
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::Regular,
        }
    }

    /// Creates a materialized view entry.
    #[must_use]
    pub fn materialized_view(
        name: impl Into<String>,
        source_table: Option<&str>,
        query: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::MaterializedView {
                source_table: source_table.map(String::from),
                query: query.map(String::from),
            },
        }
    }

    /// Creates a dictionary entry.
    #[must_use]
    pub fn dictionary(name: impl Into<String>, source_table: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::Dictionary {
                source_table: source_table.map(String::from),
            },
        }
    }
}

/// The tables of a schema at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Tables in insertion order.
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name.
    #[must_use]
    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.insert(table);
        self
    }

    /// Inserts a table, replacing any table with the same name.
    pub fn insert(&mut self, table: TableSnapshot) {
        match self.position(&table.name) {
            Some(i) => self.tables[i] = table,
            None => self.tables.push(table),
        }
    }

    /// Removes a table by name, ignoring case and schema.
    pub fn remove(&mut self, name: &str) -> Option<TableSnapshot> {
        self.position(name).map(|i| self.tables.remove(i))
    }

    /// Looks up a table by name, ignoring case and schema.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.position(name).map(|i| &self.tables[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = TableName::from_qualified(name);
        self.tables
            .iter()
            .position(|t| TableName::from_qualified(&t.name) == wanted)
    }

    /// Returns the snapshot after the given operations ran.
    ///
    /// Only table creation and removal change a snapshot.
    #[must_use]
    pub fn apply(&self, operations: &[Operation]) -> Self {
        let mut next = self.clone();
        for op in operations {
            match op {
                Operation::CreateTable(create) => next.insert(TableSnapshot {
                    name: create.name.clone(),
                    kind: TableKind::from_annotations(&create.annotations),
                }),
                Operation::DropTable(drop) => {
                    next.remove(&drop.name);
                }
                _ => {}
            }
        }
        next
    }
}

/// Fills in derived-table annotations from snapshots.
///
/// `CreateTable` annotations are taken from `current` and `DropTable`
/// annotations from `previous`. Operations on tables a snapshot does not
/// know are returned unchanged.
#[must_use]
pub fn enrich_annotations(
    mut operations: Vec<Operation>,
    previous: Option<&SchemaSnapshot>,
    current: Option<&SchemaSnapshot>,
) -> Vec<Operation> {
    for op in &mut operations {
        let snapshot = match op {
            Operation::CreateTable(_) => current,
            Operation::DropTable(_) => previous,
            _ => None,
        };
        let Some(snapshot) = snapshot else {
            continue;
        };
        let Some(table) = op.table().and_then(|name| snapshot.table(name)) else {
            continue;
        };
        let annotations = table.kind.to_annotations();
        if let Some(slot) = op.annotations_mut() {
            *slot = annotations;
        }
    }
    operations
}

/// Storage for the schema snapshot of the last generation run.
pub trait SnapshotRepository {
    /// Loads the snapshot saved by the previous run, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read.
    fn load_previous(&self) -> Result<Option<SchemaSnapshot>>;

    /// Saves the snapshot of the current run.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, snapshot: &SchemaSnapshot) -> Result<()>;
}

/// A repository that keeps the snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    snapshot: Mutex<Option<SchemaSnapshot>>,
}

impl InMemorySnapshotRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: SchemaSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn load_previous(&self) -> Result<Option<SchemaSnapshot>> {
        let guard = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &SchemaSnapshot) -> Result<()> {
        let mut guard = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(snapshot.clone());
        Ok(())
    }
}

/// A repository that keeps the snapshot in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotRepository {
    path: PathBuf,
}

impl JsonSnapshotRepository {
    /// Creates a repository backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotRepository for JsonSnapshotRepository {
    fn load_previous(&self) -> Result<Option<SchemaSnapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No previous snapshot");
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, snapshot: &SchemaSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), tables = snapshot.tables.len(), "Saved snapshot");
        Ok(())
    }
}
