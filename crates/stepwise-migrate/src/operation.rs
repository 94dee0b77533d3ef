//! Schema change operations.
//!
//! An [`Operation`] is one unordered schema change produced by an upstream
//! diff engine. The splitter never modifies operations; it only moves and
//! wraps them. Operations serialize as JSON objects tagged by `kind`:
//!
//! ```json
//! { "kind": "create_table", "name": "daily_mv", "is_materialized_view": true,
//!   "materialized_view_source_table": "events" }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Derived-table annotations carried by `CreateTable` and `DropTable`.
///
/// The splitter trusts these flags as given. [`crate::audit`] can cross-check
/// them against the stored query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableAnnotations {
    /// The table is a materialized view.
    pub is_materialized_view: bool,
    /// Table the materialized view reads from.
    pub materialized_view_source_table: Option<String>,
    /// The SELECT query backing the materialized view.
    pub materialized_view_query: Option<String>,
    /// The table is a dictionary.
    pub is_dictionary: bool,
    /// Table the dictionary loads from.
    pub dictionary_source_table: Option<String>,
}

impl TableAnnotations {
    /// Annotations for a plain table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations for a materialized view.
    #[must_use]
    pub fn materialized_view(source_table: Option<&str>, query: Option<&str>) -> Self {
        Self {
            is_materialized_view: true,
            materialized_view_source_table: source_table.map(String::from),
            materialized_view_query: query.map(String::from),
            ..Self::default()
        }
    }

    /// Annotations for a dictionary.
    #[must_use]
    pub fn dictionary(source_table: Option<&str>) -> Self {
        Self {
            is_dictionary: true,
            dictionary_source_table: source_table.map(String::from),
            ..Self::default()
        }
    }

    /// Returns true if the table is a materialized view or a dictionary.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        self.is_materialized_view || self.is_dictionary
    }
}

/// Create a table, materialized view, or dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableOp {
    /// Table name.
    pub name: String,
    /// Derived-table annotations.
    #[serde(flatten)]
    pub annotations: TableAnnotations,
}

/// Drop a table, materialized view, or dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableOp {
    /// Table name.
    pub name: String,
    /// Derived-table annotations of the table being dropped.
    #[serde(flatten)]
    pub annotations: TableAnnotations,
}

/// Add a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type as written, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

/// Drop a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// Change a column's type or properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterColumnOp {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// New column type as written, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

/// Rename a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameColumnOp {
    /// Table name.
    pub table: String,
    /// Old column name.
    pub old_name: String,
    /// New column name.
    pub new_name: String,
}

/// Create a data-skipping index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexOp {
    /// Table name.
    pub table: String,
    /// Index name.
    pub name: String,
}

/// Drop a data-skipping index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndexOp {
    /// Table name.
    pub table: String,
    /// Index name.
    pub name: String,
}

/// Add a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProjectionOp {
    /// Table name.
    pub table: String,
    /// Projection name.
    pub name: String,
}

/// Drop a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropProjectionOp {
    /// Table name.
    pub table: String,
    /// Projection name.
    pub name: String,
}

/// Build a projection for data already in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeProjectionOp {
    /// Table name.
    pub table: String,
    /// Projection name.
    pub name: String,
}

/// Any change the splitter has no dedicated kind for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OtherOp {
    /// Table name, if the change targets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table.
    CreateTable(CreateTableOp),
    /// Drop a table.
    DropTable(DropTableOp),
    /// Add a column.
    AddColumn(AddColumnOp),
    /// Drop a column.
    DropColumn(DropColumnOp),
    /// Alter a column.
    AlterColumn(AlterColumnOp),
    /// Rename a column.
    RenameColumn(RenameColumnOp),
    /// Create an index.
    CreateIndex(CreateIndexOp),
    /// Drop an index.
    DropIndex(DropIndexOp),
    /// Add a projection.
    AddProjection(AddProjectionOp),
    /// Drop a projection.
    DropProjection(DropProjectionOp),
    /// Materialize a projection.
    MaterializeProjection(MaterializeProjectionOp),
    /// Anything else.
    Other(OtherOp),
}

/// The kind of an [`Operation`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AlterColumn,
    RenameColumn,
    CreateIndex,
    DropIndex,
    AddProjection,
    DropProjection,
    MaterializeProjection,
    Other,
}

impl OperationKind {
    /// Returns the kind name used in step descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::DropTable => "DropTable",
            Self::AddColumn => "AddColumn",
            Self::DropColumn => "DropColumn",
            Self::AlterColumn => "AlterColumn",
            Self::RenameColumn => "RenameColumn",
            Self::CreateIndex => "CreateIndex",
            Self::DropIndex => "DropIndex",
            Self::AddProjection => "AddProjection",
            Self::DropProjection => "DropProjection",
            Self::MaterializeProjection => "MaterializeProjection",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    /// Creates a plain table.
    #[must_use]
    pub fn create_table(name: impl Into<String>) -> Self {
        Self::CreateTable(CreateTableOp {
            name: name.into(),
            annotations: TableAnnotations::new(),
        })
    }

    /// Creates a table with the given annotations.
    #[must_use]
    pub fn create_annotated(name: impl Into<String>, annotations: TableAnnotations) -> Self {
        Self::CreateTable(CreateTableOp {
            name: name.into(),
            annotations,
        })
    }

    /// Creates a materialized view reading from `source`.
    #[must_use]
    pub fn create_materialized_view(name: impl Into<String>, source: &str) -> Self {
        Self::create_annotated(name, TableAnnotations::materialized_view(Some(source), None))
    }

    /// Creates a dictionary loading from `source`.
    #[must_use]
    pub fn create_dictionary(name: impl Into<String>, source: &str) -> Self {
        Self::create_annotated(name, TableAnnotations::dictionary(Some(source)))
    }

    /// Drops a plain table.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable(DropTableOp {
            name: name.into(),
            annotations: TableAnnotations::new(),
        })
    }

    /// Drops a table with the given annotations.
    #[must_use]
    pub fn drop_annotated(name: impl Into<String>, annotations: TableAnnotations) -> Self {
        Self::DropTable(DropTableOp {
            name: name.into(),
            annotations,
        })
    }

    /// Drops a materialized view that read from `source`.
    #[must_use]
    pub fn drop_materialized_view(name: impl Into<String>, source: &str) -> Self {
        Self::drop_annotated(name, TableAnnotations::materialized_view(Some(source), None))
    }

    /// Adds a column.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::AddColumn(AddColumnOp {
            table: table.into(),
            column: column.into(),
            column_type: None,
        })
    }

    /// Drops a column.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn(DropColumnOp {
            table: table.into(),
            column: column.into(),
        })
    }

    /// Alters a column.
    #[must_use]
    pub fn alter_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::AlterColumn(AlterColumnOp {
            table: table.into(),
            column: column.into(),
            column_type: None,
        })
    }

    /// Renames a column.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameColumn(RenameColumnOp {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    /// Creates an index.
    #[must_use]
    pub fn create_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::CreateIndex(CreateIndexOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Drops an index.
    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex(DropIndexOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Adds a projection.
    #[must_use]
    pub fn add_projection(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AddProjection(AddProjectionOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Drops a projection.
    #[must_use]
    pub fn drop_projection(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropProjection(DropProjectionOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Materializes a projection.
    #[must_use]
    pub fn materialize_projection(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MaterializeProjection(MaterializeProjectionOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Creates an unclassified operation.
    #[must_use]
    pub fn other(table: Option<&str>) -> Self {
        Self::Other(OtherOp {
            table: table.map(String::from),
        })
    }

    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::CreateTable(_) => OperationKind::CreateTable,
            Self::DropTable(_) => OperationKind::DropTable,
            Self::AddColumn(_) => OperationKind::AddColumn,
            Self::DropColumn(_) => OperationKind::DropColumn,
            Self::AlterColumn(_) => OperationKind::AlterColumn,
            Self::RenameColumn(_) => OperationKind::RenameColumn,
            Self::CreateIndex(_) => OperationKind::CreateIndex,
            Self::DropIndex(_) => OperationKind::DropIndex,
            Self::AddProjection(_) => OperationKind::AddProjection,
            Self::DropProjection(_) => OperationKind::DropProjection,
            Self::MaterializeProjection(_) => OperationKind::MaterializeProjection,
            Self::Other(_) => OperationKind::Other,
        }
    }

    /// Returns the target table name.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable(op) => Some(&op.name),
            Self::DropTable(op) => Some(&op.name),
            Self::AddColumn(op) => Some(&op.table),
            Self::DropColumn(op) => Some(&op.table),
            Self::AlterColumn(op) => Some(&op.table),
            Self::RenameColumn(op) => Some(&op.table),
            Self::CreateIndex(op) => Some(&op.table),
            Self::DropIndex(op) => Some(&op.table),
            Self::AddProjection(op) => Some(&op.table),
            Self::DropProjection(op) => Some(&op.table),
            Self::MaterializeProjection(op) => Some(&op.table),
            Self::Other(op) => op.table.as_deref(),
        }
    }

    /// Returns the index or projection name.
    #[must_use]
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Self::CreateIndex(op) => Some(&op.name),
            Self::DropIndex(op) => Some(&op.name),
            Self::AddProjection(op) => Some(&op.name),
            Self::DropProjection(op) => Some(&op.name),
            Self::MaterializeProjection(op) => Some(&op.name),
            _ => None,
        }
    }

    /// Returns the derived-table annotations of a `CreateTable` or
    /// `DropTable`.
    #[must_use]
    pub const fn annotations(&self) -> Option<&TableAnnotations> {
        match self {
            Self::CreateTable(op) => Some(&op.annotations),
            Self::DropTable(op) => Some(&op.annotations),
            _ => None,
        }
    }

    pub(crate) fn annotations_mut(&mut self) -> Option<&mut TableAnnotations> {
        match self {
            Self::CreateTable(op) => Some(&mut op.annotations),
            Self::DropTable(op) => Some(&mut op.annotations),
            _ => None,
        }
    }

    /// Returns true for a `CreateTable` or `DropTable` tagged as a
    /// materialized view or dictionary.
    #[must_use]
    pub fn is_derived_table(&self) -> bool {
        self.annotations().is_some_and(TableAnnotations::is_tagged)
    }
}
