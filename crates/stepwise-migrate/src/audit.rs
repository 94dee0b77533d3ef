//! Cross-checks of derived-table annotations.
//!
//! The splitter orders derived tables by what their annotations say. When an
//! upstream tool gets an annotation wrong the plan can still be wrong, so
//! this module compares the flags and sources against the stored query and
//! reports inconsistencies. Warnings never change the ordering.

use std::fmt;

use serde::{Deserialize, Serialize};
use stepwise_sql::{try_extract_table_references, TableName};
use tracing::warn;

use crate::graph::table_dependencies;
use crate::operation::{Operation, TableAnnotations};

/// An inconsistency in the annotations of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum AnnotationWarning {
    /// Both the materialized view and the dictionary flag are set.
    ConflictingTags {
        /// Table name.
        table: String,
    },
    /// A source or query is declared but the table is not tagged, so it is
    /// ordered as a plain table.
    UntaggedDerivedTable {
        /// Table name.
        table: String,
    },
    /// The table is tagged but nothing says what it reads from.
    MissingDependencyInfo {
        /// Table name.
        table: String,
    },
    /// The stored query does not parse; its tables are not dependencies.
    UnparsableQuery {
        /// Table name.
        table: String,
        /// The parse error.
        message: String,
    },
    /// The declared source table does not appear in the stored query.
    SourceNotInQuery {
        /// Table name.
        table: String,
        /// The declared source.
        source: String,
    },
}

impl AnnotationWarning {
    /// Returns the table the warning is about.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::ConflictingTags { table }
            | Self::UntaggedDerivedTable { table }
            | Self::MissingDependencyInfo { table }
            | Self::UnparsableQuery { table, .. }
            | Self::SourceNotInQuery { table, .. } => table,
        }
    }
}

impl fmt::Display for AnnotationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingTags { table } => write!(
                f,
                "Table '{table}' is tagged as both a materialized view and a dictionary"
            ),
            Self::UntaggedDerivedTable { table } => write!(
                f,
                "Table '{table}' declares a source or query but is not tagged as derived"
            ),
            Self::MissingDependencyInfo { table } => write!(
                f,
                "Derived table '{table}' has no source table and no usable query"
            ),
            Self::UnparsableQuery { table, message } => {
                write!(f, "Query of '{table}' could not be parsed: {message}")
            }
            Self::SourceNotInQuery { table, source } => write!(
                f,
                "Declared source '{source}' of '{table}' does not appear in its query"
            ),
        }
    }
}

/// Checks the annotations of every `CreateTable` and `DropTable`.
///
/// Each warning is also logged.
#[must_use]
pub fn audit_annotations(operations: &[Operation]) -> Vec<AnnotationWarning> {
    let mut warnings = Vec::new();
    for op in operations {
        let (Some(table), Some(annotations)) = (op.table(), op.annotations()) else {
            continue;
        };
        audit_table(table, annotations, &mut warnings);
    }
    for warning in &warnings {
        warn!(table = %warning.table(), "{warning}");
    }
    warnings
}

fn audit_table(table: &str, annotations: &TableAnnotations, out: &mut Vec<AnnotationWarning>) {
    let table = table.to_string();

    if annotations.is_materialized_view && annotations.is_dictionary {
        out.push(AnnotationWarning::ConflictingTags {
            table: table.clone(),
        });
    }

    let declares_dependency = [
        &annotations.materialized_view_source_table,
        &annotations.materialized_view_query,
        &annotations.dictionary_source_table,
    ]
    .into_iter()
    .flatten()
    .any(|value| !value.trim().is_empty());

    if !annotations.is_tagged() {
        if declares_dependency {
            out.push(AnnotationWarning::UntaggedDerivedTable { table });
        }
        return;
    }

    if table_dependencies(annotations).is_empty() {
        out.push(AnnotationWarning::MissingDependencyInfo {
            table: table.clone(),
        });
    }

    let Some(query) = annotations
        .materialized_view_query
        .as_deref()
        .filter(|q| !q.trim().is_empty())
    else {
        return;
    };
    match try_extract_table_references(query) {
        Err(err) => out.push(AnnotationWarning::UnparsableQuery {
            table,
            message: err.to_string(),
        }),
        Ok(read) => {
            let source = annotations
                .materialized_view_source_table
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            if let Some(source) = source {
                if !read.contains(&TableName::from_qualified(source)) {
                    out.push(AnnotationWarning::SourceNotInQuery {
                        table,
                        source: source.to_string(),
                    });
                }
            }
        }
    }
}
