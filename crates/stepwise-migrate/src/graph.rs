//! Dependency graph over the derived tables of one phase.
//!
//! Nodes are arena indices: node `i` is the `i`-th operation of the phase
//! bucket. An edge `source -> dependent` exists when `dependent` reads from
//! `source` and both are in the bucket. Dependencies on tables outside the
//! bucket are already satisfied (or will be) by phase order alone.

use std::collections::HashMap;

use stepwise_sql::{try_extract_table_references, TableName, TableSet};
use tracing::debug;

use crate::operation::{Operation, TableAnnotations};

/// Returns the tables an annotated table depends on.
///
/// This is the declared materialized view and dictionary sources plus every
/// table the stored query reads. A query that does not parse contributes
/// nothing.
#[must_use]
pub fn table_dependencies(annotations: &TableAnnotations) -> TableSet {
    let mut tables = TableSet::new();
    let sources = [
        &annotations.materialized_view_source_table,
        &annotations.dictionary_source_table,
    ];
    for source in sources.into_iter().flatten() {
        let source = TableName::from_qualified(source);
        if !source.as_str().is_empty() {
            tables.insert(source);
        }
    }

    if let Some(query) = annotations.materialized_view_query.as_deref() {
        if !query.trim().is_empty() {
            match try_extract_table_references(query) {
                Ok(found) => tables.extend(found),
                Err(err) => debug!(error = %err, "Ignoring unparsable view query"),
            }
        }
    }
    tables
}

/// A dependency graph over one phase bucket.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    /// `dependents[i]` lists the nodes that must come after node `i`.
    dependents: Vec<Vec<usize>>,
    /// `dependencies[i]` lists the nodes that must come before node `i`.
    dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the graph for the operations of one bucket.
    ///
    /// Operations without a table name still get a node, with no edges.
    #[must_use]
    pub fn build(operations: &[&Operation]) -> Self {
        let names: Vec<String> = operations
            .iter()
            .map(|op| op.table().unwrap_or_default().to_string())
            .collect();

        // Keys are normalized like extracted references. First occurrence
        // wins when a name appears twice.
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            let key = TableName::from_qualified(name).key().to_string();
            index.entry(key).or_insert(i);
        }

        let mut dependents = vec![Vec::new(); operations.len()];
        let mut dependencies = vec![Vec::new(); operations.len()];
        for (node, op) in operations.iter().enumerate() {
            let Some(annotations) = op.annotations() else {
                continue;
            };
            for table in table_dependencies(annotations) {
                let Some(&source) = index.get(table.key()) else {
                    continue;
                };
                if source == node {
                    continue;
                }
                dependents[source].push(node);
                dependencies[node].push(source);
            }
        }

        Self {
            names,
            dependents,
            dependencies,
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the table name of a node.
    #[must_use]
    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Returns the nodes that depend on `node`.
    #[must_use]
    pub fn dependents(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    /// Returns the nodes `node` depends on.
    #[must_use]
    pub fn dependencies(&self, node: usize) -> &[usize] {
        &self.dependencies[node]
    }

    /// Returns the number of in-bucket dependencies of every node.
    #[must_use]
    pub fn in_degrees(&self) -> Vec<usize> {
        self.dependencies.iter().map(Vec::len).collect()
    }

    /// Returns the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(Vec::len).sum()
    }
}
