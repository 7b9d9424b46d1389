//! Index hygiene: foreign keys without a supporting index.
//!
//! Deleting or updating a referenced row makes the database look up the
//! referencing rows. Without an index on the foreign-key columns that is a
//! sequential scan of the referencing table, run while locks are held.
//!
//! An index supports a foreign key when the key's columns, in order, are a
//! leading prefix of the index's columns.

use std::fmt;

use serde::Serialize;

use crate::graph::{DependencyType, Graph, Node};

/// Whether `index` has `columns` as an exact ordered prefix.
#[must_use]
pub fn index_covers<S: AsRef<str>>(index: &[S], columns: &[&str]) -> bool {
    index.len() >= columns.len()
        && index
            .iter()
            .zip(columns)
            .all(|(indexed, column)| indexed.as_ref() == *column)
}

/// Whether any index on `node` covers `columns`.
#[must_use]
pub fn has_covering_index(node: &Node, columns: &[&str]) -> bool {
    node.indexes.iter().any(|index| index_covers(index, columns))
}

/// A foreign key whose columns no index covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFkIndex {
    /// Referencing table
    pub source_id: String,
    /// Referenced table
    pub target_id: String,
    /// Foreign-key columns, in constraint order
    pub columns: Vec<String>,
    /// Constraint that declared the key, if known
    pub constraint_name: Option<String>,
}

impl fmt::Display for MissingFkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.source_id,
            self.columns.join(","),
            self.target_id
        )
    }
}

/// Result of an index hygiene check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexCoverage {
    /// Foreign-key edges examined
    pub total_fks: usize,
    /// Foreign keys with a covering index
    pub indexed_fks: usize,
    /// Foreign keys skipped because their columns are unknown
    pub unknown_column_fks: usize,
    /// Foreign keys with no covering index, in edge order
    pub missing: Vec<MissingFkIndex>,
}

impl IndexCoverage {
    /// Whether every checkable foreign key is indexed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check every foreign-key edge for a covering index on its source table.
#[must_use]
pub fn check_index_coverage(graph: &Graph) -> IndexCoverage {
    let mut coverage = IndexCoverage::default();

    for edge in graph
        .edges()
        .filter(|e| e.dep_type == DependencyType::ForeignKey)
    {
        coverage.total_fks += 1;

        let Some(columns) = edge.fk_columns() else {
            tracing::debug!(
                source = %edge.source_id,
                target = %edge.target_id,
                "Foreign key has no column metadata, skipping"
            );
            coverage.unknown_column_fks += 1;
            continue;
        };
        let Some(source) = graph.node(&edge.source_id) else {
            coverage.unknown_column_fks += 1;
            continue;
        };

        if has_covering_index(source, &columns) {
            coverage.indexed_fks += 1;
        } else {
            coverage.missing.push(MissingFkIndex {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
                constraint_name: edge.constraint_name.clone(),
            });
        }
    }

    tracing::debug!(
        total = coverage.total_fks,
        indexed = coverage.indexed_fks,
        missing = coverage.missing.len(),
        "Checked foreign-key index coverage"
    );
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;
    use rstest::rstest;

    #[rstest]
    #[case::exact(&["user_id"], &["user_id"], true)]
    #[case::prefix_of_longer(&["user_id", "created_at"], &["user_id"], true)]
    #[case::composite_exact(&["tenant_id", "user_id"], &["tenant_id", "user_id"], true)]
    #[case::wrong_first_column(&["created_at", "user_id"], &["user_id"], false)]
    #[case::too_short(&["tenant_id"], &["tenant_id", "user_id"], false)]
    #[case::reordered(&["user_id", "tenant_id"], &["tenant_id", "user_id"], false)]
    fn prefix_rule(#[case] index: &[&str], #[case] fk: &[&str], #[case] covered: bool) {
        assert_eq!(index_covers(index, fk), covered);
    }

    fn orders_graph(indexes: &[&[&str]], fk_columns: Option<&[&str]>) -> Graph {
        let mut graph = Graph::new();
        graph.add_node("public", "orders", NodeType::Table, "", 0);
        graph.add_node("public", "users", NodeType::Table, "", 0);
        for index in indexes {
            graph.add_index("public", "orders", *index);
        }
        let edge = graph.add_edge(
            "public",
            "orders",
            "public",
            "users",
            DependencyType::ForeignKey,
            Some("orders_user_fk"),
            None,
        );
        if let Some(cols) = fk_columns {
            edge.set_fk_columns(cols);
        }
        graph
    }

    #[test]
    fn covered_fk_is_counted() {
        let graph = orders_graph(&[&["user_id", "id"]], Some(&["user_id"][..]));
        let coverage = check_index_coverage(&graph);
        assert_eq!(coverage.total_fks, 1);
        assert_eq!(coverage.indexed_fks, 1);
        assert!(coverage.is_clean());
    }

    #[test]
    fn uncovered_fk_is_formatted() {
        let graph = orders_graph(&[&["id"]], Some(&["tenant_id", "user_id"][..]));
        let coverage = check_index_coverage(&graph);
        assert_eq!(coverage.indexed_fks, 0);
        assert_eq!(coverage.missing.len(), 1);
        assert_eq!(
            coverage.missing[0].to_string(),
            "public.orders(tenant_id,user_id) -> public.users"
        );
    }

    #[test]
    fn fk_without_columns_is_skipped() {
        let graph = orders_graph(&[], None);
        let coverage = check_index_coverage(&graph);
        assert_eq!(coverage.total_fks, 1);
        assert_eq!(coverage.unknown_column_fks, 1);
        assert_eq!(coverage.indexed_fks, 0);
        assert!(coverage.missing.is_empty());
    }

    #[test]
    fn non_fk_edges_are_ignored() {
        let mut graph = Graph::new();
        graph.add_edge(
            "public",
            "v_orders",
            "public",
            "orders",
            DependencyType::ViewDepends,
            None,
            None,
        );
        assert_eq!(check_index_coverage(&graph), IndexCoverage::default());
    }
}
