//! Reverse-impact analysis: what breaks if an object is dropped or changed.
//!
//! Edges point from dependent to dependency, so impact flows backwards:
//! everything with an edge *into* the target is affected, then everything
//! with an edge into those, and so on.
//!
//! Two queries are provided:
//!
//! - [`downstream`]: flat BFS returning the set of affected ids.
//! - [`build_impact_tree`]: DFS that builds the impact tree, keeping the edge
//!   each object was reached through, and synthesizes structural warnings
//!   along the way.
//!
//! Both carry a traversal-wide visited set, so cycles terminate and every
//! object appears once (at the depth it was first reached).

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::graph::{DependencyType, Edge, Graph, NodeType};
use crate::index::has_covering_index;

/// Every object that depends, directly or transitively, on any of `ids`.
///
/// The starting objects themselves are excluded. Unknown ids contribute
/// nothing. The result is sorted by id.
#[must_use]
pub fn downstream(graph: &Graph, ids: &[&str]) -> Vec<String> {
    let reverse = graph.reverse_adjacency();

    let mut visited: HashSet<&str> = ids.iter().copied().collect();
    let mut queue: VecDeque<&str> = ids.iter().copied().collect();
    let mut impacted: BTreeSet<&str> = BTreeSet::new();

    while let Some(current) = queue.pop_front() {
        for edge in reverse.get(current).into_iter().flatten() {
            let dependent = edge.source_id.as_str();
            if visited.insert(dependent) {
                impacted.insert(dependent);
                queue.push_back(dependent);
            }
        }
    }

    impacted.into_iter().map(str::to_string).collect()
}

// ============================================================================
// Warnings
// ============================================================================

/// How urgently a structural warning should be looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Data loss or wide lock contention is likely
    High,
    /// Breakage or slowness is likely
    Medium,
}

impl Severity {
    /// Short bracket label ("High", "Med").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Med",
        }
    }
}

/// Which structural rule produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `ON DELETE CASCADE` foreign key
    CascadeDelete,
    /// View reached only indirectly
    ViewCoupling,
    /// Foreign key without a covering index
    MissingIndex,
}

/// A risk discovered while expanding the impact tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactWarning {
    /// Urgency
    pub severity: Severity,
    /// Rule that fired
    pub kind: WarningKind,
    /// Object the warning is about
    pub node_id: String,
    /// Human-readable explanation
    pub message: String,
}

impl fmt::Display for ImpactWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.label(), self.message)
    }
}

// ============================================================================
// Tree
// ============================================================================

/// One object in the impact tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactNode {
    /// Node id
    pub id: String,
    /// Object kind
    pub node_type: NodeType,
    /// Storage size, display only
    pub size: String,
    /// Estimated rows
    pub row_count: u64,
    /// Distance from the target (the root is 0)
    pub depth: usize,
    /// Edge this object was reached through; `None` for the root
    pub arrival: Option<Edge>,
    /// Objects reached from this one, in discovery order
    pub children: Vec<ImpactNode>,
}

/// Result of an impact analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    /// The target and everything depending on it
    pub root: ImpactNode,
    /// Objects below the root
    pub total_affected: usize,
    /// `total_affected` broken down by object kind
    pub affected_by_type: BTreeMap<NodeType, usize>,
    /// Deepest level reached (0 when nothing is affected)
    pub max_depth: usize,
    /// Structural warnings, in discovery order: an object's warnings are
    /// emitted when it is first reached, before anything below it
    pub warnings: Vec<ImpactWarning>,
}

/// Flat tree entry while the DFS is running.
struct Discovered<'g> {
    id: &'g str,
    depth: usize,
    parent: usize,
    arrival: Option<&'g Edge>,
}

/// Build the impact tree rooted at `target_id`.
///
/// Expansion is depth-first in reverse-edge order. An object already
/// reached in this traversal is not expanded again, so each object appears
/// once, at the depth of its first visit. Warnings are emitted when an
/// object is first reached.
///
/// # Errors
///
/// Returns [`Error::NodeNotFound`] if `target_id` is not in the graph.
pub fn build_impact_tree(
    graph: &Graph,
    target_id: &str,
    config: &AnalysisConfig,
) -> Result<ImpactReport> {
    let root = graph
        .node(target_id)
        .ok_or_else(|| Error::NodeNotFound(target_id.to_string()))?;
    let reverse = graph.reverse_adjacency();

    let mut discovered = vec![Discovered {
        id: root.id.as_str(),
        depth: 0,
        parent: 0,
        arrival: None,
    }];
    let mut visited: HashSet<&str> = HashSet::from([root.id.as_str()]);
    let mut warnings = Vec::new();

    // (index into `discovered`, next reverse edge to try)
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
    while let Some((entry, next)) = stack.last_mut() {
        let current = &discovered[*entry];
        let incoming = reverse.get(current.id).map_or(&[][..], Vec::as_slice);
        let Some(&edge) = incoming.get(*next) else {
            stack.pop();
            continue;
        };
        *next += 1;

        let child_id = edge.source_id.as_str();
        if !visited.insert(child_id) {
            continue;
        }

        let depth = current.depth + 1;
        let parent_id = current.id;
        let parent = *entry;
        collect_warnings(graph, edge, parent_id, depth, config, &mut warnings);

        discovered.push(Discovered {
            id: child_id,
            depth,
            parent,
            arrival: Some(edge),
        });
        stack.push((discovered.len() - 1, 0));
    }

    let mut affected_by_type = BTreeMap::new();
    let mut max_depth = 0;
    for entry in discovered.iter().skip(1) {
        max_depth = max_depth.max(entry.depth);
        if let Some(node) = graph.node(entry.id) {
            *affected_by_type.entry(node.node_type).or_insert(0) += 1;
        }
    }
    let total_affected = discovered.len() - 1;

    tracing::debug!(
        target = %target_id,
        total_affected,
        max_depth,
        warnings = warnings.len(),
        "Built impact tree"
    );

    Ok(ImpactReport {
        root: assemble_tree(graph, &discovered),
        total_affected,
        affected_by_type,
        max_depth,
        warnings,
    })
}

fn collect_warnings(
    graph: &Graph,
    edge: &Edge,
    parent_id: &str,
    depth: usize,
    config: &AnalysisConfig,
    warnings: &mut Vec<ImpactWarning>,
) {
    let child_id = edge.source_id.as_str();
    let child = graph.node(child_id);

    if edge.is_cascading_fk() {
        let mut message = format!(
            "Cascade Delete: deleting '{parent_id}' will recursively delete rows in '{child_id}'"
        );
        if let Some(rows) = child
            .map(|c| c.row_count)
            .filter(|&rows| rows > config.large_table_rows)
        {
            message.push_str(&format!(" (~{rows} rows potentially locked/deleted)"));
        }
        message.push('.');
        warnings.push(ImpactWarning {
            severity: Severity::High,
            kind: WarningKind::CascadeDelete,
            node_id: child_id.to_string(),
            message,
        });
    }

    if edge.dep_type == DependencyType::ViewDepends && depth >= config.view_coupling_min_depth {
        warnings.push(ImpactWarning {
            severity: Severity::Medium,
            kind: WarningKind::ViewCoupling,
            node_id: child_id.to_string(),
            message: format!(
                "View Coupling: '{child_id}' is {depth} levels removed but will break on schema change."
            ),
        });
    }

    if edge.dep_type == DependencyType::ForeignKey
        && let (Some(columns), Some(child)) = (edge.fk_columns(), child)
        && !has_covering_index(child, &columns)
    {
        warnings.push(ImpactWarning {
            severity: Severity::Medium,
            kind: WarningKind::MissingIndex,
            node_id: child_id.to_string(),
            message: format!(
                "Missing Index: '{child_id}({})' is not indexed. Cascade/delete operations will be slow.",
                columns.join(",")
            ),
        });
    }
}

/// Turn the pre-order discovery list into a nested tree.
///
/// Children always come after their parent in `discovered`, so walking it
/// backwards finishes every subtree before its parent is taken.
fn assemble_tree(graph: &Graph, discovered: &[Discovered<'_>]) -> ImpactNode {
    let mut slots: Vec<Option<ImpactNode>> = discovered
        .iter()
        .map(|entry| {
            let node = graph.node(entry.id);
            Some(ImpactNode {
                id: entry.id.to_string(),
                node_type: node.map_or(NodeType::Table, |n| n.node_type),
                size: node.map(|n| n.size.clone()).unwrap_or_default(),
                row_count: node.map_or(0, |n| n.row_count),
                depth: entry.depth,
                arrival: entry.arrival.cloned(),
                children: Vec::new(),
            })
        })
        .collect();

    for i in (1..slots.len()).rev() {
        let Some(mut node) = slots[i].take() else {
            continue;
        };
        // Pushed in reverse discovery order below.
        node.children.reverse();
        if let Some(parent) = slots[discovered[i].parent].as_mut() {
            parent.children.push(node);
        }
    }

    let mut root = slots
        .first_mut()
        .and_then(Option::take)
        .unwrap_or_else(|| ImpactNode {
            id: String::new(),
            node_type: NodeType::Table,
            size: String::new(),
            row_count: 0,
            depth: 0,
            arrival: None,
            children: Vec::new(),
        });
    root.children.reverse();
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeleteRule;

    fn fk_graph(edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for (from, to) in edges {
            graph.add_edge(
                "public",
                from,
                "public",
                to,
                DependencyType::ForeignKey,
                None,
                Some(DeleteRule::NoAction),
            );
        }
        graph
    }

    #[test]
    fn downstream_follows_edges_backwards() {
        let graph = fk_graph(&[("a", "b"), ("b", "c"), ("d", "b")]);

        assert_eq!(
            downstream(&graph, &["public.c"]),
            vec!["public.a", "public.b", "public.d"]
        );
        assert_eq!(downstream(&graph, &["public.b"]), vec!["public.a", "public.d"]);
        assert!(downstream(&graph, &["public.a"]).is_empty());
    }

    #[test]
    fn downstream_accepts_multiple_sources() {
        let graph = fk_graph(&[("a", "b"), ("x", "y")]);
        assert_eq!(
            downstream(&graph, &["public.b", "public.y"]),
            vec!["public.a", "public.x"]
        );
    }

    #[test]
    fn downstream_excludes_start_even_on_cycles() {
        let graph = fk_graph(&[("a", "b"), ("b", "a")]);
        assert_eq!(downstream(&graph, &["public.a"]), vec!["public.b"]);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let graph = fk_graph(&[("a", "b")]);
        let err = build_impact_tree(&graph, "public.ghost", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(id) if id == "public.ghost"));
    }

    #[test]
    fn tree_shape_matches_reverse_edges() {
        let graph = fk_graph(&[("a", "b"), ("b", "c"), ("d", "b")]);
        let report = build_impact_tree(&graph, "public.c", &AnalysisConfig::default()).unwrap();

        assert_eq!(report.total_affected, 3);
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.affected_by_type.get(&NodeType::Table), Some(&3));

        let b = &report.root.children[0];
        assert_eq!(b.id, "public.b");
        assert_eq!(b.depth, 1);
        let grandchildren: Vec<&str> = b.children.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(grandchildren, vec!["public.a", "public.d"]);
        assert_eq!(
            b.arrival.as_ref().map(|e| e.target_id.as_str()),
            Some("public.c")
        );
    }

    #[test]
    fn nearer_warnings_come_first() {
        let mut graph = Graph::new();
        for (from, to) in [("a", "b"), ("b", "c")] {
            graph.add_edge(
                "public",
                from,
                "public",
                to,
                DependencyType::ForeignKey,
                None,
                Some(DeleteRule::Cascade),
            );
        }
        let report = build_impact_tree(&graph, "public.c", &AnalysisConfig::default()).unwrap();

        let messages: Vec<&str> = report.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Cascade Delete: deleting 'public.c' will recursively delete rows in 'public.b'.",
                "Cascade Delete: deleting 'public.b' will recursively delete rows in 'public.a'.",
            ]
        );
    }

    #[test]
    fn isolated_target_has_empty_report() {
        let mut graph = Graph::new();
        graph.add_node("public", "solo", NodeType::Table, "", 0);
        let report = build_impact_tree(&graph, "public.solo", &AnalysisConfig::default()).unwrap();

        assert_eq!(report.total_affected, 0);
        assert_eq!(report.max_depth, 0);
        assert!(report.root.children.is_empty());
        assert!(report.warnings.is_empty());
    }
}
