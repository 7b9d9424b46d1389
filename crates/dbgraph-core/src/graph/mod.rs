//! In-memory schema dependency graph.
//!
//! The graph is built once per analysis from introspection results, then
//! handed by shared reference to every analyzer. Construction (`&mut Graph`)
//! and analysis (`&Graph`) are sequential phases.
//!
//! ## Edge Direction
//!
//! Edges point from **dependent -> dependency**: an `orders -> users` foreign
//! key edge means `orders` depends on `users`. Impact analysis therefore
//! walks edges backwards.
//!
//! Both maps are ordered by node id so that every traversal that iterates
//! them is deterministic.

mod types;

pub use types::{DeleteRule, DependencyType, Edge, FK_COLUMNS_KEY, Node, NodeType, node_id};

use std::collections::BTreeMap;

/// Fan-in and fan-out of a single node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    /// Edges terminating at the node (objects that depend on it)
    pub in_degree: usize,
    /// Edges originating from the node (objects it depends on)
    pub out_degree: usize,
}

impl Degree {
    /// Degree centrality: `in + out`.
    #[must_use]
    pub fn total(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Adjacency-list graph of database objects.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Vec<Edge>>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or backfill an existing one.
    ///
    /// Re-adding an existing id only fills a previously empty `size` or a
    /// zero `row_count`; populated fields are never overwritten. This lets
    /// placeholder nodes created by [`Graph::add_edge`] pick up real
    /// statistics later.
    pub fn add_node(
        &mut self,
        schema: &str,
        name: &str,
        node_type: NodeType,
        size: &str,
        row_count: u64,
    ) {
        let id = node_id(schema, name);
        match self.nodes.get_mut(&id) {
            Some(existing) => {
                if existing.size.is_empty() && !size.is_empty() {
                    existing.size = size.to_string();
                }
                if existing.row_count == 0 && row_count != 0 {
                    existing.row_count = row_count;
                }
            }
            None => {
                tracing::trace!(node = %id, %node_type, "Adding node");
                self.nodes
                    .insert(id, Node::new(schema, name, node_type, size, row_count));
            }
        }
    }

    /// Record an index's covered columns on an existing node.
    ///
    /// Unknown nodes are ignored.
    pub fn add_index<S: AsRef<str>>(&mut self, schema: &str, name: &str, columns: &[S]) {
        let id = node_id(schema, name);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.indexes
                .push(columns.iter().map(|c| c.as_ref().to_string()).collect());
        } else {
            tracing::debug!(node = %id, "Ignoring index on unknown object");
        }
    }

    /// Append a dependency edge `source -> target`.
    ///
    /// Missing endpoints are created as placeholder tables, so edges can be
    /// inserted before the objects they reference. Duplicates are not
    /// filtered here. Returns the new edge so callers can attach metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(
        &mut self,
        source_schema: &str,
        source_name: &str,
        target_schema: &str,
        target_name: &str,
        dep_type: DependencyType,
        constraint_name: Option<&str>,
        delete_rule: Option<DeleteRule>,
    ) -> &mut Edge {
        self.add_node(source_schema, source_name, NodeType::Table, "", 0);
        self.add_node(target_schema, target_name, NodeType::Table, "", 0);

        let source_id = node_id(source_schema, source_name);
        let edge = Edge {
            source_id: source_id.clone(),
            target_id: node_id(target_schema, target_name),
            dep_type,
            constraint_name: constraint_name.map(str::to_string),
            delete_rule,
            metadata: BTreeMap::new(),
        };

        let outgoing = self.edges.entry(source_id).or_default();
        outgoing.push(edge);
        let last = outgoing.len() - 1;
        &mut outgoing[last]
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Find a node by exact id, falling back to the first node (in id
    /// order) whose bare name matches.
    #[must_use]
    pub fn resolve(&self, target: &str) -> Option<&Node> {
        self.nodes
            .get(target)
            .or_else(|| self.nodes.values().find(|node| node.name == target))
    }

    /// All nodes, in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, counting parallel edges separately.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges leaving `id`, in insertion order.
    #[must_use]
    pub fn outgoing(&self, id: &str) -> &[Edge] {
        self.edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// All edges, grouped by source id (ascending), then in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().flatten()
    }

    /// Fan-in and fan-out for every node.
    ///
    /// Every node appears in the result, including ones with no edges.
    #[must_use]
    pub fn degrees(&self) -> BTreeMap<&str, Degree> {
        let mut degrees: BTreeMap<&str, Degree> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), Degree::default()))
            .collect();

        for edge in self.edges() {
            degrees.entry(&edge.source_id).or_default().out_degree += 1;
            degrees.entry(&edge.target_id).or_default().in_degree += 1;
        }

        degrees
    }

    /// Index from each target id to the edges pointing at it.
    ///
    /// Edges under one target keep global edge order (source id, then
    /// insertion).
    #[must_use]
    pub fn reverse_adjacency(&self) -> BTreeMap<&str, Vec<&Edge>> {
        let mut reverse: BTreeMap<&str, Vec<&Edge>> = BTreeMap::new();
        for edge in self.edges() {
            reverse.entry(&edge.target_id).or_default().push(edge);
        }
        reverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_backfills_but_never_overwrites() {
        let mut graph = Graph::new();
        graph.add_node("public", "users", NodeType::Table, "", 0);
        graph.add_node("public", "users", NodeType::Table, "8 kB", 120);
        graph.add_node("public", "users", NodeType::View, "", 0);
        graph.add_node("public", "users", NodeType::Table, "1 GB", 999);

        let users = graph.node("public.users").unwrap();
        assert_eq!(users.size, "8 kB");
        assert_eq!(users.row_count, 120);
        assert_eq!(users.node_type, NodeType::Table);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn add_edge_creates_placeholder_endpoints() {
        let mut graph = Graph::new();
        graph.add_edge(
            "public",
            "orders",
            "public",
            "users",
            DependencyType::ForeignKey,
            Some("orders_user_fk"),
            Some(DeleteRule::Cascade),
        );

        let users = graph.node("public.users").unwrap();
        assert_eq!(users.node_type, NodeType::Table);
        assert!(users.size.is_empty());
        assert!(graph.contains("public.orders"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn placeholder_picks_up_statistics_later() {
        let mut graph = Graph::new();
        graph.add_edge(
            "public",
            "orders",
            "public",
            "users",
            DependencyType::ForeignKey,
            None,
            None,
        );
        graph.add_node("public", "users", NodeType::Table, "16 kB", 42);

        let users = graph.node("public.users").unwrap();
        assert_eq!(users.size, "16 kB");
        assert_eq!(users.row_count, 42);
    }

    #[test]
    fn add_edge_keeps_duplicates() {
        let mut graph = Graph::new();
        for _ in 0..2 {
            graph.add_edge(
                "public",
                "orders",
                "public",
                "users",
                DependencyType::ForeignKey,
                None,
                None,
            );
        }
        assert_eq!(graph.outgoing("public.orders").len(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn add_edge_returns_handle_for_metadata() {
        let mut graph = Graph::new();
        graph
            .add_edge(
                "public",
                "orders",
                "public",
                "users",
                DependencyType::ForeignKey,
                None,
                None,
            )
            .set_fk_columns(&["user_id"]);

        let edge = &graph.outgoing("public.orders")[0];
        assert_eq!(edge.fk_columns(), Some(vec!["user_id"]));
    }

    #[test]
    fn add_index_ignores_unknown_nodes() {
        let mut graph = Graph::new();
        graph.add_index("public", "ghost", &["id"]);
        assert!(graph.is_empty());

        graph.add_node("public", "users", NodeType::Table, "", 0);
        graph.add_index("public", "users", &["email"]);
        graph.add_index("public", "users", &["tenant_id", "email"]);
        assert_eq!(
            graph.node("public.users").unwrap().indexes,
            vec![
                vec!["email".to_string()],
                vec!["tenant_id".to_string(), "email".to_string()]
            ]
        );
    }

    #[test]
    fn degrees_cover_every_node() {
        let mut graph = Graph::new();
        graph.add_node("public", "lonely", NodeType::Table, "", 0);
        graph.add_edge("public", "a", "public", "b", DependencyType::ForeignKey, None, None);
        graph.add_edge("public", "c", "public", "b", DependencyType::ForeignKey, None, None);

        let degrees = graph.degrees();
        assert_eq!(degrees.len(), 4);
        assert_eq!(degrees["public.lonely"], Degree::default());
        assert_eq!(
            degrees["public.b"],
            Degree {
                in_degree: 2,
                out_degree: 0
            }
        );
        assert_eq!(degrees["public.a"].total(), 1);
    }

    #[test]
    fn resolve_prefers_exact_id_then_bare_name() {
        let mut graph = Graph::new();
        graph.add_node("audit", "users", NodeType::Table, "", 0);
        graph.add_node("public", "users", NodeType::Table, "", 0);

        assert_eq!(graph.resolve("public.users").unwrap().schema, "public");
        // Bare name matches the first id in ascending order.
        assert_eq!(graph.resolve("users").unwrap().schema, "audit");
        assert!(graph.resolve("orders").is_none());
    }

    #[test]
    fn reverse_adjacency_groups_by_target() {
        let mut graph = Graph::new();
        graph.add_edge("public", "a", "public", "b", DependencyType::ForeignKey, None, None);
        graph.add_edge("public", "c", "public", "b", DependencyType::ViewDepends, None, None);
        graph.add_edge("public", "b", "public", "d", DependencyType::ForeignKey, None, None);

        let reverse = graph.reverse_adjacency();
        let into_b: Vec<&str> = reverse["public.b"]
            .iter()
            .map(|e| e.source_id.as_str())
            .collect();
        assert_eq!(into_b, vec!["public.a", "public.c"]);
        assert!(!reverse.contains_key("public.a"));
    }
}
