//! Circular dependency detection with Tarjan's strongly connected components.
//!
//! A strongly connected component (SCC) with more than one node, or a single
//! node with an edge to itself, is a genuine cycle. Single-node SCCs without
//! a self-loop are not reported.
//!
//! The algorithm runs in O(V + E) with an index counter, low-link values,
//! and an explicit component stack with membership flags. The DFS itself
//! also runs on an explicit call stack: recursion depth would otherwise be
//! bounded only by schema size.

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::Graph;

/// A group of objects that depend on each other circularly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Member node ids, ascending
    pub nodes: Vec<String>,
}

impl Cycle {
    /// Number of objects in the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cycle has no members (never true for a reported cycle).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Per-vertex Tarjan bookkeeping.
#[derive(Clone, Copy, Default)]
struct VertexState {
    index: Option<usize>,
    low_link: usize,
    on_stack: bool,
}

/// Find every circular dependency group in `graph`.
///
/// DFS roots are taken in ascending id order and neighbours in edge
/// insertion order, so the output is deterministic. Cycles are listed in the
/// order Tarjan's algorithm completes them.
#[must_use]
pub fn find_cycles(graph: &Graph) -> Vec<Cycle> {
    let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
    let position: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut self_loop = vec![false; ids.len()];
    for (v, id) in ids.iter().enumerate() {
        for edge in graph.outgoing(id) {
            // Endpoints always exist; the guard keeps the function total.
            let Some(&w) = position.get(edge.target_id.as_str()) else {
                continue;
            };
            if w == v {
                self_loop[v] = true;
            }
            adjacency[v].push(w);
        }
    }

    let mut state = vec![VertexState::default(); ids.len()];
    let mut component_stack: Vec<usize> = Vec::new();
    let mut next_index = 0;
    let mut cycles = Vec::new();

    for root in 0..ids.len() {
        if state[root].index.is_some() {
            continue;
        }

        // Call stack frames: (vertex, position in its adjacency list)
        let mut call_stack: Vec<(usize, usize)> = Vec::new();
        visit(root, &mut state, &mut component_stack, &mut next_index);
        call_stack.push((root, 0));

        while let Some((v, next)) = call_stack.last_mut() {
            let v = *v;
            if let Some(&w) = adjacency[v].get(*next) {
                *next += 1;
                match state[w].index {
                    None => {
                        visit(w, &mut state, &mut component_stack, &mut next_index);
                        call_stack.push((w, 0));
                    }
                    Some(w_index) if state[w].on_stack => {
                        state[v].low_link = state[v].low_link.min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                state[parent].low_link = state[parent].low_link.min(state[v].low_link);
            }

            if state[v].index == Some(state[v].low_link) {
                let mut members = Vec::new();
                while let Some(w) = component_stack.pop() {
                    state[w].on_stack = false;
                    members.push(w);
                    if w == v {
                        break;
                    }
                }

                if members.len() > 1 || self_loop[v] {
                    let mut nodes: Vec<String> =
                        members.iter().map(|&m| ids[m].to_string()).collect();
                    nodes.sort();
                    tracing::debug!(size = nodes.len(), first = %nodes[0], "Found cycle");
                    cycles.push(Cycle { nodes });
                }
            }
        }
    }

    cycles
}

fn visit(
    v: usize,
    state: &mut [VertexState],
    component_stack: &mut Vec<usize>,
    next_index: &mut usize,
) {
    state[v] = VertexState {
        index: Some(*next_index),
        low_link: *next_index,
        on_stack: true,
    };
    *next_index += 1;
    component_stack.push(v);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyType, NodeType};

    fn graph_with(edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for (from, to) in edges {
            graph.add_edge(
                "public",
                from,
                "public",
                to,
                DependencyType::ForeignKey,
                None,
                None,
            );
        }
        graph
    }

    #[test]
    fn three_node_ring_is_one_cycle() {
        let graph = graph_with(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["public.a", "public.b", "public.c"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = graph_with(&[("categories", "categories")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["public.categories"]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = graph_with(&[("a", "b"), ("b", "c"), ("a", "c"), ("d", "c")]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn empty_graph_has_no_cycles() {
        assert!(find_cycles(&Graph::new()).is_empty());
    }

    #[test]
    fn separate_cycles_are_reported_separately() {
        let graph = graph_with(&[
            ("a", "b"),
            ("b", "a"),
            ("b", "c"),
            ("c", "d"),
            ("d", "e"),
            ("e", "c"),
        ]);

        let mut cycles: Vec<Vec<String>> = find_cycles(&graph).into_iter().map(|c| c.nodes).collect();
        cycles.sort();
        assert_eq!(
            cycles,
            vec![
                vec!["public.a".to_string(), "public.b".to_string()],
                vec![
                    "public.c".to_string(),
                    "public.d".to_string(),
                    "public.e".to_string()
                ],
            ]
        );
    }

    #[test]
    fn isolated_nodes_are_not_cycles() {
        let mut graph = graph_with(&[("a", "b")]);
        graph.add_node("public", "solo", NodeType::View, "", 0);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("t{i:05}")).collect();
        let mut graph = Graph::new();
        for pair in names.windows(2) {
            graph.add_edge(
                "public",
                &pair[0],
                "public",
                &pair[1],
                DependencyType::ForeignKey,
                None,
                None,
            );
        }
        graph.add_edge(
            "public",
            &names[names.len() - 1],
            "public",
            &names[0],
            DependencyType::ForeignKey,
            None,
            None,
        );

        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 50_000);
    }
}
