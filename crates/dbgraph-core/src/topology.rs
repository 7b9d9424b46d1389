//! Topology metrics: density, degree centrality, islands, and chain depth.
//!
//! # Algorithms
//!
//! - **Centrality**: degree centrality (`in + out`), ranked descending with
//!   ties broken by ascending node id.
//! - **Islands**: BFS over an undirected view of the graph counts weakly
//!   connected components; small ones are reported as isolated groups.
//! - **Longest chain**: memoized DFS over outgoing edges with an on-path
//!   marker. A neighbour already on the current path contributes depth 0,
//!   which breaks cycles instead of recursing forever. Runs on an explicit
//!   stack so deep schemas cannot overflow the native one.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::graph::{DependencyType, Graph, NodeType};

/// Centrality above which a node is rated at least [`RiskLevel::Medium`].
const MEDIUM_RISK_CENTRALITY: usize = 5;
/// Centrality above which a node is rated at least [`RiskLevel::High`].
const HIGH_RISK_CENTRALITY: usize = 10;

/// Coarse coupling risk derived from a node's degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Few connections
    Low,
    /// Centrality above 5
    Medium,
    /// Centrality above 10
    High,
    /// Heavily depended upon (> 5 in) while itself depending on others (> 2 out)
    Critical,
}

impl RiskLevel {
    /// Short label for tabular output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MED",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// One node's position in the centrality ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRank {
    /// Node id
    pub id: String,
    /// Object kind
    pub node_type: NodeType,
    /// Objects depending on this one
    pub in_degree: usize,
    /// Objects this one depends on
    pub out_degree: usize,
    /// Estimated rows
    pub rows: u64,
    /// `in_degree + out_degree`
    pub centrality: usize,
}

impl NodeRank {
    /// Classify how risky it is to change this node.
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        if self.in_degree > 5 && self.out_degree > 2 {
            RiskLevel::Critical
        } else if self.centrality > HIGH_RISK_CENTRALITY {
            RiskLevel::High
        } else if self.centrality > MEDIUM_RISK_CENTRALITY {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Topology report for a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    /// Number of nodes
    pub nodes: usize,
    /// Number of edges (parallel edges counted)
    pub edges: usize,
    /// `edges / (nodes * (nodes - 1))`, or 0 for fewer than two nodes
    pub density: f64,
    /// Number of weakly connected components
    pub components: usize,
    /// Highest degree centrality
    pub max_centrality: usize,
    /// First node in ranking order at `max_centrality`; `None` without edges
    pub central_node: Option<String>,
    /// Longest directed dependency chain, counting nodes
    pub longest_path: usize,
    /// Node ids along one longest chain, dependent first
    pub deepest_chain: Vec<String>,
    /// Nodes with no edges at all
    pub isolated_nodes: Vec<String>,
    /// Components small enough to be worth flagging, members sorted
    pub isolated_groups: Vec<Vec<String>>,
    /// Every node by descending centrality, ties by ascending id
    pub ranking: Vec<NodeRank>,
    /// Node count per object kind
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    /// Edge count per dependency kind
    pub edges_by_type: BTreeMap<DependencyType, usize>,
}

/// Compute every topology metric for `graph`.
#[must_use]
pub fn analyze_topology(graph: &Graph, config: &AnalysisConfig) -> GraphStats {
    let nodes = graph.node_count();
    let edges = graph.edge_count();

    let ranking = rank_by_centrality(graph);
    let (max_centrality, central_node) = match ranking.first() {
        Some(top) if top.centrality > 0 => (top.centrality, Some(top.id.clone())),
        _ => (0, None),
    };

    let islands = find_islands(graph, config.isolated_group_max_size);
    let chain = longest_chain(graph);

    let mut nodes_by_type = BTreeMap::new();
    for node in graph.nodes() {
        *nodes_by_type.entry(node.node_type).or_insert(0) += 1;
    }
    let mut edges_by_type = BTreeMap::new();
    for edge in graph.edges() {
        *edges_by_type.entry(edge.dep_type).or_insert(0) += 1;
    }

    let stats = GraphStats {
        nodes,
        edges,
        density: density(nodes, edges),
        components: islands.components,
        max_centrality,
        central_node,
        longest_path: chain.len(),
        deepest_chain: chain,
        isolated_nodes: islands.isolated_nodes,
        isolated_groups: islands.groups,
        ranking,
        nodes_by_type,
        edges_by_type,
    };

    tracing::debug!(
        nodes = stats.nodes,
        edges = stats.edges,
        components = stats.components,
        longest_path = stats.longest_path,
        "Analyzed topology"
    );
    stats
}

/// Directed-graph density. Zero for fewer than two nodes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn density(nodes: usize, edges: usize) -> f64 {
    if nodes > 1 {
        edges as f64 / (nodes * (nodes - 1)) as f64
    } else {
        0.0
    }
}

/// Rank every node by degree centrality.
#[must_use]
pub fn rank_by_centrality(graph: &Graph) -> Vec<NodeRank> {
    let degrees = graph.degrees();
    let mut ranking: Vec<NodeRank> = graph
        .nodes()
        .map(|node| {
            let degree = degrees.get(node.id.as_str()).copied().unwrap_or_default();
            NodeRank {
                id: node.id.clone(),
                node_type: node.node_type,
                in_degree: degree.in_degree,
                out_degree: degree.out_degree,
                rows: node.row_count,
                centrality: degree.total(),
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.centrality.cmp(&a.centrality).then_with(|| a.id.cmp(&b.id)));
    ranking
}

struct Islands {
    components: usize,
    isolated_nodes: Vec<String>,
    groups: Vec<Vec<String>>,
}

fn find_islands(graph: &Graph, max_group_size: usize) -> Islands {
    let mut undirected: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in graph.edges() {
        undirected
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge.target_id.as_str());
        undirected
            .entry(edge.target_id.as_str())
            .or_default()
            .push(edge.source_id.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut islands = Islands {
        components: 0,
        isolated_nodes: Vec::new(),
        groups: Vec::new(),
    };

    for node in graph.nodes() {
        let start = node.id.as_str();
        if !visited.insert(start) {
            continue;
        }
        islands.components += 1;

        let Some(neighbours) = undirected.get(start) else {
            islands.isolated_nodes.push(start.to_string());
            if max_group_size >= 1 {
                islands.groups.push(vec![start.to_string()]);
            }
            continue;
        };

        let mut members = vec![start];
        let mut queue: VecDeque<&str> = neighbours.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            members.push(current);
            if let Some(next) = undirected.get(current) {
                queue.extend(next.iter().copied().filter(|n| !visited.contains(n)));
            }
        }

        if members.len() <= max_group_size {
            let mut group: Vec<String> = members.into_iter().map(str::to_string).collect();
            group.sort();
            islands.groups.push(group);
        }
    }

    islands
}

/// Frame of the explicit DFS stack used by [`longest_chain`].
struct ChainFrame<'g> {
    node: &'g str,
    next_edge: usize,
    best_depth: usize,
    best_child: Option<&'g str>,
}

/// Longest directed chain in the graph, as node ids from the dependent end.
///
/// Each node's depth is `1 + max(depth of its targets)`, so a leaf is 1.
/// Depths are memoized across starting nodes. A target that is already on
/// the current DFS path contributes 0, so cycles terminate with a finite,
/// possibly under-counted, length.
#[must_use]
pub fn longest_chain(graph: &Graph) -> Vec<String> {
    // node -> (depth, next node on its longest chain)
    let mut memo: HashMap<&str, (usize, Option<&str>)> = HashMap::new();
    let mut on_path: HashSet<&str> = HashSet::new();
    let mut best: Option<(&str, usize)> = None;

    for node in graph.nodes() {
        let start = node.id.as_str();
        if !memo.contains_key(start) {
            on_path.insert(start);
            let mut stack = vec![ChainFrame {
                node: start,
                next_edge: 0,
                best_depth: 0,
                best_child: None,
            }];

            while let Some(frame) = stack.last_mut() {
                let outgoing = graph.outgoing(frame.node);
                if let Some(edge) = outgoing.get(frame.next_edge) {
                    frame.next_edge += 1;
                    let target = edge.target_id.as_str();
                    if let Some(&(depth, _)) = memo.get(target) {
                        if depth > frame.best_depth {
                            frame.best_depth = depth;
                            frame.best_child = Some(target);
                        }
                    } else if on_path.insert(target) {
                        stack.push(ChainFrame {
                            node: target,
                            next_edge: 0,
                            best_depth: 0,
                            best_child: None,
                        });
                    }
                    // else: target is on the current path; contributes 0
                    continue;
                }

                let Some(done) = stack.pop() else { break };
                on_path.remove(done.node);
                let depth = done.best_depth + 1;
                memo.insert(done.node, (depth, done.best_child));
                if let Some(parent) = stack.last_mut()
                    && depth > parent.best_depth
                {
                    parent.best_depth = depth;
                    parent.best_child = Some(done.node);
                }
            }
        }

        if let Some(&(depth, _)) = memo.get(start)
            && best.is_none_or(|(_, best_depth)| depth > best_depth)
        {
            best = Some((start, depth));
        }
    }

    let mut chain = Vec::new();
    let mut cursor = best.map(|(id, _)| id);
    while let Some(id) = cursor {
        chain.push(id.to_string());
        cursor = memo.get(id).and_then(|&(_, next)| next);
    }

    tracing::trace!(length = chain.len(), "Computed longest chain");
    chain
}
