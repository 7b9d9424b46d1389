//! # dbgraph-core: Schema Dependency Analysis
//!
//! Models a relational database schema as a directed graph of tables,
//! views, and triggers, and answers structural questions about it.
//!
//! ## Design Philosophy
//!
//! - **Plain data in, plain reports out** - analyzers take `&Graph` and return `Serialize` structs
//! - **Total analyzers** - missing metadata is skipped, never an error
//! - **Deterministic** - ordered maps everywhere; ties broken by node id
//! - **No recursion on user data** - deep traversals run on explicit stacks
//!
//! ## Quick Start
//!
//! ```
//! use dbgraph_core::{AnalysisConfig, DependencyType, Graph, analyze_topology, find_cycles};
//!
//! let mut graph = Graph::new();
//! graph.add_edge("public", "orders", "public", "users", DependencyType::ForeignKey, None, None);
//! graph.add_edge("public", "items", "public", "orders", DependencyType::ForeignKey, None, None);
//!
//! let stats = analyze_topology(&graph, &AnalysisConfig::default());
//! assert_eq!(stats.longest_path, 3);
//! assert!(find_cycles(&graph).is_empty());
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod coupling;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod impact;
pub mod index;
pub mod snapshot;
pub mod topology;
pub mod trace;

pub use config::AnalysisConfig;
pub use coupling::{GodObject, detect_god_objects};
pub use cycles::{Cycle, find_cycles};
pub use error::{Error, Result};
pub use graph::{DeleteRule, DependencyType, Edge, Graph, Node, NodeType, node_id};
pub use impact::{ImpactNode, ImpactReport, ImpactWarning, build_impact_tree, downstream};
pub use index::{IndexCoverage, MissingFkIndex, check_index_coverage};
pub use snapshot::SchemaSnapshot;
pub use topology::{GraphStats, NodeRank, RiskLevel, analyze_topology, rank_by_centrality};
pub use trace::{CacheState, ExplainOutput, PlanNode, TraceResult, parse_explain};
