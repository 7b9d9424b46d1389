//! Execution plan aggregation.
//!
//! Input is the JSON produced by PostgreSQL's
//! `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`. Only the fields needed for the
//! trace report are modelled; everything else in the document is ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One node of an execution plan tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanNode {
    /// Operator, e.g. "Seq Scan", "Hash Join"
    #[serde(rename = "Node Type")]
    pub node_type: String,
    /// Operator strategy, e.g. "Hashed" for an aggregate
    #[serde(rename = "Strategy", skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Estimated cost before the first row
    #[serde(rename = "Startup Cost")]
    pub startup_cost: f64,
    /// Estimated cost for all rows
    #[serde(rename = "Total Cost")]
    pub total_cost: f64,
    /// Planner row estimate
    #[serde(rename = "Plan Rows")]
    pub plan_rows: f64,
    /// Rows actually produced per loop
    #[serde(rename = "Actual Rows")]
    pub actual_rows: f64,
    /// Number of times the node ran
    #[serde(rename = "Actual Loops")]
    pub actual_loops: f64,

    /// Scanned relation
    #[serde(rename = "Relation Name", skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    /// Schema of the scanned relation
    #[serde(rename = "Schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Query alias of the scanned relation
    #[serde(rename = "Alias", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Index used by an index scan
    #[serde(rename = "Index Name", skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Condition resolved through the index
    #[serde(rename = "Index Cond", skip_serializing_if = "Option::is_none")]
    pub index_cond: Option<String>,
    /// Row filter applied after fetching
    #[serde(rename = "Filter", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Blocks found in shared buffers
    #[serde(rename = "Shared Hit Blocks")]
    pub shared_hit_blocks: u64,
    /// Blocks read from disk into shared buffers
    #[serde(rename = "Shared Read Blocks")]
    pub shared_read_blocks: u64,
    /// Blocks found in local (temp table) buffers
    #[serde(rename = "Local Hit Blocks")]
    pub local_hit_blocks: u64,
    /// Blocks read into local buffers
    #[serde(rename = "Local Read Blocks")]
    pub local_read_blocks: u64,
    /// Blocks read from temporary files
    #[serde(rename = "Temp Read Blocks")]
    pub temp_read_blocks: u64,
    /// Blocks written to temporary files
    #[serde(rename = "Temp Written Blocks")]
    pub temp_written_blocks: u64,

    /// Child operators
    #[serde(rename = "Plans", skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PlanNode>,
}

impl PlanNode {
    /// Whether this node reads a whole relation sequentially.
    #[must_use]
    pub fn is_seq_scan(&self) -> bool {
        self.node_type == "Seq Scan"
    }

    /// One-line description: operator, strategy, relation and alias.
    ///
    /// `Hash Join`, `Aggregate (Hashed)`, `Seq Scan on users u`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut desc = self.node_type.clone();
        if let Some(strategy) = self.strategy.as_deref().filter(|s| !s.is_empty()) {
            desc.push_str(" (");
            desc.push_str(strategy);
            desc.push(')');
        }
        if let Some(relation) = self.relation_name.as_deref().filter(|r| !r.is_empty()) {
            desc.push_str(" on ");
            desc.push_str(relation);
            if let Some(alias) = self
                .alias
                .as_deref()
                .filter(|a| !a.is_empty() && *a != relation)
            {
                desc.push(' ');
                desc.push_str(alias);
            }
        }
        desc
    }
}

/// Top-level `EXPLAIN` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainOutput {
    /// Root of the plan tree
    #[serde(rename = "Plan")]
    pub plan: Option<PlanNode>,
    /// Milliseconds spent planning
    #[serde(rename = "Planning Time")]
    pub planning_time: f64,
    /// Milliseconds spent executing
    #[serde(rename = "Execution Time")]
    pub execution_time: f64,
}

/// Parse `EXPLAIN` JSON output.
///
/// PostgreSQL wraps the document in a one-element array; a bare object is
/// accepted too. An empty array yields a document without a plan.
///
/// # Errors
///
/// Returns [`Error::Json`] if the text is not a valid plan document.
pub fn parse_explain(json: &str) -> Result<ExplainOutput> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let document = match value {
        serde_json::Value::Array(items) => match items.into_iter().next() {
            Some(first) => serde_json::from_value(first)?,
            None => ExplainOutput::default(),
        },
        other => serde_json::from_value(other)?,
    };
    Ok(document)
}

/// Read and parse an `EXPLAIN` JSON file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, or [`Error::Json`] if
/// it does not parse.
pub fn load_explain(path: &Path) -> Result<ExplainOutput> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_explain(&text)
}

/// Whether the buffers touched by a query were already in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// Every block came from shared buffers
    Warm,
    /// At least one block needed physical I/O
    Cold,
    /// No block activity was recorded
    Idle,
}

/// Aggregated timing and I/O for one traced query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    /// Milliseconds spent planning
    pub planning_time: f64,
    /// Milliseconds spent executing
    pub execution_time: f64,
    /// `planning_time + execution_time`
    pub total_time: f64,
    /// Shared hit blocks summed over the whole tree
    pub cache_hits: u64,
    /// Shared read blocks summed over the whole tree
    pub disk_reads: u64,
    /// The plan tree, if the document had one
    pub root: Option<PlanNode>,
}

impl TraceResult {
    /// Summarize a parsed `EXPLAIN` document.
    #[must_use]
    pub fn aggregate(output: ExplainOutput) -> Self {
        let mut cache_hits = 0;
        let mut disk_reads = 0;

        let mut pending: Vec<&PlanNode> = output.plan.iter().collect();
        while let Some(node) = pending.pop() {
            cache_hits += node.shared_hit_blocks;
            disk_reads += node.shared_read_blocks;
            pending.extend(&node.plans);
        }

        tracing::debug!(cache_hits, disk_reads, "Aggregated plan buffers");

        Self {
            planning_time: output.planning_time,
            execution_time: output.execution_time,
            total_time: output.planning_time + output.execution_time,
            cache_hits,
            disk_reads,
            root: output.plan,
        }
    }

    /// Percentage of blocks served from shared buffers, 0 when idle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.disk_reads;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64 * 100.0
        }
    }

    /// Warm, cold, or idle.
    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        if self.disk_reads > 0 {
            CacheState::Cold
        } else if self.cache_hits > 0 {
            CacheState::Warm
        } else {
            CacheState::Idle
        }
    }

    /// Every sequential scan in the plan, in pre-order.
    #[must_use]
    pub fn seq_scans(&self) -> Vec<&PlanNode> {
        let mut found = Vec::new();
        let mut pending: Vec<&PlanNode> = self.root.iter().collect();
        while let Some(node) = pending.pop() {
            if node.is_seq_scan() {
                found.push(node);
            }
            pending.extend(node.plans.iter().rev());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"[{
        "Plan": {
            "Node Type": "Hash Join",
            "Startup Cost": 1.5, "Total Cost": 40.25,
            "Plan Rows": 100, "Actual Rows": 97, "Actual Loops": 1,
            "Shared Hit Blocks": 10, "Shared Read Blocks": 1,
            "Plans": [
                {
                    "Node Type": "Seq Scan", "Relation Name": "orders", "Alias": "o",
                    "Filter": "(total > 10)",
                    "Shared Hit Blocks": 3, "Shared Read Blocks": 0
                },
                {
                    "Node Type": "Hash",
                    "Shared Hit Blocks": 2, "Shared Read Blocks": 4,
                    "Plans": [{
                        "Node Type": "Index Scan", "Relation Name": "users", "Alias": "users",
                        "Index Name": "users_pkey", "Index Cond": "(id = o.user_id)"
                    }]
                }
            ]
        },
        "Planning Time": 0.25,
        "Execution Time": 1.5,
        "Triggers": []
    }]"#;

    #[test]
    fn buffers_are_summed_over_the_tree() {
        let trace = TraceResult::aggregate(parse_explain(NESTED).unwrap());
        assert_eq!(trace.cache_hits, 15);
        assert_eq!(trace.disk_reads, 5);
        assert!((trace.total_time - 1.75).abs() < f64::EPSILON);
        assert_eq!(trace.cache_state(), CacheState::Cold);
        assert!((trace.cache_hit_ratio() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn absent_plan_contributes_nothing() {
        let trace = TraceResult::aggregate(
            parse_explain(r#"{"Planning Time": 0.1, "Execution Time": 0.2}"#).unwrap(),
        );
        assert_eq!(trace.cache_hits, 0);
        assert_eq!(trace.disk_reads, 0);
        assert!(trace.root.is_none());
        assert_eq!(trace.cache_state(), CacheState::Idle);
        assert!(trace.cache_hit_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn empty_array_is_an_empty_document() {
        assert_eq!(parse_explain("[]").unwrap(), ExplainOutput::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_explain("{not json"), Err(Error::Json(_))));
        assert!(matches!(
            parse_explain(r#"{"Plan": {"Node Type": 7}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn warm_when_everything_hits() {
        let trace = TraceResult::aggregate(
            parse_explain(r#"{"Plan": {"Node Type": "Result", "Shared Hit Blocks": 4}}"#).unwrap(),
        );
        assert_eq!(trace.cache_state(), CacheState::Warm);
    }

    #[test]
    fn describe_includes_relation_and_distinct_alias() {
        let trace = TraceResult::aggregate(parse_explain(NESTED).unwrap());
        let root = trace.root.as_ref().unwrap();
        assert_eq!(root.describe(), "Hash Join");
        assert_eq!(root.plans[0].describe(), "Seq Scan on orders o");
        assert_eq!(root.plans[1].plans[0].describe(), "Index Scan on users");

        let aggregate = PlanNode {
            node_type: "Aggregate".to_string(),
            strategy: Some("Hashed".to_string()),
            ..PlanNode::default()
        };
        assert_eq!(aggregate.describe(), "Aggregate (Hashed)");
    }

    #[test]
    fn seq_scans_are_found_in_preorder() {
        let trace = TraceResult::aggregate(parse_explain(NESTED).unwrap());
        let scans: Vec<_> = trace
            .seq_scans()
            .iter()
            .map(|n| n.relation_name.as_deref())
            .collect();
        assert_eq!(scans, vec![Some("orders")]);
    }
}
