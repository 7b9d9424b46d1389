//! God-object detection: nodes with excessive fan-in plus fan-out.
//!
//! This is a plain threshold on degree centrality, not a statistical outlier
//! test. The threshold comes from [`AnalysisConfig::coupling_threshold`].
//!
//! [`AnalysisConfig::coupling_threshold`]: crate::config::AnalysisConfig::coupling_threshold

use serde::Serialize;

use crate::graph::Graph;

/// A node whose combined degree meets the coupling threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GodObject {
    /// Node id
    pub id: String,
    /// `dependents + dependencies`
    pub degree: usize,
    /// Fan-in: objects depending on this one
    pub dependents: usize,
    /// Fan-out: objects this one depends on
    pub dependencies: usize,
}

/// Flag every node whose total degree is at least `threshold`.
///
/// Sorted by descending degree, ties by ascending id.
#[must_use]
pub fn detect_god_objects(graph: &Graph, threshold: usize) -> Vec<GodObject> {
    let mut flagged: Vec<GodObject> = graph
        .degrees()
        .into_iter()
        .filter(|(_, degree)| degree.total() >= threshold)
        .map(|(id, degree)| GodObject {
            id: id.to_string(),
            degree: degree.total(),
            dependents: degree.in_degree,
            dependencies: degree.out_degree,
        })
        .collect();

    flagged.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.id.cmp(&b.id)));
    if !flagged.is_empty() {
        tracing::debug!(count = flagged.len(), threshold, "Detected god objects");
    }
    flagged
}
