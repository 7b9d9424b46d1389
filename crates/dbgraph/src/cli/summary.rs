//! `dbgraph summary` command implementation.

use std::io::{self, Write};

use anyhow::Result;
use dbgraph_core::{Graph, NodeRank, RiskLevel, rank_by_centrality};
use serde::Serialize;

use super::Context;
use super::display::{emit, rows_cell};
use crate::output::{OutputConfig, color, write_rule, write_section};

/// One ranked row with its risk label.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    /// Degree statistics
    #[serde(flatten)]
    pub rank: NodeRank,
    /// Coupling risk
    pub risk: RiskLevel,
}

/// Rows shown plus how many were left out.
#[derive(Debug, Serialize)]
pub struct SummaryReport {
    /// Objects in the graph
    pub total: usize,
    /// Top objects by coupling
    pub rows: Vec<SummaryRow>,
}

impl SummaryReport {
    /// Rank `graph` and keep the first `limit` rows (all when `None`).
    #[must_use]
    pub fn build(graph: &Graph, limit: Option<usize>) -> Self {
        let ranking = rank_by_centrality(graph);
        let total = ranking.len();
        let rows = ranking
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|rank| SummaryRow {
                risk: rank.risk(),
                rank,
            })
            .collect();
        Self { total, rows }
    }

    /// Objects not shown.
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.total - self.rows.len()
    }
}

/// Run the summary command.
pub fn run(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let graph = ctx.graph()?;
    let report = SummaryReport::build(&graph, limit);
    emit(ctx.mode, &report, |w, r| render(w, r, &ctx.output))
}

/// Render the ranking table.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render<W: Write>(w: &mut W, report: &SummaryReport, config: &OutputConfig) -> io::Result<()> {
    write_section(w, "ARCHITECTURAL TOPOLOGY (Top Impact)", config)?;
    write_rule(w, config)?;
    writeln!(
        w,
        "{:<30} {:<10} {:<10} {:<10} {:<10} RISK",
        "OBJECT NAME", "TYPE", "IN/OUT", "ROWS", "IMPACT"
    )?;
    write_rule(w, config)?;

    for row in &report.rows {
        let rank = &row.rank;
        writeln!(
            w,
            "{:<30} {:<10} {:<10} {:<10} {:<10} {}",
            rank.id,
            rank.node_type.as_str(),
            format!("{}/{}", rank.in_degree, rank.out_degree),
            rows_cell(rank.node_type, rank.rows),
            rank.centrality,
            color::colorize_risk(row.risk, config)
        )?;
    }

    write_rule(w, config)?;
    if report.hidden() > 0 {
        writeln!(
            w,
            "... and {} more. Use --all or --limit to see more.",
            report.hidden()
        )?;
    }
    Ok(())
}
