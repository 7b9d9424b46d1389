//! `dbgraph trace` command implementation.
//!
//! Reads a plan captured with `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` and
//! reports latency, buffer cache behaviour, and the execution path.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context as _, Result};
use dbgraph_core::trace::load_explain;
use dbgraph_core::{CacheState, PlanNode, TraceResult};
use serde::Serialize;

use super::Context;
use super::display::{Status, emit, status_marker, write_wrapped};
use crate::output::tree::write_tree;
use crate::output::{OutputConfig, color, write_rule, write_section};

/// Trace plus the derived cache verdict.
#[derive(Debug, Serialize)]
pub struct TraceReport {
    /// Aggregated plan statistics
    #[serde(flatten)]
    pub trace: TraceResult,
    /// Percentage of blocks served from shared buffers
    pub cache_hit_ratio: f64,
    /// Warm, cold, or idle
    pub cache_state: CacheState,
}

impl From<TraceResult> for TraceReport {
    fn from(trace: TraceResult) -> Self {
        Self {
            cache_hit_ratio: trace.cache_hit_ratio(),
            cache_state: trace.cache_state(),
            trace,
        }
    }
}

/// Run the trace command.
pub fn run(ctx: &Context, plan: &Path) -> Result<()> {
    let explain =
        load_explain(plan).with_context(|| format!("failed to load plan {}", plan.display()))?;
    let report = TraceReport::from(TraceResult::aggregate(explain));
    emit(ctx.mode, &report, |w, r| render(w, r, &ctx.output))
}

/// Render the trace report.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render<W: Write>(w: &mut W, report: &TraceReport, config: &OutputConfig) -> io::Result<()> {
    let trace = &report.trace;

    write_section(w, "LATENCY", config)?;
    writeln!(w, "Planning Time:   {:.2} ms", trace.planning_time)?;
    writeln!(w, "Execution Time:  {:.2} ms", trace.execution_time)?;
    writeln!(w, "Total Time:      {:.2} ms", trace.total_time)?;

    write_section(w, "I/O (BUFFERS)", config)?;
    writeln!(
        w,
        "Cache Hits:      {}  ({:.1}%)",
        trace.cache_hits, report.cache_hit_ratio
    )?;
    writeln!(w, "Disk Reads:      {}", trace.disk_reads)?;
    match report.cache_state {
        CacheState::Warm => writeln!(
            w,
            "{} Warm: all data was found in shared buffers.",
            status_marker(Status::Ok, config)
        )?,
        CacheState::Cold => writeln!(
            w,
            "{} Cold: physical disk I/O was required.",
            status_marker(Status::Warn, config)
        )?,
        CacheState::Idle => writeln!(
            w,
            "{}",
            color::dimmed(
                "No buffer activity recorded (constant or catalog-only query).",
                config
            )
        )?,
    }

    write_section(w, "EXECUTION PATH", config)?;
    write_rule(w, config)?;
    match &trace.root {
        Some(root) => write_tree(w, root, config, |node| plan_label(node, config))?,
        None => writeln!(w, "{}", color::dimmed("(no plan)", config))?,
    }
    write_rule(w, config)?;

    let seq_scans = trace.seq_scans();
    if !seq_scans.is_empty() {
        write_section(w, "WARNINGS", config)?;
        for scan in seq_scans {
            let relation = scan.relation_name.as_deref().unwrap_or("(unknown relation)");
            let mut message = format!("Seq Scan on '{relation}' reads the whole table");
            if let Some(filter) = &scan.filter {
                message.push_str(&format!("; an index could serve the filter {filter}"));
            }
            message.push('.');
            write_wrapped(
                w,
                "",
                &format!("{} {message}", status_marker(Status::Warn, config)),
                config,
            )?;
        }
    }
    Ok(())
}

fn plan_label(node: &PlanNode, config: &OutputConfig) -> String {
    let mut label = format!(
        "{} {}",
        color::bold(&node.describe(), config),
        color::dimmed(
            &format!(
                "(cost={:.2}..{:.2} rows={:.0})",
                node.startup_cost, node.total_cost, node.plan_rows
            ),
            config
        )
    );
    if let Some(index) = &node.index_name {
        label.push_str(&format!("\nIndex: {index}"));
    }
    if let Some(cond) = &node.index_cond {
        label.push_str(&format!("\nIndex Cond: {cond}"));
    }
    if let Some(filter) = &node.filter {
        label.push_str(&format!("\nFilter: {filter}"));
    }
    label
}
