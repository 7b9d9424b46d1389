//! `dbgraph analyze` command implementation.

use std::io::{self, Write};

use anyhow::Result;
use dbgraph_core::{
    AnalysisConfig, Cycle, DependencyType, GodObject, Graph, GraphStats, IndexCoverage, NodeType,
    analyze_topology, check_index_coverage, detect_god_objects, find_cycles,
};
use serde::Serialize;

use super::Context;
use super::display::{MAX_DISPLAY_ITEMS, Status, emit, format_cycle, status_marker, write_wrapped};
use crate::output::{OutputConfig, color, write_rule, write_section};

/// Density above which a schema is described as dense.
const DENSE_THRESHOLD: f64 = 0.1;

/// Everything `analyze` reports.
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    /// Topology metrics
    pub topology: GraphStats,
    /// Circular dependency groups
    pub cycles: Vec<Cycle>,
    /// Foreign-key index hygiene
    pub index_coverage: IndexCoverage,
    /// Over-coupled objects
    pub god_objects: Vec<GodObject>,
}

impl AnalyzeReport {
    /// Run every whole-graph analyzer.
    #[must_use]
    pub fn build(graph: &Graph, config: &AnalysisConfig) -> Self {
        Self {
            topology: analyze_topology(graph, config),
            cycles: find_cycles(graph),
            index_coverage: check_index_coverage(graph),
            god_objects: detect_god_objects(graph, config.coupling_threshold),
        }
    }
}

/// Run the analyze command.
pub fn run(ctx: &Context) -> Result<()> {
    let graph = ctx.graph()?;
    let report = AnalyzeReport::build(&graph, &ctx.analysis);
    emit(ctx.mode, &report, |w, r| render(w, r, &ctx.output))
}

/// Render the full analysis as text.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render<W: Write>(w: &mut W, report: &AnalyzeReport, config: &OutputConfig) -> io::Result<()> {
    let stats = &report.topology;

    writeln!(w, "Objects: {}", stats.nodes)?;
    write_rule(w, config)?;

    write_section(w, "TOPOLOGICAL CONTEXT", config)?;
    writeln!(w, "Graph Type:  Directed Multigraph")?;
    let density_label = if stats.density > DENSE_THRESHOLD {
        "Dense"
    } else {
        "Sparse"
    };
    writeln!(w, "Density:     {:.3} ({density_label})", stats.density)?;
    writeln!(w, "Components:  {} weakly connected", stats.components)?;
    match &stats.central_node {
        Some(id) => writeln!(
            w,
            "Centrality:  {} ({})",
            color::info(id, config),
            stats.max_centrality
        )?,
        None => writeln!(w, "Centrality:  {}", color::dimmed("(no dependencies)", config))?,
    }

    write_section(w, "OBJECT DISTRIBUTION", config)?;
    let count = |t: NodeType| stats.nodes_by_type.get(&t).copied().unwrap_or(0);
    writeln!(w, "Tables:      {}", count(NodeType::Table))?;
    writeln!(w, "Views:       {}", count(NodeType::View))?;
    writeln!(w, "Triggers:    {}", count(NodeType::Trigger))?;

    write_section(w, "DEPENDENCY VECTORS", config)?;
    let edges = |t: DependencyType| stats.edges_by_type.get(&t).copied().unwrap_or(0);
    writeln!(w, "Foreign Keys:      {} edges", edges(DependencyType::ForeignKey))?;
    writeln!(w, "View Definitions:  {} edges", edges(DependencyType::ViewDepends))?;
    writeln!(w, "Trigger Actions:   {} edges", edges(DependencyType::TriggerAction))?;
    writeln!(w, "Inheritance:       {} edges", edges(DependencyType::Inheritance))?;

    write_section(w, "ISOLATED SUB-GRAPHS", config)?;
    if stats.isolated_groups.is_empty() {
        writeln!(w, "{}", color::dimmed("(none)", config))?;
    }
    for (i, group) in stats.isolated_groups.iter().take(MAX_DISPLAY_ITEMS).enumerate() {
        writeln!(w, "{}. {}", i + 1, group.join(", "))?;
    }
    if stats.isolated_groups.len() > MAX_DISPLAY_ITEMS {
        writeln!(
            w,
            "   ... and {} more",
            stats.isolated_groups.len() - MAX_DISPLAY_ITEMS
        )?;
    }

    write_section(w, "SCHEMA LINEAGE DEPTH", config)?;
    writeln!(w, "Deepest Chain:  {} Levels", stats.longest_path)?;
    if stats.deepest_chain.len() > 1 {
        write_wrapped(w, "  ", &stats.deepest_chain.join(" -> "), config)?;
    }

    write_section(w, "SCHEMA HEALTH REPORT", config)?;
    write_rule(w, config)?;
    render_cycles(w, &report.cycles, config)?;
    writeln!(w)?;
    render_index_coverage(w, &report.index_coverage, config)?;
    writeln!(w)?;
    render_coupling(w, &report.god_objects, config)?;
    write_rule(w, config)
}

fn render_cycles<W: Write>(w: &mut W, cycles: &[Cycle], config: &OutputConfig) -> io::Result<()> {
    if cycles.is_empty() {
        return writeln!(
            w,
            "{} No circular dependencies detected.",
            status_marker(Status::Ok, config)
        );
    }

    writeln!(
        w,
        "{} {}: Found {} circular dependencies",
        status_marker(Status::Critical, config),
        color::error("CRITICAL", config),
        cycles.len()
    )?;
    for (i, cycle) in cycles.iter().enumerate() {
        writeln!(w, "   {}. {}", i + 1, format_cycle(cycle))?;
    }
    Ok(())
}

fn render_index_coverage<W: Write>(
    w: &mut W,
    coverage: &IndexCoverage,
    config: &OutputConfig,
) -> io::Result<()> {
    if coverage.total_fks == 0 {
        return writeln!(w, "No foreign keys found to check.");
    }

    if coverage.is_clean() {
        writeln!(
            w,
            "{} Index Hygiene: all {} checkable foreign keys are indexed.",
            status_marker(Status::Ok, config),
            coverage.indexed_fks
        )?;
    } else {
        writeln!(
            w,
            "{} {}: Found {} foreign keys missing indexes",
            status_marker(Status::Warn, config),
            color::warning("PERFORMANCE RISKS", config),
            coverage.missing.len()
        )?;
        for miss in coverage.missing.iter().take(MAX_DISPLAY_ITEMS) {
            writeln!(w, "   - {miss}")?;
        }
        if coverage.missing.len() > MAX_DISPLAY_ITEMS {
            writeln!(
                w,
                "   ... and {} more",
                coverage.missing.len() - MAX_DISPLAY_ITEMS
            )?;
        }
        write_wrapped(
            w,
            "   ",
            "(Suggestion: index the foreign-key columns to avoid sequential scans and long locks on delete)",
            config,
        )?;
    }

    if coverage.unknown_column_fks > 0 {
        writeln!(
            w,
            "   {}",
            color::dimmed(
                &format!(
                    "{} foreign keys skipped (column list unknown)",
                    coverage.unknown_column_fks
                ),
                config
            )
        )?;
    }
    Ok(())
}

fn render_coupling<W: Write>(
    w: &mut W,
    god_objects: &[GodObject],
    config: &OutputConfig,
) -> io::Result<()> {
    if god_objects.is_empty() {
        return writeln!(
            w,
            "{} Architecture: no god objects detected.",
            status_marker(Status::Ok, config)
        );
    }

    writeln!(
        w,
        "{} {}: Found {} god objects (high coupling)",
        status_marker(Status::Warn, config),
        color::warning("COMPLEXITY RISKS", config),
        god_objects.len()
    )?;
    for god in god_objects {
        writeln!(
            w,
            "   - {} (connected to {} others: {} in, {} out)",
            god.id, god.degree, god.dependents, god.dependencies
        )?;
    }
    write_wrapped(
        w,
        "   ",
        "(Suggestion: consider splitting these objects to reduce coupling)",
        config,
    )
}
