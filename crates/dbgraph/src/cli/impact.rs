//! `dbgraph impact` command implementation.

use std::io::{self, Write};

use anyhow::Result;
use dbgraph_core::{Error, ImpactNode, ImpactReport, NodeType, build_impact_tree};

use super::Context;
use super::display::{count_by_type, edge_annotation, emit, write_wrapped};
use crate::output::tree::write_tree;
use crate::output::{OutputConfig, color, format_rows, write_rule, write_section};

/// Run the impact command.
pub fn run(ctx: &Context, target: &str) -> Result<()> {
    let graph = ctx.graph()?;
    let node = graph
        .resolve(target)
        .ok_or_else(|| Error::NodeNotFound(target.to_string()))?;
    tracing::debug!(target, resolved = %node.id, "Resolved impact target");

    let report = build_impact_tree(&graph, &node.id, &ctx.analysis)?;
    emit(ctx.mode, &report, |w, r| render(w, r, &ctx.output))
}

/// Render the impact tree and its warnings.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render<W: Write>(w: &mut W, report: &ImpactReport, config: &OutputConfig) -> io::Result<()> {
    let root = &report.root;
    writeln!(
        w,
        "Target: {} ({})",
        color::info(&root.id, config),
        format_rows(root.row_count)
    )?;
    write_rule(w, config)?;

    write_section(w, "IMPACT RADIUS", config)?;
    writeln!(w, "Levels Deep:             {}", report.max_depth)?;
    if report.total_affected == 0 {
        writeln!(w, "Total Affected Objects:  0")?;
    } else {
        writeln!(
            w,
            "Total Affected Objects:  {} ({})",
            report.total_affected,
            count_by_type(&report.affected_by_type)
        )?;
    }

    write_section(w, "TREE VIEW", config)?;
    write_tree(w, root, config, |node| tree_label(node, config))?;

    if !report.warnings.is_empty() {
        write_section(w, "STRUCTURAL WARNINGS", config)?;
        for warning in &report.warnings {
            let tag = color::severity_tag(warning.severity, config);
            write_wrapped(w, "", &format!("{tag} {}", warning.message), config)?;
        }
    }
    Ok(())
}

fn tree_label(node: &ImpactNode, config: &OutputConfig) -> String {
    let Some(edge) = &node.arrival else {
        return format!(
            "{} ({})",
            color::info(&node.id, config),
            format_rows(node.row_count)
        );
    };

    let mut label = format!(
        "{} {}",
        color::node_marker(node.node_type, config),
        node.id
    );
    if node.node_type == NodeType::Table {
        label.push_str(&format!(" ({})", format_rows(node.row_count)));
    }
    label.push(' ');
    label.push_str(&color::dimmed(&edge_annotation(edge), config));
    label
}
