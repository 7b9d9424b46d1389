//! Common display utilities for CLI commands.

use std::io::{self, Write};

use anyhow::Result;
use dbgraph_core::{Cycle, DependencyType, Edge, NodeType};
use serde::Serialize;

use crate::output::{OutputConfig, OutputMode, color, write_json};

/// Entries shown in capped lists (isolated groups, index misses).
pub const MAX_DISPLAY_ITEMS: usize = 5;

/// Outcome of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Critical,
}

/// Colored status marker with ASCII fallback.
pub fn status_marker(status: Status, config: &OutputConfig) -> String {
    let marker = match (status, config.use_ascii) {
        (Status::Ok, false) => "✔",
        (Status::Warn, false) => "⚠",
        (Status::Critical, false) => "✖",
        (Status::Ok, true) => "[ok]",
        (Status::Warn, true) => "[!]",
        (Status::Critical, true) => "[!!]",
    };
    match status {
        Status::Ok => color::success(marker, config),
        Status::Warn => color::warning(marker, config),
        Status::Critical => color::error(marker, config),
    }
}

/// `a -> b -> c -> a`
pub fn format_cycle(cycle: &Cycle) -> String {
    let mut path: Vec<&str> = cycle.nodes.iter().map(String::as_str).collect();
    if let Some(first) = path.first().copied() {
        path.push(first);
    }
    path.join(" -> ")
}

/// How a dependent reached its parent in an impact tree.
pub fn edge_annotation(edge: &Edge) -> String {
    match edge.dep_type {
        DependencyType::ForeignKey => {
            let mut text = match edge.constraint_name.as_deref() {
                Some(name) => format!("[FK: {name}]"),
                None => "[FK]".to_string(),
            };
            if edge.is_cascading_fk() {
                text.push_str(" (CASCADE)");
            }
            text
        }
        DependencyType::ViewDepends => "(View)".to_string(),
        DependencyType::TriggerAction => "(Trigger)".to_string(),
        DependencyType::Inheritance => "(Inherits)".to_string(),
    }
}

/// Row cell for tables: `-` for triggers and for views without an estimate.
pub fn rows_cell(node_type: NodeType, rows: u64) -> String {
    match node_type {
        NodeType::Trigger => "-".to_string(),
        NodeType::View if rows == 0 => "-".to_string(),
        _ => rows.to_string(),
    }
}

/// `4 tables, 1 view`
pub fn count_by_type<'a>(counts: impl IntoIterator<Item = (&'a NodeType, &'a usize)>) -> String {
    counts
        .into_iter()
        .map(|(node_type, &count)| {
            let noun = node_type.as_str().to_lowercase();
            if count == 1 {
                format!("{count} {noun}")
            } else {
                format!("{count} {noun}s")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write `text` wrapped to the output width, continuation lines indented.
pub fn write_wrapped<W: Write>(
    w: &mut W,
    indent: &str,
    text: &str,
    config: &OutputConfig,
) -> io::Result<()> {
    let width = config.wrap_width().saturating_sub(indent.len() + 2).max(20);
    for (i, line) in crate::output::wrap_text(text, width).iter().enumerate() {
        if i == 0 {
            writeln!(w, "{indent}{line}")?;
        } else {
            writeln!(w, "{indent}  {line}")?;
        }
    }
    Ok(())
}

/// Send a report to stdout as JSON or through `render`.
pub fn emit<T, F>(mode: OutputMode, report: &T, render: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut io::StdoutLock<'static>, &T) -> io::Result<()>,
{
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut handle, report)?,
        OutputMode::Text => render(&mut handle, report)?,
    }
    handle.flush()?;
    Ok(())
}
