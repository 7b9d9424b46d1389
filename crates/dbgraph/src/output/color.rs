//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success:   green   (clean health checks)
//!   - Warning:   yellow  (medium risk, index misses)
//!   - Error:     red     (cycles, high and critical risk)
//!   - Info:      cyan    (object ids, root tree node)
//!   - Muted:     dimmed  (connectors, edge annotations)
//!   - Emphasis:  bold    (section headers)

use colored::Colorize;
use dbgraph_core::impact::Severity;
use dbgraph_core::{NodeType, RiskLevel};

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
#[must_use]
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
#[must_use]
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
#[must_use]
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
#[must_use]
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Dim text (connectors, secondary details).
#[must_use]
pub fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Bold text (headers).
#[must_use]
pub fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Risk label colored by level.
#[must_use]
pub fn colorize_risk(risk: RiskLevel, config: &OutputConfig) -> String {
    let label = risk.label();
    if !config.use_colors {
        return label.to_string();
    }
    match risk {
        RiskLevel::Low => label.green().to_string(),
        RiskLevel::Medium => label.yellow().to_string(),
        RiskLevel::High => label.red().to_string(),
        RiskLevel::Critical => label.red().bold().to_string(),
    }
}

/// Bracketed severity tag, e.g. `[High]`.
#[must_use]
pub fn severity_tag(severity: Severity, config: &OutputConfig) -> String {
    let tag = format!("[{}]", severity.label());
    match severity {
        Severity::High => error(&tag, config),
        Severity::Medium => warning(&tag, config),
    }
}

/// Marker shown before an object in trees, with ASCII fallback.
#[must_use]
pub fn node_marker(node_type: NodeType, config: &OutputConfig) -> &'static str {
    match (node_type, config.use_ascii) {
        (NodeType::Table, false) => "▪",
        (NodeType::View, false) => "◇",
        (NodeType::Trigger, false) => "⚡",
        (NodeType::Table, true) => "T",
        (NodeType::View, true) => "V",
        (NodeType::Trigger, true) => "!",
    }
}
