//! Output formatting for CLI commands.
//!
//! Every command renders into a generic `W: Write` so output can be captured
//! in tests with colors switched off.
//!
//! Submodules:
//! - [`color`]: Semantic color helpers that respect [`OutputConfig::use_colors`]
//! - [`tree`]: Tree rendering with ASCII/Unicode connectors

pub mod color;
pub mod tree;

use std::env;
use std::io::{self, Write};

use serde::Serialize;

// ============================================================================
// Output Configuration
// ============================================================================

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 80;

/// Width of the horizontal rules between report sections.
pub const RULE_WIDTH: usize = 80;

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use ASCII-only connectors and markers instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    #[must_use]
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Plain output for tests and pipes: no colors, Unicode connectors.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(DEFAULT_MAX_CONTENT_WIDTH, false, false)
    }

    /// Create an `OutputConfig` by reading environment variables.
    ///
    /// Reads:
    /// - `DBGRAPH_MAX_WIDTH`: Maximum content width (default: 80)
    /// - `DBGRAPH_ASCII`: "1" or "true" for ASCII-only output (default: false)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `DBGRAPH_COLOR`: "0" or "false" to disable colors (default: true)
    #[must_use]
    pub fn from_env() -> Self {
        let max_width = match env::var("DBGRAPH_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => match s.parse() {
                Ok(width) => width,
                Err(_) => {
                    tracing::warn!(
                        env_var = "DBGRAPH_MAX_WIDTH",
                        value = %s,
                        default = DEFAULT_MAX_CONTENT_WIDTH,
                        "Invalid value, using default"
                    );
                    DEFAULT_MAX_CONTENT_WIDTH
                }
            },
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = match env::var("DBGRAPH_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "DBGRAPH_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // NO_COLOR (https://no-color.org/) wins over DBGRAPH_COLOR
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("DBGRAPH_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Wrapping width: the configured maximum, capped by the terminal.
    #[must_use]
    pub fn wrap_width(&self) -> usize {
        self.max_width.min(terminal_width())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// Pretty-printed JSON for programmatic use
    Json,
}

// ============================================================================
// Helpers
// ============================================================================

/// Current terminal width, falling back to a default if detection fails.
fn terminal_width() -> usize {
    terminal_size::terminal_size().map_or(usize::from(DEFAULT_TERMINAL_WIDTH), |(w, _)| {
        usize::from(w.0)
    })
}

/// Wrap text to `max_width`, preserving blank lines.
#[must_use]
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, max_width)
                    .into_iter()
                    .map(std::borrow::Cow::into_owned)
                    .collect()
            }
        })
        .collect()
}

/// Write `value` as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let output = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(w, "{output}")
}

/// Write a horizontal rule.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_rule<W: Write>(w: &mut W, config: &OutputConfig) -> io::Result<()> {
    let ch = if config.use_ascii { "-" } else { "─" };
    writeln!(w, "{}", color::dimmed(&ch.repeat(RULE_WIDTH), config))
}

/// Write a blank line followed by a bold section title.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_section<W: Write>(w: &mut W, title: &str, config: &OutputConfig) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", color::bold(title, config))
}

/// Human-readable row estimate: `950 rows`, `1.2k rows`, `3.4m rows`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_rows(rows: u64) -> String {
    if rows > 1_000_000 {
        format!("{:.1}m rows", rows as f64 / 1_000_000.0)
    } else if rows > 1000 {
        format!("{:.1}k rows", rows as f64 / 1000.0)
    } else {
        format!("{rows} rows")
    }
}
