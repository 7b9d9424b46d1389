//! `dbgraph cycles` command implementation.

use std::io::{self, Write};

use anyhow::Result;
use dbgraph_core::{Cycle, find_cycles};

use super::Context;
use super::display::{Status, emit, format_cycle, status_marker};
use crate::output::{OutputConfig, color};

/// Run the cycles command.
pub fn run(ctx: &Context) -> Result<()> {
    let graph = ctx.graph()?;
    let cycles = find_cycles(&graph);
    emit(ctx.mode, &cycles, |w, c| render(w, c, &ctx.output))
}

/// Render the list of cycles.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render<W: Write>(w: &mut W, cycles: &[Cycle], config: &OutputConfig) -> io::Result<()> {
    if cycles.is_empty() {
        return writeln!(
            w,
            "{} No circular dependencies detected.",
            status_marker(Status::Ok, config)
        );
    }

    writeln!(
        w,
        "{} Found {} circular {}:",
        status_marker(Status::Critical, config),
        color::error(&cycles.len().to_string(), config),
        if cycles.len() == 1 {
            "dependency"
        } else {
            "dependencies"
        }
    )?;
    writeln!(w)?;
    for (i, cycle) in cycles.iter().enumerate() {
        writeln!(w, "  {}. {}", i + 1, format_cycle(cycle))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_plain(cycles: &[Cycle]) -> String {
        let mut buf = Vec::new();
        render(&mut buf, cycles, &OutputConfig::plain()).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn no_cycles() {
        assert_eq!(render_plain(&[]), "✔ No circular dependencies detected.\n");
    }

    #[test]
    fn cycles_are_numbered() {
        let cycles = vec![
            Cycle {
                nodes: vec!["public.a".to_string(), "public.b".to_string()],
            },
            Cycle {
                nodes: vec!["public.c".to_string()],
            },
        ];
        assert_eq!(
            render_plain(&cycles),
            "✖ Found 2 circular dependencies:\n\n  \
             1. public.a -> public.b -> public.a\n  \
             2. public.c -> public.c\n"
        );
    }
}
