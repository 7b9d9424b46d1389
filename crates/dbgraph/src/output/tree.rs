//! Tree rendering with ASCII/Unicode connectors.
//!
//! Renders any [`TreeNode`] like:
//! ```text
//! public.users (800 rows)
//! ├── public.orders
//! │   └── public.v_order_totals
//! └── public.v_users
//! ```
//!
//! Labels may span several lines; continuation lines are indented under the
//! node they belong to. Rendering walks an explicit stack, so tree depth is
//! not limited by the native stack.

use std::io::{self, Write};

use super::OutputConfig;
use super::color::dimmed;

/// Anything that can be drawn as a tree.
pub trait TreeNode: Sized {
    /// Children in display order.
    fn children(&self) -> &[Self];
}

impl TreeNode for dbgraph_core::ImpactNode {
    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl TreeNode for dbgraph_core::PlanNode {
    fn children(&self) -> &[Self] {
        &self.plans
    }
}

struct Connectors {
    branch: &'static str,
    corner: &'static str,
    pipe: &'static str,
    space: &'static str,
}

impl Connectors {
    fn for_config(config: &OutputConfig) -> Self {
        if config.use_ascii {
            Self {
                branch: "|-- ",
                corner: "`-- ",
                pipe: "|   ",
                space: "    ",
            }
        } else {
            Self {
                branch: "├── ",
                corner: "└── ",
                pipe: "│   ",
                space: "    ",
            }
        }
    }
}

/// Write `root` and all of its descendants.
///
/// `label` renders one node; extra lines in its output are indented under
/// that node.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_tree<W, N, F>(w: &mut W, root: &N, config: &OutputConfig, label: F) -> io::Result<()>
where
    W: Write,
    N: TreeNode,
    F: Fn(&N) -> String,
{
    let connectors = Connectors::for_config(config);

    let root_label = label(root);
    let mut lines = root_label.lines();
    writeln!(w, "{}", lines.next().unwrap_or_default())?;
    for line in lines {
        writeln!(w, "  {line}")?;
    }

    // One frame per level: the sibling list and the next sibling to draw.
    let mut stack: Vec<(&[N], usize)> = vec![(root.children(), 0)];
    // For each level below the root: whether that ancestor has siblings left.
    let mut segments: Vec<bool> = Vec::new();

    while let Some(frame) = stack.last_mut() {
        let (siblings, next) = *frame;
        let Some(child) = siblings.get(next) else {
            stack.pop();
            segments.pop();
            continue;
        };
        frame.1 += 1;
        let is_last = next + 1 == siblings.len();

        let mut prefix = String::new();
        for &has_more in &segments {
            prefix.push_str(if has_more {
                connectors.pipe
            } else {
                connectors.space
            });
        }
        let connector = if is_last {
            connectors.corner
        } else {
            connectors.branch
        };
        let continuation = format!(
            "{prefix}{}",
            if is_last {
                connectors.space
            } else {
                connectors.pipe
            }
        );

        let child_label = label(child);
        let mut lines = child_label.lines();
        writeln!(
            w,
            "{}{}",
            dimmed(&format!("{prefix}{connector}"), config),
            lines.next().unwrap_or_default()
        )?;
        for line in lines {
            writeln!(w, "{}  {line}", dimmed(&continuation, config))?;
        }

        if !child.children().is_empty() {
            segments.push(!is_last);
            stack.push((child.children(), 0));
        }
    }

    Ok(())
}
