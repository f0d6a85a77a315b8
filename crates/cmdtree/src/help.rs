//! Generated usage and help text
//!
//! The block for a command is, in order: the usage line, the version (root
//! only), the description, the flag listing and, for branches, a table of
//! subcommands in declaration order. Output depends only on the tree and
//! the flag set, never on hashing or terminal width.

use crate::command::Node;
use crate::flags::FlagSet;

/// Spaces between aligned columns
const COLUMN_PADDING: usize = 4;

/// The part of a usage line after the command path: `[flags...]` when the
/// command has flags, then the leaf's argument usage or `<subcmd>`.
pub fn usage_line<S>(node: &Node<S>, flag_count: usize) -> String {
    let mut parts = Vec::new();
    if flag_count > 0 {
        parts.push("[flags...]");
    }
    match node {
        Node::Leaf(leaf) => {
            if !leaf.spec().usage().is_empty() {
                parts.push(leaf.spec().usage());
            }
        }
        Node::Branch(_) => parts.push("<subcmd>"),
    }
    parts.join(" ")
}

/// Render the full help block for `node`. `version` is shown when given,
/// which the dispatcher only does for the root.
pub fn render<S>(node: &Node<S>, flags: &FlagSet, full_path: &str, version: Option<&str>) -> String {
    let mut b = String::new();

    b.push_str("Usage:\n\t");
    b.push_str(full_path);
    let usage = usage_line(node, flags.len());
    if !usage.is_empty() {
        b.push(' ');
        b.push_str(&usage);
    }
    b.push('\n');

    if let Some(version) = version {
        b.push_str(&format!("\nVersion: {}\n", version));
    }

    let desc = node.spec().desc();
    if !desc.is_empty() {
        b.push_str(&format!("\n{}\n", desc));
    }

    if !flags.is_empty() {
        b.push_str("\nFlags:\n");
        flags.write_defaults(&mut b);
    }

    if let Node::Branch(branch) = node {
        b.push_str("\nSubcommands:\n");

        let rows: Vec<Vec<String>> = branch
            .children()
            .map(|child| {
                // The child's own flag count decides its `[flags...]` marker
                let child_flags = child
                    .spec()
                    .flag_set(&format!("{} {}", full_path, child.name()));

                let mut row = vec![
                    format!("  {}", child.name()),
                    usage_line(child, child_flags.len()),
                ];
                let summary = child.spec().summary();
                if !summary.is_empty() {
                    row.push(summary.to_string());
                }
                row
            })
            .collect();

        b.push_str(&align(&rows, COLUMN_PADDING));
    }

    b
}

/// Lay rows of cells out in columns. Every cell except the last one in its
/// row is padded to the widest cell of its column within the run of adjacent
/// rows that also continue past that column; last cells are written as is,
/// and trailing empty cells are dropped.
fn align(rows: &[Vec<String>], padding: usize) -> String {
    let columns = rows
        .iter()
        .map(|row| row.len().saturating_sub(1))
        .max()
        .unwrap_or(0);

    let mut widths: Vec<Vec<usize>> = rows
        .iter()
        .map(|row| vec![0; row.len().saturating_sub(1)])
        .collect();

    for col in 0..columns {
        let continues = |row: &Vec<String>| row.len() > col + 1;

        let mut start = 0;
        while start < rows.len() {
            if !continues(&rows[start]) {
                start += 1;
                continue;
            }

            let mut end = start;
            while end < rows.len() && continues(&rows[end]) {
                end += 1;
            }

            let width = rows[start..end]
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
                + padding;
            for w in &mut widths[start..end] {
                w[col] = width;
            }

            start = end;
        }
    }

    let mut out = String::new();
    for (row, widths) in rows.iter().zip(&widths) {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(cell);
            if row[i + 1..].iter().all(String::is_empty) {
                break;
            }
            if let Some(width) = widths.get(i) {
                let pad = width.saturating_sub(cell.chars().count());
                out.extend(std::iter::repeat(' ').take(pad));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandSpec, Tree};
    use crate::context::ExecutionContext;

    fn noop(_: &ExecutionContext<'_>, _: &[String]) -> i32 {
        0
    }

    fn sample() -> Tree {
        Tree::branch(
            CommandSpec::new("app")
                .description("my awesome description.")
                .flags(|f| {
                    f.int("fail", 0, "exit with given status");
                }),
            |c| {
                c.leaf(
                    CommandSpec::new("ls")
                        .args_usage("<dir>")
                        .description("my super awesome desc.\nmore detail")
                        .flags(|f| {
                            f.bool("l", false, "long declaration");
                        }),
                    noop,
                )?
                .leaf(CommandSpec::new("version-check"), noop)?
                .branch(CommandSpec::new("db").description("Database tools"), |db| {
                    db.leaf(CommandSpec::new("migrate"), noop)?;
                    Ok(())
                })?;
                Ok(())
            },
        )
        .unwrap()
    }

    #[test]
    fn test_usage_line() {
        let tree = sample();
        let Node::Branch(root) = tree.root() else {
            panic!("root should be a branch");
        };
        assert_eq!(usage_line(tree.root(), 0), "<subcmd>");
        assert_eq!(usage_line(tree.root(), 2), "[flags...] <subcmd>");

        let ls = root.child("ls").unwrap();
        assert_eq!(usage_line(ls, 1), "[flags...] <dir>");
        assert_eq!(usage_line(ls, 0), "<dir>");

        let bare = root.child("version-check").unwrap();
        assert_eq!(usage_line(bare, 0), "");
    }

    #[test]
    fn test_render_root_block() {
        let tree = sample();
        let mut flags = tree.root().spec().flag_set("app");
        flags.bool("version", false, "Print version and exit.");

        let text = render(tree.root(), &flags, "app", Some("1.2.3"));
        assert_eq!(
            text,
            "Usage:\n\tapp [flags...] <subcmd>\n\
             \nVersion: 1.2.3\n\
             \nmy awesome description.\n\
             \nFlags:\n\
             \x20 -fail int\n    \texit with given status\n\
             \x20 -version\n    \tPrint version and exit.\n\
             \nSubcommands:\n\
             \x20 ls               [flags...] <dir>    my super awesome desc.\n\
             \x20 version-check\n\
             \x20 db               <subcmd>    Database tools\n"
        );
    }

    #[test]
    fn test_render_leaf_block() {
        let tree = sample();
        let Node::Branch(root) = tree.root() else {
            panic!("root should be a branch");
        };
        let ls = root.child("ls").unwrap();
        let flags = ls.spec().flag_set("app ls");

        let text = render(ls, &flags, "app ls", None);
        assert_eq!(
            text,
            "Usage:\n\tapp ls [flags...] <dir>\n\
             \nmy super awesome desc.\nmore detail\n\
             \nFlags:\n\
             \x20 -l\tlong declaration\n"
        );
    }

    #[test]
    fn test_render_minimal_leaf() {
        let tree = Tree::leaf(CommandSpec::new("tool"), noop).unwrap();
        let flags = tree.root().spec().flag_set("tool");
        assert_eq!(render(tree.root(), &flags, "tool", None), "Usage:\n\ttool\n");
    }

    #[test]
    fn test_align_runs() {
        let rows = vec![
            vec!["  a".to_string(), "x".to_string(), "one".to_string()],
            vec!["  bbbb".to_string(), "yy".to_string()],
            vec!["  c".to_string(), "zzz".to_string(), "three".to_string()],
        ];
        assert_eq!(
            align(&rows, 4),
            "  a       x    one\n  bbbb    yy\n  c       zzz    three\n"
        );
    }
}
