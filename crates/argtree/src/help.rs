//! Usage text for `--help` and roff man pages.

use std::collections::BTreeMap;
use std::path::Path;

use crate::param::Arity;
use crate::tree::{CommandNode, CommandTree, Flag};

/// Flag usage text starts after this column (plus a three-space gutter).
const FLAG_COLUMN: usize = 24;

/// Render `--help` output for `node`, shown as `display_name`.
pub fn render(node: &CommandNode, display_name: &[String]) -> String {
    let mut usage = String::from("usage:");
    for word in display_name {
        usage.push(' ');
        usage.push_str(word);
    }
    let mut out = format!("{usage} [<options>]{}\n", synopsis_tail(node, "|"));

    if !node.extended_description().is_empty() {
        out.push_str(&format!("\n{}\n", node.extended_description().trim_end()));
    }
    out.push('\n');

    let rows: Vec<(String, &str)> = node
        .flags()
        .iter()
        .map(|f| {
            let names = if f.short_names().is_empty() {
                format!("    {}", flag_line(f))
            } else {
                flag_line(f)
            };
            (format!("    {names}"), f.usage())
        })
        .collect();
    let width = rows
        .iter()
        .map(|(left, _)| left.len() + 1)
        .max()
        .unwrap_or(0)
        .max(FLAG_COLUMN);
    for (left, usage) in rows {
        let line = format!("{left:width$}   {usage}");
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Render a section 1 man page for `node`, shown as `display_name`.
pub fn render_extended(node: &CommandNode, display_name: &[String]) -> String {
    let dashed = display_name.join("-");

    let mut out = format!(".TH {} 1\n.SH NAME\n", dashed.to_uppercase());
    if node.description().is_empty() {
        out.push_str(&format!("{dashed}\n"));
    } else {
        out.push_str(&format!("{dashed} - {}\n", node.description()));
    }

    out.push_str(".SH SYNOPSIS\n");
    out.push_str(&format!(
        "\\fI{}\\fR [<options>]{}\n",
        display_name.join(" "),
        synopsis_tail(node, " | ")
    ));

    out.push_str(".SH DESCRIPTION\n");
    out.push_str(&format!("{}\n", node.extended_description()));

    out.push_str(".SH OPTIONS\n");
    for flag in node.flags() {
        out.push_str(&format!(".TP\n{}\n{}\n", flag_line(flag), flag.extended_usage()));
    }

    out
}

/// One man page per command, keyed by file name (`git-remote-add.1`).
///
/// Pages are named after the final component of `program`.
pub fn man_pages(tree: &CommandTree, program: &str) -> BTreeMap<String, String> {
    let base = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program);

    let mut pages = BTreeMap::new();
    let mut path = vec![base.to_string()];
    tree.root().walk(&mut path, &mut |path, node| {
        pages.insert(format!("{}.1", path.join("-")), render_extended(node, path));
    });
    pages
}

fn synopsis_tail(node: &CommandNode, separator: &str) -> String {
    if !node.children().is_empty() {
        let children: Vec<&str> = node.children().keys().map(String::as_str).collect();
        let children = children.join(separator);
        return if node.is_runnable() {
            format!(" [{children}]")
        } else {
            format!(" {children}")
        };
    }

    let mut names: Vec<String> = node.args().iter().map(|a| a.name().to_string()).collect();
    if let Some(trailing) = node.trailing() {
        names.push(format!("{}...", trailing.name()));
    }
    if names.is_empty() {
        String::new()
    } else {
        format!(" {}", names.join(" "))
    }
}

/// `-x, --x-ray <xxx>`, `-y <yyy>`, `--zulu[=<zzz>]`, `-h, --help`.
fn flag_line(flag: &Flag) -> String {
    let names: Vec<String> = flag
        .short_names()
        .iter()
        .map(|short| format!("-{short}"))
        .chain(flag.long_names().iter().map(|long| format!("--{long}")))
        .collect();

    let value = match flag.arity() {
        Arity::Boolean => String::new(),
        Arity::Required | Arity::Repeatable => format!(" <{}>", flag.value_name()),
        Arity::Optional => format!("[=<{}>]", flag.value_name()),
    };
    format!("{}{value}", names.join(", "))
}
