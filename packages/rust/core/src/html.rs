//! HTML serialization of resolved render trees.

use std::fmt::Write as _;

use serde_json::Value;

use docrender_shared::RenderNode;

use crate::assembler::AssembledPage;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Props that only steer rendering and never reach the output.
const INTERNAL_PROPS: &[&str] = &["components", "parentName", "mdxType", "originalType"];

/// Serialize a tree to an HTML fragment.
///
/// Text is escaped, fragments contribute only their children, and unresolved
/// custom tags are emitted as-is.
pub fn to_html(node: &RenderNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Serialize a whole page into a standalone HTML document.
pub fn page_to_html(page: &AssembledPage) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_text(&page.title));
    out.push_str("</head>\n<body>\n");
    write_node(&mut out, &page.to_tree());
    out.push_str("\n</body>\n</html>\n");
    out
}

fn write_node(out: &mut String, node: &RenderNode) {
    if node.is_text() {
        out.push_str(&escape_text(node.prop_str("value").unwrap_or_default()));
        return;
    }
    if node.is_fragment() {
        for child in &node.children {
            write_node(out, child);
        }
        return;
    }

    out.push('<');
    out.push_str(&node.tag);
    for (key, value) in &node.props {
        if INTERNAL_PROPS.contains(&key.as_str()) {
            continue;
        }
        write_attr(out, attr_name(key), value);
    }

    if VOID_ELEMENTS.contains(&node.tag.as_str()) {
        out.push_str(" />");
        return;
    }
    out.push('>');

    for child in &node.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", node.tag);
}

fn write_attr(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::String(s) => {
            let _ = write!(out, " {name}=\"{}\"", escape_attr(s));
        }
        Value::Number(n) => {
            let _ = write!(out, " {name}=\"{n}\"");
        }
        Value::Bool(true) => {
            let _ = write!(out, " {name}");
        }
        // false, null, arrays and objects have no attribute form
        _ => {}
    }
}

/// JSX-style prop names to HTML attribute names.
fn attr_name(key: &str) -> &str {
    match key {
        "className" => "class",
        "htmlFor" => "for",
        "dateTime" => "datetime",
        other => other,
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
