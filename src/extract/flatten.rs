use crate::extract::node::DocumentNode;

/// Flattens a sequence of rich-text nodes into plain text
///
/// Pure and deterministic. The output is not trimmed; callers trim it and
/// substitute a fallback when the result is empty.
///
/// # Rendering
///
/// | Node | Output |
/// |------|--------|
/// | text | text followed by a space |
/// | hardBreak | a space |
/// | paragraph, unknown with children | children, unwrapped |
/// | heading(L) | `#`×L, children, `#`×L, space |
/// | inlineCard(url) | `[url]` |
/// | list | newline, one ` N. ` / ` - ` line per item, newline |
/// | blockquote | `>`, children, space |
/// | codeBlock(lang) | ```` ```lang ````, space, children, ```` ``` ````, space |
/// | date | timestamp |
/// | emoji | glyph |
pub fn extract(nodes: &[DocumentNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[DocumentNode], out: &mut String) {
    for node in nodes {
        write_node(node, out);
    }
}

fn write_node(node: &DocumentNode, out: &mut String) {
    match node {
        DocumentNode::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        DocumentNode::HardBreak => out.push(' '),
        DocumentNode::Heading { level, content } => {
            let marks = "#".repeat(*level);
            out.push_str(&marks);
            write_nodes(content, out);
            out.push_str(&marks);
            out.push(' ');
        }
        DocumentNode::InlineReference { url } => {
            out.push('[');
            out.push_str(url);
            out.push(']');
        }
        DocumentNode::List { ordered, items } => {
            out.push('\n');
            write_list(*ordered, items, out);
            out.push('\n');
        }
        DocumentNode::Blockquote(content) => {
            out.push('>');
            write_nodes(content, out);
            out.push(' ');
        }
        DocumentNode::CodeBlock { language, content } => {
            out.push_str("```");
            out.push_str(language);
            out.push(' ');
            write_nodes(content, out);
            out.push_str("``` ");
        }
        DocumentNode::Date { timestamp } => out.push_str(timestamp),
        DocumentNode::Emoji { glyph } => out.push_str(glyph),
        // Outside a list an item is just a container
        DocumentNode::Paragraph(_) | DocumentNode::ListItem(_) | DocumentNode::Generic(_) => {
            write_nodes(node.children(), out)
        }
        DocumentNode::Empty => {}
    }
}

fn write_list(ordered: bool, items: &[DocumentNode], out: &mut String) {
    let list_items = items.iter().filter_map(|item| match item {
        DocumentNode::ListItem(content) => Some(content),
        _ => None,
    });

    for (index, content) in list_items.enumerate() {
        if ordered {
            out.push_str(&format!(" {}. ", index + 1));
        } else {
            out.push_str(" - ");
        }
        write_nodes(content, out);
        out.push('\n');
    }
}
