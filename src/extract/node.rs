//! Rich-text tree model
//!
//! Ticket descriptions arrive as Atlassian Document Format (ADF) JSON. The
//! conversion into [`DocumentNode`] is total: malformed or unknown nodes are
//! mapped to [`DocumentNode::Generic`] or [`DocumentNode::Empty`] instead of
//! failing, and missing attributes fall back to empty strings or level 1.

use serde_json::Value;

/// Deepest heading level; anything outside 1..=6 renders as level 1
const MAX_HEADING_LEVEL: u64 = 6;

/// A node of a rich-text document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    /// Literal text run
    Text(String),

    /// Line break inside a block
    HardBreak,

    /// Paragraph block
    Paragraph(Vec<DocumentNode>),

    /// Heading with its level (1-6 in well-formed input)
    Heading {
        level: usize,
        content: Vec<DocumentNode>,
    },

    /// Inline link card
    InlineReference { url: String },

    /// Ordered or bullet list; only `ListItem` children produce lines
    List {
        ordered: bool,
        items: Vec<DocumentNode>,
    },

    /// Item of a list
    ListItem(Vec<DocumentNode>),

    /// Quoted block
    Blockquote(Vec<DocumentNode>),

    /// Code block with an optional language tag
    CodeBlock {
        language: String,
        content: Vec<DocumentNode>,
    },

    /// Date chip, timestamp kept verbatim
    Date { timestamp: String },

    /// Emoji, rendered by its text glyph
    Emoji { glyph: String },

    /// Unrecognized node type that still carries children
    Generic(Vec<DocumentNode>),

    /// Unrecognized node type without children
    Empty,
}

impl DocumentNode {
    /// Converts one ADF JSON node
    pub fn from_value(value: &Value) -> Self {
        let node_type = value.get("type").and_then(Value::as_str).unwrap_or("");

        match node_type {
            "text" => Self::Text(str_field(value, "text")),
            "hardBreak" => Self::HardBreak,
            "paragraph" => Self::Paragraph(children(value)),
            "heading" => Self::Heading {
                level: attr(value, "level")
                    .and_then(Value::as_u64)
                    .filter(|l| (1..=MAX_HEADING_LEVEL).contains(l))
                    .map_or(1, |l| l as usize),
                content: children(value),
            },
            "inlineCard" => Self::InlineReference {
                url: str_attr(value, "url"),
            },
            "bulletList" | "orderedList" => Self::List {
                ordered: node_type == "orderedList",
                items: children(value),
            },
            "listItem" => Self::ListItem(children(value)),
            "blockquote" => Self::Blockquote(children(value)),
            "codeBlock" => Self::CodeBlock {
                language: str_attr(value, "language"),
                content: children(value),
            },
            "date" => Self::Date {
                timestamp: scalar_attr(value, "timestamp"),
            },
            "emoji" => Self::Emoji {
                glyph: str_attr(value, "text"),
            },
            _ if value.get("content").is_some() => Self::Generic(children(value)),
            _ => Self::Empty,
        }
    }

    /// Children of container nodes; leaves have none
    pub fn children(&self) -> &[DocumentNode] {
        match self {
            Self::Paragraph(c)
            | Self::ListItem(c)
            | Self::Blockquote(c)
            | Self::Generic(c)
            | Self::Heading { content: c, .. }
            | Self::CodeBlock { content: c, .. }
            | Self::List { items: c, .. } => c,
            _ => &[],
        }
    }
}

/// Converts the `content` array of an ADF document (or any node)
///
/// Accepts either a full `{"type": "doc", "content": [...]}` value or a bare
/// array of nodes. `null` and other shapes yield no nodes.
pub fn parse_content(value: &Value) -> Vec<DocumentNode> {
    match value {
        Value::Array(nodes) => nodes.iter().map(DocumentNode::from_value).collect(),
        Value::Object(_) => children(value),
        _ => Vec::new(),
    }
}

fn children(value: &Value) -> Vec<DocumentNode> {
    value
        .get("content")
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter().map(DocumentNode::from_value).collect())
        .unwrap_or_default()
}

fn attr<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get("attrs").and_then(|attrs| attrs.get(key))
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn str_attr(value: &Value, key: &str) -> String {
    attr(value, key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// Date timestamps show up both as strings and as numbers
fn scalar_attr(value: &Value, key: &str) -> String {
    match attr(value, key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
