//! Block-level document elements.

use serde::Serialize;

/// Deepest list nesting level the numbering part defines (levels are 0-based).
pub const MAX_LIST_DEPTH: u8 = 1;

/// Horizontal justification of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Parse one cell of a table alignment row (`:---`, `:-:`, `--:`, `---`).
    pub fn from_marker(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        let (left, rest) = match cell.strip_prefix(':') {
            Some(rest) => (true, rest),
            None => (false, cell),
        };
        let (right, inner) = match rest.strip_suffix(':') {
            Some(inner) => (true, inner),
            None => (false, rest),
        };
        if inner.is_empty() || !inner.bytes().all(|b| b == b'-') {
            return None;
        }
        Some(match (left, right) {
            (true, true) => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        })
    }
}

/// One bullet or numbered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub text: String,
    /// Nesting level, `0..=MAX_LIST_DEPTH`.
    pub level: u8,
}

/// One checkbox item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskItem {
    pub checked: bool,
    pub text: String,
}

/// A table with its column alignments.
///
/// When an alignment row was present, `alignments.len()` is the column count
/// and every row is padded or truncated to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub alignments: Vec<Alignment>,
}

impl Table {
    /// Number of columns rendered.
    pub fn column_count(&self) -> usize {
        if !self.alignments.is_empty() {
            return self.alignments.len();
        }
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Alignment of a column, left when unspecified.
    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

/// An image reference as written in the source.
///
/// Bytes are resolved during serialization, not parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub alt: String,
    /// Path, URL or `data:` URI.
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A block-level element of the parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Paragraph {
        text: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    TaskList {
        items: Vec<TaskItem>,
    },
    Table(Table),
    CodeBlock {
        text: String,
        language: Option<String>,
    },
    Blockquote {
        text: String,
        level: u8,
    },
    /// A term line folded together with its `: definition` line.
    Definition {
        term: String,
        definition: String,
    },
    HorizontalRule,
    Image(ImageRef),
    Break,
}

impl Element {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Element::Paragraph { text: text.into() }
    }

    /// Build a heading, clamping the level to 1..=6.
    pub fn heading(level: usize, text: impl Into<String>) -> Self {
        Element::Heading {
            level: level.clamp(1, 6) as u8,
            text: text.into(),
        }
    }

    /// Short name used in logs and the conversion report.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Paragraph { .. } => "paragraph",
            Element::Heading { .. } => "heading",
            Element::List { .. } => "list",
            Element::TaskList { .. } => "task list",
            Element::Table(_) => "table",
            Element::CodeBlock { .. } => "code block",
            Element::Blockquote { .. } => "blockquote",
            Element::Definition { .. } => "definition",
            Element::HorizontalRule => "horizontal rule",
            Element::Image(_) => "image",
            Element::Break => "break",
        }
    }
}
