//! Footnote extraction and numbering.
//!
//! Definitions (`[^label]: text`, with continuation lines indented by two or
//! more spaces) are pulled out of the body before block parsing. Numbers are
//! handed out later, in the order the inline formatter meets references, so
//! numbering follows the text rather than the definitions.

use std::collections::HashMap;

use crate::patterns::FOOTNOTE_DEF_RE;

/// Footnote definitions keyed by label.
pub type FootnoteTable = HashMap<String, String>;

/// Remove footnote definitions from `text`.
///
/// Returns the remaining body and the definitions found. A repeated label
/// keeps its first definition.
pub fn extract_footnotes(text: &str) -> (String, FootnoteTable) {
    let mut table = FootnoteTable::new();
    let mut body: Vec<&str> = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut in_fence = false;

    for line in text.split('\n') {
        if let Some((_, ref mut definition)) = current {
            if is_continuation(line) {
                if !definition.is_empty() {
                    definition.push(' ');
                }
                definition.push_str(line.trim());
                continue;
            }
            if let Some((label, definition)) = current.take() {
                table.entry(label).or_insert(definition);
            }
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence && let Some(caps) = FOOTNOTE_DEF_RE.captures(line) {
            current = Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
            continue;
        }
        body.push(line);
    }

    if let Some((label, definition)) = current {
        table.entry(label).or_insert(definition);
    }

    (body.join("\n"), table)
}

fn is_continuation(line: &str) -> bool {
    (line.starts_with("  ") || line.starts_with('\t')) && !line.trim().is_empty()
}

/// Per-conversion footnote state: definitions plus first-use order.
#[derive(Debug, Default)]
pub struct FootnoteRegistry {
    definitions: FootnoteTable,
    order: Vec<String>,
}

impl FootnoteRegistry {
    pub fn new(definitions: FootnoteTable) -> Self {
        Self {
            definitions,
            order: Vec::new(),
        }
    }

    /// Record a reference and return its 1-based number.
    ///
    /// Returns `None` when the label has no definition.
    pub fn reference(&mut self, label: &str) -> Option<usize> {
        if !self.definitions.contains_key(label) {
            return None;
        }
        if let Some(index) = self.order.iter().position(|l| l == label) {
            return Some(index + 1);
        }
        self.order.push(label.to_string());
        Some(self.order.len())
    }

    /// Number of distinct footnotes referenced so far.
    pub fn referenced_count(&self) -> usize {
        self.order.len()
    }

    /// The `index`-th referenced footnote (0-based) as `(label, text)`.
    pub fn referenced(&self, index: usize) -> Option<(&str, &str)> {
        let label = self.order.get(index)?;
        let text = self.definitions.get(label)?;
        Some((label.as_str(), text.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
