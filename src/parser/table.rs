//! Pipe table rows and their accumulation.

use crate::model::{Alignment, Table};

/// A line that belongs to a pipe table.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.len() > 1
}

/// Parse an alignment row such as `|:--|:-:|--:|`.
pub fn alignment_row(line: &str) -> Option<Vec<Alignment>> {
    split_row(line)
        .iter()
        .map(|cell| Alignment::from_marker(cell))
        .collect()
}

/// Split a table row into trimmed cells, honouring `\|` escapes.
pub fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

/// Accumulates rows until the table ends.
#[derive(Debug, Default)]
pub struct TableBuilder {
    rows: Vec<Vec<String>>,
    alignments: Option<Vec<Alignment>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. The first all-marker row sets the alignments and is not data.
    pub fn push_row(&mut self, line: &str) {
        if self.alignments.is_none()
            && let Some(alignments) = alignment_row(line)
        {
            self.alignments = Some(alignments);
            return;
        }
        self.rows.push(split_row(line));
    }

    /// Finish the table, normalising every row to the column count.
    pub fn finish(self) -> Table {
        let columns = match self.alignments {
            Some(ref alignments) => alignments.len(),
            None => self.rows.iter().map(Vec::len).max().unwrap_or(0),
        };
        let alignments = self
            .alignments
            .unwrap_or_else(|| vec![Alignment::Left; columns]);

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();

        Table { rows, alignments }
    }
}
