//! Line-oriented block parser.
//!
//! [`parse`] walks the text one line at a time with three states: default,
//! inside a code fence, and inside a table. Outside a fence each line is
//! classified by the first rule that matches, in this order:
//!
//! 1. fence delimiter
//! 2. horizontal rule (three or more `-`, `*` or `_`)
//! 3. ATX heading
//! 4. task item, then bullet item, then numbered item
//! 5. blockquote (`>` repeated for nesting)
//! 6. table row
//! 7. whole-line image, `![alt|300x200](src)` or `![[name|300]]`
//! 8. blank line
//! 9. `<details>` section, parsed recursively and flattened
//! 10. term line followed by a `: definition` line
//! 11. paragraph
//!
//! Consecutive list, task and same-level blockquote lines merge into one
//! element. Each remaining line is its own paragraph.

pub mod table;

use log::debug;
use thiserror::Error;

use crate::model::{Element, ImageRef, ListItem, MAX_LIST_DEPTH, TaskItem};
use crate::patterns::{
    BLOCKQUOTE_RE, BULLET_RE, DEFINITION_RE, EMBED_RE, HEADING_RE, IMAGE_RE, ORDERED_RE,
    SIZE_RE, SUMMARY_RE, TASK_RE,
};
use crate::util::indent_width;

use table::{TableBuilder, is_table_row};

/// Deepest `<details>` nesting accepted before a parse fails.
pub const MAX_DETAILS_DEPTH: usize = 16;

/// Errors that abort parsing of one chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("collapsible sections nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// Parse text into block elements.
pub fn parse(text: &str) -> Result<Vec<Element>, ParseError> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut parser = BlockParser::new(0);
    parser.parse_lines(&lines)?;
    Ok(parser.finish())
}

enum State {
    Default,
    InFence {
        marker: char,
        len: usize,
        language: Option<String>,
        lines: Vec<String>,
    },
    InTable(TableBuilder),
}

struct BlockParser {
    elements: Vec<Element>,
    state: State,
    depth: usize,
}

impl BlockParser {
    fn new(depth: usize) -> Self {
        Self {
            elements: Vec::new(),
            state: State::Default,
            depth,
        }
    }

    fn parse_lines(&mut self, lines: &[&str]) -> Result<(), ParseError> {
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            i += 1;

            match self.state {
                State::InFence {
                    marker,
                    len,
                    lines: ref mut body,
                    ..
                } => {
                    if closes_fence(line, marker, len) {
                        self.flush_fence();
                    } else {
                        body.push(line.to_string());
                    }
                    continue;
                }
                State::InTable(ref mut builder) => {
                    if is_table_row(line) {
                        builder.push_row(line);
                        continue;
                    }
                    self.flush_table();
                }
                State::Default => {}
            }

            if let Some((marker, len, language)) = open_fence(line) {
                self.state = State::InFence {
                    marker,
                    len,
                    language,
                    lines: Vec::new(),
                };
                continue;
            }

            if is_horizontal_rule(line) {
                self.elements.push(Element::HorizontalRule);
                continue;
            }

            if let Some(caps) = HEADING_RE.captures(line) {
                self.elements
                    .push(Element::heading(caps[1].len(), caps[2].trim()));
                continue;
            }

            if let Some(caps) = TASK_RE.captures(line) {
                self.push_task(TaskItem {
                    checked: !caps[2].trim().is_empty(),
                    text: caps[3].trim().to_string(),
                });
                continue;
            }

            if let Some(caps) = BULLET_RE.captures(line) {
                self.push_list_item(false, list_level(&caps[1]), caps[2].trim());
                continue;
            }

            if let Some(caps) = ORDERED_RE.captures(line) {
                self.push_list_item(true, list_level(&caps[1]), caps[2].trim());
                continue;
            }

            if let Some(caps) = BLOCKQUOTE_RE.captures(line) {
                let level = caps[1].matches('>').count().min(u8::MAX as usize) as u8;
                self.push_quote_line(level, caps[2].trim_end());
                continue;
            }

            if is_table_row(line) {
                let mut builder = TableBuilder::new();
                builder.push_row(line);
                self.state = State::InTable(builder);
                continue;
            }

            if let Some(caps) = IMAGE_RE.captures(line) {
                self.elements.push(Element::Image(inline_image(&caps[1], &caps[2])));
                continue;
            }

            if let Some(caps) = EMBED_RE.captures(line) {
                let name = caps[1].trim();
                if name.to_ascii_lowercase().ends_with(".pdf") {
                    debug!("skipping embedded PDF {name}");
                } else {
                    let (width, height) = caps.get(2).map(|m| parse_size(m.as_str())).unwrap_or_default();
                    self.elements.push(Element::Image(ImageRef {
                        alt: name.to_string(),
                        source: name.to_string(),
                        width,
                        height,
                    }));
                }
                continue;
            }

            if line.trim().is_empty() {
                if !matches!(self.elements.last(), Some(Element::Break)) {
                    self.elements.push(Element::Break);
                }
                continue;
            }

            if opens_details(line) {
                let consumed = self.parse_details(&lines[i - 1..])?;
                i += consumed - 1;
                continue;
            }

            if let Some(next) = lines.get(i)
                && let Some(caps) = DEFINITION_RE.captures(next)
            {
                let mut definition = caps[1].trim().to_string();
                i += 1;
                while let Some(caps) = lines.get(i).and_then(|l| DEFINITION_RE.captures(l)) {
                    definition.push('\n');
                    definition.push_str(caps[1].trim());
                    i += 1;
                }
                self.elements.push(Element::Definition {
                    term: line.trim().to_string(),
                    definition,
                });
                continue;
            }

            self.elements.push(Element::paragraph(line.trim()));
        }
        Ok(())
    }

    /// Flush any open fence or table and return the elements.
    fn finish(mut self) -> Vec<Element> {
        match self.state {
            State::InFence { .. } => self.flush_fence(),
            State::InTable(_) => self.flush_table(),
            State::Default => {}
        }
        self.elements
    }

    fn flush_fence(&mut self) {
        if let State::InFence {
            language, lines, ..
        } = std::mem::replace(&mut self.state, State::Default)
        {
            self.elements.push(Element::CodeBlock {
                text: lines.join("\n"),
                language,
            });
        }
    }

    fn flush_table(&mut self) {
        if let State::InTable(builder) = std::mem::replace(&mut self.state, State::Default) {
            self.elements.push(Element::Table(builder.finish()));
        }
    }

    fn push_list_item(&mut self, ordered: bool, level: u8, text: &str) {
        let item = ListItem {
            text: text.to_string(),
            level,
        };
        if let Some(Element::List {
            ordered: last_ordered,
            items,
        }) = self.elements.last_mut()
            && *last_ordered == ordered
        {
            items.push(item);
            return;
        }
        self.elements.push(Element::List {
            ordered,
            items: vec![item],
        });
    }

    fn push_task(&mut self, item: TaskItem) {
        if let Some(Element::TaskList { items }) = self.elements.last_mut() {
            items.push(item);
            return;
        }
        self.elements.push(Element::TaskList { items: vec![item] });
    }

    fn push_quote_line(&mut self, level: u8, content: &str) {
        if let Some(Element::Blockquote {
            text,
            level: last_level,
        }) = self.elements.last_mut()
            && *last_level == level
        {
            text.push('\n');
            text.push_str(content);
            return;
        }
        self.elements.push(Element::Blockquote {
            text: content.to_string(),
            level,
        });
    }

    /// Parse a `<details>` block starting at `lines[0]`.
    ///
    /// Returns the number of lines consumed. An unclosed block runs to the
    /// end of the input.
    fn parse_details(&mut self, lines: &[&str]) -> Result<usize, ParseError> {
        if self.depth + 1 > MAX_DETAILS_DEPTH {
            return Err(ParseError::NestingTooDeep(MAX_DETAILS_DEPTH));
        }

        let mut open = 0usize;
        let mut consumed = lines.len();
        for (index, line) in lines.iter().enumerate() {
            let lower = line.to_ascii_lowercase();
            open += lower.matches("<details").count();
            open = open.saturating_sub(lower.matches("</details>").count());
            if open == 0 {
                consumed = index + 1;
                break;
            }
        }

        let block = lines[..consumed].join("\n");
        let body = details_body(&block);
        let (summary, body) = match SUMMARY_RE.captures(body) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
                let summary = caps[1].trim().to_string();
                let mut rest = String::with_capacity(body.len());
                rest.push_str(&body[..whole.start]);
                rest.push_str(&body[whole.end..]);
                (summary, rest)
            }
            None => ("Details".to_string(), body.to_string()),
        };

        self.elements.push(Element::paragraph(format!("\u{25BC} {summary}")));

        let inner_lines: Vec<&str> = body.trim_matches('\n').split('\n').collect();
        let mut inner = BlockParser::new(self.depth + 1);
        inner.parse_lines(&inner_lines)?;
        self.elements.extend(inner.finish());

        Ok(consumed)
    }
}

/// Text between the opening `<details ...>` tag and the last `</details>`.
fn details_body(block: &str) -> &str {
    let lower = block.to_ascii_lowercase();
    let start = lower
        .find("<details")
        .and_then(|pos| lower[pos..].find('>').map(|end| pos + end + 1))
        .unwrap_or(0);
    let end = lower.rfind("</details>").filter(|end| *end >= start).unwrap_or(block.len());
    &block[start..end]
}

fn opens_details(line: &str) -> bool {
    line.trim_start().to_ascii_lowercase().starts_with("<details")
}

/// Recognise a fence opener, returning its marker, length and language.
fn open_fence(line: &str) -> Option<(char, usize, Option<String>)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    let language = info
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c| c == '{' || c == '}' || c == '.'))
        .filter(|word| !word.is_empty())
        .map(str::to_string);
    Some((marker, len, language))
}

fn closes_fence(line: &str, marker: char, len: usize) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|c| *c == marker).count();
    run >= len && run == trimmed.chars().count()
}

fn is_horizontal_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], '-' | '*' | '_')
        && compact.iter().all(|c| *c == compact[0])
}

fn list_level(indent: &str) -> u8 {
    ((indent_width(indent) / 2).min(MAX_LIST_DEPTH as usize)) as u8
}

/// Build an image from `![alt|size](src)`.
fn inline_image(alt: &str, source: &str) -> ImageRef {
    let source = source
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(source);

    let (alt, (width, height)) = match alt.rsplit_once('|') {
        Some((text, size)) if SIZE_RE.is_match(size) => (text, parse_size(size)),
        _ => (alt, (None, None)),
    };

    ImageRef {
        alt: alt.trim().to_string(),
        source: source.to_string(),
        width,
        height,
    }
}

/// Parse `300` or `300x200`.
fn parse_size(size: &str) -> (Option<u32>, Option<u32>) {
    match SIZE_RE.captures(size) {
        Some(caps) => (
            caps[1].parse().ok(),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, Table};

    fn parse_ok(text: &str) -> Vec<Element> {
        parse(text).expect("parse failed")
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let elements = parse_ok("# Title\nFirst line\nSecond line");
        assert_eq!(
            elements,
            vec![
                Element::heading(1, "Title"),
                Element::paragraph("First line"),
                Element::paragraph("Second line"),
            ]
        );
    }

    #[test]
    fn test_fence_with_language() {
        let elements = parse_ok("```rust\nfn main() {}\n# not a heading\n```");
        assert_eq!(
            elements,
            vec![Element::CodeBlock {
                text: "fn main() {}\n# not a heading".to_string(),
                language: Some("rust".to_string()),
            }]
        );
    }

    #[test]
    fn test_unterminated_fence_flushed() {
        let elements = parse_ok("~~~\ncode");
        assert!(matches!(&elements[0], Element::CodeBlock { text, language: None } if text == "code"));
    }

    #[test]
    fn test_horizontal_rules() {
        for rule in ["---", "* * *", "___", " - - - "] {
            assert_eq!(parse_ok(rule), vec![Element::HorizontalRule], "{rule}");
        }
    }

    #[test]
    fn test_task_items_not_bullets() {
        let elements = parse_ok("- [ ] todo\n- [x] done");
        assert_eq!(
            elements,
            vec![Element::TaskList {
                items: vec![
                    TaskItem {
                        checked: false,
                        text: "todo".into()
                    },
                    TaskItem {
                        checked: true,
                        text: "done".into()
                    },
                ]
            }]
        );
    }

    #[test]
    fn test_list_merging_and_nesting() {
        let elements = parse_ok("- a\n  - b\n      - c\n1. one\n2) two");
        assert_eq!(elements.len(), 2);
        let Element::List { ordered, items } = &elements[0] else {
            panic!("expected list");
        };
        assert!(!ordered);
        let levels: Vec<u8> = items.iter().map(|i| i.level).collect();
        assert_eq!(levels, vec![0, 1, 1]);
        assert!(matches!(&elements[1], Element::List { ordered: true, items } if items.len() == 2));
    }

    #[test]
    fn test_blockquote_merging() {
        let elements = parse_ok("> one\n> two\n> > nested");
        assert_eq!(
            elements,
            vec![
                Element::Blockquote {
                    text: "one\ntwo".into(),
                    level: 1
                },
                Element::Blockquote {
                    text: "nested".into(),
                    level: 2
                },
            ]
        );
    }

    #[test]
    fn test_table_with_alignment() {
        let elements = parse_ok("| L | C | R |\n|:--|:--:|--:|\n| 1 | 2 | 3 |\nafter");
        assert_eq!(
            elements[0],
            Element::Table(Table {
                rows: vec![
                    vec!["L".into(), "C".into(), "R".into()],
                    vec!["1".into(), "2".into(), "3".into()],
                ],
                alignments: vec![Alignment::Left, Alignment::Center, Alignment::Right],
            })
        );
        assert_eq!(elements[1], Element::paragraph("after"));
    }

    #[test]
    fn test_table_at_end_flushed() {
        let elements = parse_ok("| a |\n| b |");
        assert!(matches!(&elements[0], Element::Table(t) if t.rows.len() == 2));
    }

    #[test]
    fn test_images() {
        let elements = parse_ok("![Chart|300](chart.png)\n![Logo|120x40](<my logo.png>)\n![[photo.jpg|250]]\n![[paper.pdf]]");
        assert_eq!(
            elements,
            vec![
                Element::Image(ImageRef {
                    alt: "Chart".into(),
                    source: "chart.png".into(),
                    width: Some(300),
                    height: None,
                }),
                Element::Image(ImageRef {
                    alt: "Logo".into(),
                    source: "my logo.png".into(),
                    width: Some(120),
                    height: Some(40),
                }),
                Element::Image(ImageRef {
                    alt: "photo.jpg".into(),
                    source: "photo.jpg".into(),
                    width: Some(250),
                    height: None,
                }),
            ]
        );
    }

    #[test]
    fn test_alt_with_pipe_but_no_size() {
        let elements = parse_ok("![a|b](x.png)");
        assert!(matches!(&elements[0], Element::Image(img) if img.alt == "a|b" && img.width.is_none()));
    }

    #[test]
    fn test_blank_lines_collapse() {
        let elements = parse_ok("a\n\n\n\nb");
        assert_eq!(
            elements,
            vec![Element::paragraph("a"), Element::Break, Element::paragraph("b")]
        );
    }

    #[test]
    fn test_definition() {
        let elements = parse_ok("Term\n: Meaning\n: Second");
        assert_eq!(
            elements,
            vec![Element::Definition {
                term: "Term".into(),
                definition: "Meaning\nSecond".into(),
            }]
        );
    }

    #[test]
    fn test_details_flattened() {
        let text = "<details>\n<summary>More</summary>\n\n- hidden item\n</details>\nafter";
        let elements = parse_ok(text);
        assert_eq!(elements[0], Element::paragraph("\u{25BC} More"));
        assert!(elements.iter().any(|e| matches!(e, Element::List { .. })));
        assert_eq!(elements.last(), Some(&Element::paragraph("after")));
    }

    #[test]
    fn test_details_nesting_limit() {
        let mut text = String::new();
        for _ in 0..=MAX_DETAILS_DEPTH {
            text.push_str("<details>\n");
        }
        for _ in 0..=MAX_DETAILS_DEPTH {
            text.push_str("</details>\n");
        }
        assert_eq!(
            parse(&text),
            Err(ParseError::NestingTooDeep(MAX_DETAILS_DEPTH))
        );
    }
}
