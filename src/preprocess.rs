//! Source text normalisation.
//!
//! [`preprocess`] rewrites dialect extensions into the subset the block
//! parser and inline formatter understand:
//!
//! - **Characters**: BOM stripped, non-breaking spaces become spaces,
//!   zero-width characters are removed, curly quotes become straight quotes
//! - **Cross-references**: `[[Page#Section|Alias]]` becomes `[Alias](#section)`
//!   and `(#Section Name)` targets are slugified
//! - **Callouts**: `> [!WARNING] Title` becomes `> **WARNING: Title**`
//! - **Reference links**: `[text][label]` is resolved from `[label]: url` lines,
//!   which are removed
//! - **Math**: `$x$` and `$$...$$` become a literal `[Math: ...]` marker
//! - **Autolinks**: `<https://x>` becomes `[https://x](https://x)`
//! - **Setext headings**: `Title` over `===`/`---` becomes `#`/`##` headings
//! - **Tables**: a header row not followed by a separator row gets one
//!
//! Fenced code is passed through untouched, as are inline code spans.
//! The pass is not idempotent; apply it once per conversion.

use std::collections::HashMap;

use crate::parser::table::{alignment_row, is_table_row, split_row};
use crate::patterns::{
    AUTOLINK_RE, BLOCK_MATH_LINE_RE, CALLOUT_RE, INLINE_MATH_RE, REFERENCE_DEF_RE,
    REFERENCE_LINK_RE, SECTION_LINK_RE, SETEXT_H1_RE, SETEXT_H2_RE, WIKI_LINK_RE,
};
use crate::util::slugify;

/// Normalise raw input text.
pub fn preprocess(text: &str) -> String {
    let text = normalize_characters(text);
    let (text, references) = collect_references(&text);
    let lines: Vec<&str> = text.split('\n').collect();

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut fence: Option<Fence> = None;
    let mut math: Option<Vec<&str>> = None;
    let mut prev_table_row = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if let Some(ref open) = fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            out.push(line.to_string());
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            prev_table_row = false;
            out.push(line.to_string());
            continue;
        }

        if let Some(ref mut body) = math {
            if line.trim() == "$$" {
                out.push(math_marker(&body.join(" ")));
                math = None;
            } else {
                body.push(line.trim());
            }
            continue;
        }
        if line.trim() == "$$" {
            math = Some(Vec::new());
            continue;
        }
        if let Some(caps) = BLOCK_MATH_LINE_RE.captures(line) {
            out.push(math_marker(&caps[1]));
            prev_table_row = false;
            continue;
        }

        if is_setext_candidate(line)
            && let Some(next) = lines.get(i)
        {
            let prefix = if SETEXT_H1_RE.is_match(next) {
                Some("#")
            } else if SETEXT_H2_RE.is_match(next) {
                Some("##")
            } else {
                None
            };
            if let Some(prefix) = prefix {
                out.push(format!("{prefix} {}", rewrite_inline(line.trim(), &references)));
                prev_table_row = false;
                i += 1;
                continue;
            }
        }

        let table_row = is_table_row(line);
        let needs_separator = table_row
            && !prev_table_row
            && lines
                .get(i)
                .is_some_and(|next| is_table_row(next) && !is_separator_row(next));
        prev_table_row = table_row;

        out.push(rewrite_line(line, &references));
        if needs_separator {
            out.push(separator_row(count_cells(line)));
        }
    }

    // An unterminated math block is kept as written.
    if let Some(body) = math {
        out.push("$$".to_string());
        out.extend(body.into_iter().map(str::to_string));
    }

    out.join("\n")
}

/// Strip BOM, normalise spaces and quotes.
pub fn normalize_characters(text: &str) -> String {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{00A0}' | '\u{202F}' | '\u{2007}' => out.push(' '),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\u{2060}' => {}
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// A fenced code block opener.
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let len = trimmed.chars().take_while(|c| *c == self.marker).count();
        len >= self.len && len == trimmed.chars().count()
    }
}

/// Remove reference definitions outside code, returning them keyed by
/// lowercase label.
fn collect_references(text: &str) -> (String, HashMap<String, String>) {
    let mut references = HashMap::new();
    let mut kept: Vec<&str> = Vec::new();
    let mut fence: Option<Fence> = None;

    for line in text.split('\n') {
        if let Some(ref open) = fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            kept.push(line);
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            kept.push(line);
            continue;
        }
        if let Some(caps) = REFERENCE_DEF_RE.captures(line) {
            references
                .entry(caps[1].trim().to_lowercase())
                .or_insert_with(|| caps[2].to_string());
            continue;
        }
        kept.push(line);
    }

    (kept.join("\n"), references)
}

/// Rewrite one line, including any callout opener.
fn rewrite_line(line: &str, references: &HashMap<String, String>) -> String {
    if let Some(caps) = CALLOUT_RE.captures(line) {
        let kind = caps[2].to_uppercase();
        let title = caps[3].trim();
        let title = if title.is_empty() {
            title_case(&caps[2])
        } else {
            rewrite_inline(title, references)
        };
        return format!("{} **{kind}: {title}**", caps[1].trim_end());
    }
    rewrite_inline(line, references)
}

/// Apply inline rewrites to the parts of `line` outside code spans.
fn rewrite_inline(line: &str, references: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(line.len());
    for (segment, is_code) in split_code_spans(line) {
        if is_code {
            out.push_str(segment);
        } else {
            out.push_str(&rewrite_segment(segment, references));
        }
    }
    out
}

fn rewrite_segment(segment: &str, references: &HashMap<String, String>) -> String {
    let text = WIKI_LINK_RE.replace_all(segment, |caps: &regex_lite::Captures| {
        if !caps[1].is_empty() {
            // Embeds are parsed as images.
            return caps[0].to_string();
        }
        let page = caps[2].trim();
        let section = caps.get(3).map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
        let alias = caps.get(4).map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
        let display = match (alias, section) {
            (Some(alias), _) => alias.to_string(),
            (None, Some(section)) if page.is_empty() => section.to_string(),
            (None, Some(section)) => format!("{page} > {section}"),
            (None, None) => page.to_string(),
        };
        format!("[{display}](#{})", slugify(section.unwrap_or(page)))
    });

    let text = SECTION_LINK_RE.replace_all(&text, |caps: &regex_lite::Captures| {
        format!("](#{})", slugify(&caps[1]))
    });

    let text = REFERENCE_LINK_RE.replace_all(&text, |caps: &regex_lite::Captures| {
        let label = if caps[2].is_empty() { &caps[1] } else { &caps[2] };
        match references.get(&label.trim().to_lowercase()) {
            Some(url) => format!("[{}]({url})", &caps[1]),
            None => caps[0].to_string(),
        }
    });

    let text = AUTOLINK_RE.replace_all(&text, "[$1]($1)");

    let text = INLINE_MATH_RE.replace_all(&text, |caps: &regex_lite::Captures| {
        format!("{}{}", math_marker(&caps[1]), &caps[2])
    });

    text.into_owned()
}

/// Split a line into `(segment, is_code)` parts on backtick code spans.
fn split_code_spans(line: &str) -> Vec<(&str, bool)> {
    let mut parts = Vec::new();
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let ticks = bytes[i..].iter().take_while(|b| **b == b'`').count();
        let body = i + ticks;
        let close = find_tick_run(&bytes[body..], ticks).map(|pos| body + pos);
        match close {
            Some(close) => {
                if start < i {
                    parts.push((&line[start..i], false));
                }
                let end = close + ticks;
                parts.push((&line[i..end], true));
                start = end;
                i = end;
            }
            None => i = body,
        }
    }
    if start < line.len() {
        parts.push((&line[start..], false));
    }
    parts
}

/// Find a backtick run of exactly `len`.
fn find_tick_run(bytes: &[u8], len: usize) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|b| **b == b'`').count();
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn math_marker(body: &str) -> String {
    format!("[Math: {}]", body.trim())
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plain text lines that may be underlined into a setext heading.
fn is_setext_candidate(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || line.starts_with("    ") {
        return false;
    }
    !matches!(
        trimmed.chars().next(),
        Some('#' | '>' | '|' | '-' | '*' | '+' | '!' | '<' | '`' | '~' | '=' | ':')
    ) && !trimmed.starts_with("[^")
}

fn is_separator_row(line: &str) -> bool {
    alignment_row(line).is_some()
}

fn count_cells(line: &str) -> usize {
    split_row(line).len().max(1)
}

fn separator_row(columns: usize) -> String {
    let mut row = String::from("|");
    for _ in 0..columns {
        row.push_str(" --- |");
    }
    row
}
