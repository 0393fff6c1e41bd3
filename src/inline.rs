//! Inline formatting: text spans to styled runs.
//!
//! The resolver makes one left-to-right pass. At each special character it
//! tries the constructs that can start there, in precedence order:
//!
//! | Construct | Syntax |
//! |-----------|--------|
//! | code (never reprocessed) | `` `x` `` |
//! | bold + italic | `***x***`, `___x___` |
//! | bold | `**x**`, `__x__` |
//! | italic | `*x*`, `_x_` |
//! | strikethrough | `~~x~~` |
//! | highlight | `==x==` |
//! | superscript / subscript | `^x^`, `~x~` |
//! | HTML spellings | `<b>`, `<em>`, `<del>`, `<mark>`, `<u>`, `<sup>`, `<code>`, ... |
//! | footnote reference | `[^label]` |
//! | link | `[text](target "title")` |
//!
//! An opener only matches a closer of exactly the same delimiter run, and
//! the closer search skips code spans and escapes, so a later span can never
//! steal an earlier span's delimiters. Matched content is resolved
//! recursively with the outer style applied, which gives bold-inside-italic
//! and italic-inside-bold.

use crate::footnotes::FootnoteRegistry;
use crate::model::{Style, StyleRun, merge_runs};

/// Recursion limit for nested spans; deeper content is emitted as-is.
const MAX_DEPTH: usize = 32;

/// Resolve `text` into styled runs, numbering footnote references as they
/// are met.
pub fn format_inline(text: &str, footnotes: &mut FootnoteRegistry) -> Vec<StyleRun> {
    let mut formatter = InlineFormatter {
        footnotes,
        runs: Vec::new(),
    };
    formatter.resolve(text, &Style::default(), 0);
    merge_runs(formatter.runs)
}

/// Emphasis kinds a matched span can add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    BoldItalic,
    Bold,
    Italic,
    Strike,
    Highlight,
    Underline,
    Superscript,
    Subscript,
}

impl Mark {
    fn apply(self, style: &mut Style) {
        match self {
            Mark::BoldItalic => {
                style.bold = true;
                style.italic = true;
            }
            Mark::Bold => style.bold = true,
            Mark::Italic => style.italic = true,
            Mark::Strike => style.strikethrough = true,
            Mark::Highlight => style.highlight = true,
            Mark::Underline => style.underline = true,
            Mark::Superscript => {
                style.superscript = true;
                style.subscript = false;
            }
            Mark::Subscript => {
                style.subscript = true;
                style.superscript = false;
            }
        }
    }

    fn from_tag(name: &str) -> Option<Self> {
        Some(match name {
            "b" | "strong" => Mark::Bold,
            "i" | "em" => Mark::Italic,
            "s" | "del" | "strike" => Mark::Strike,
            "mark" => Mark::Highlight,
            "u" | "ins" => Mark::Underline,
            "sup" => Mark::Superscript,
            "sub" => Mark::Subscript,
            _ => return None,
        })
    }
}

/// A construct recognised at some position.
enum Span<'t> {
    Text(String),
    Code(&'t str),
    Styled { inner: &'t str, mark: Mark },
    Link { label: &'t str, target: String },
    Footnote(&'t str),
}

enum Scan<'t> {
    /// A construct and the byte offset just past it.
    Found(Span<'t>, usize),
    /// Nothing here; advance this many bytes.
    Skip(usize),
}

struct InlineFormatter<'a> {
    footnotes: &'a mut FootnoteRegistry,
    runs: Vec<StyleRun>,
}

impl InlineFormatter<'_> {
    fn resolve(&mut self, text: &str, style: &Style, depth: usize) {
        if depth > MAX_DEPTH {
            self.push(text, style);
            return;
        }

        let bytes = text.as_bytes();
        let mut plain_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            if !is_special(bytes[i]) {
                i += 1;
                continue;
            }
            match scan(text, i) {
                Scan::Found(span, end) => {
                    self.push(&text[plain_start..i], style);
                    self.emit(span, style, depth);
                    i = end;
                    plain_start = end;
                }
                Scan::Skip(n) => i += n,
            }
        }
        self.push(&text[plain_start..], style);
    }

    fn emit(&mut self, span: Span<'_>, style: &Style, depth: usize) {
        match span {
            Span::Text(text) => self.push(&text, style),
            Span::Code(code) => self.push(code, &Style::code(style)),
            Span::Styled { inner, mark } => {
                let mut inner_style = style.clone();
                mark.apply(&mut inner_style);
                self.resolve(inner, &inner_style, depth + 1);
            }
            Span::Link { label, target } => {
                let mut inner_style = style.clone();
                inner_style.link = Some(target.clone());
                if label.trim().is_empty() {
                    self.push(&target, &inner_style);
                } else {
                    self.resolve(label, &inner_style, depth + 1);
                }
            }
            Span::Footnote(label) => match self.footnotes.reference(label) {
                Some(number) => {
                    let marker = Style {
                        superscript: true,
                        ..Style::default()
                    };
                    self.push(&number.to_string(), &marker);
                }
                None => self.push(&format!("[Missing footnote: {label}]"), style),
            },
        }
    }

    fn push(&mut self, text: &str, style: &Style) {
        if !text.is_empty() {
            self.runs.push(StyleRun::new(text, style.clone()));
        }
    }
}

fn is_special(b: u8) -> bool {
    matches!(
        b,
        b'\\' | b'`' | b'*' | b'_' | b'~' | b'=' | b'^' | b'[' | b'!' | b'<'
    )
}

/// Try every construct that can start at `i`, highest precedence first.
fn scan(text: &str, i: usize) -> Scan<'_> {
    let bytes = text.as_bytes();
    match bytes[i] {
        b'\\' => match text[i + 1..].chars().next() {
            Some(c) if c.is_ascii_punctuation() => Scan::Found(Span::Text(c.to_string()), i + 2),
            _ => Scan::Skip(1),
        },
        b'`' => code_span(text, i),
        b'*' | b'_' | b'~' | b'=' | b'^' => delimited(text, i),
        b'[' => {
            if let Some((label, end)) = footnote_ref(text, i) {
                return Scan::Found(Span::Footnote(label), end);
            }
            match link(text, i) {
                Some((label, target, end)) => Scan::Found(Span::Link { label, target }, end),
                None => Scan::Skip(1),
            }
        }
        b'!' => match link(text, i + 1) {
            // Inline images keep their alt text only.
            Some((alt, _, end)) if bytes.get(i + 1) == Some(&b'[') => {
                Scan::Found(Span::Text(alt.to_string()), end)
            }
            _ => Scan::Skip(1),
        },
        b'<' => html_tag(text, i),
        _ => Scan::Skip(1),
    }
}

fn run_length(bytes: &[u8], start: usize, c: u8) -> usize {
    bytes[start..].iter().take_while(|b| **b == c).count()
}

/// Position just past the code span opening at `i`, if it closes.
fn code_span_end(bytes: &[u8], i: usize) -> Option<(usize, usize)> {
    let ticks = run_length(bytes, i, b'`');
    let mut j = i + ticks;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let run = run_length(bytes, j, b'`');
            if run == ticks {
                return Some((j, j + run));
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}

fn code_span(text: &str, i: usize) -> Scan<'_> {
    let bytes = text.as_bytes();
    let ticks = run_length(bytes, i, b'`');
    match code_span_end(bytes, i) {
        Some((close, end)) => {
            let mut code = &text[i + ticks..close];
            if code.len() >= 2
                && code.starts_with(' ')
                && code.ends_with(' ')
                && !code.trim().is_empty()
            {
                code = &code[1..code.len() - 1];
            }
            Scan::Found(Span::Code(code), end)
        }
        None => Scan::Skip(ticks),
    }
}

/// Delimiter runs: the run length picks the construct.
fn delimited(text: &str, i: usize) -> Scan<'_> {
    let bytes = text.as_bytes();
    let c = bytes[i];
    let run = run_length(bytes, i, c);
    let mark = match (c, run) {
        (b'*' | b'_', 3) => Mark::BoldItalic,
        (b'*' | b'_', 2) => Mark::Bold,
        (b'*' | b'_', 1) => Mark::Italic,
        (b'~', 2) => Mark::Strike,
        (b'~', 1) => Mark::Subscript,
        (b'=', 2) => Mark::Highlight,
        (b'^', 1) => Mark::Superscript,
        _ => return Scan::Skip(run),
    };

    if mark == Mark::BoldItalic && find_closer(text, i, run, c).is_none() {
        return split_triple(text, i, c);
    }

    match find_closer(text, i, run, c) {
        Some(close) => {
            let inner = &text[i + run..close];
            let tight = matches!(mark, Mark::Subscript | Mark::Superscript);
            if tight && inner.chars().any(char::is_whitespace) {
                return Scan::Skip(run);
            }
            Scan::Found(Span::Styled { inner, mark }, close + run)
        }
        None => Scan::Skip(run),
    }
}

/// A `***` opener without a `***` closer: one emphasis level wraps the
/// other, as in `***both** italic*` or `***both* bold**`.
fn split_triple(text: &str, i: usize, c: u8) -> Scan<'_> {
    for (outer, mark) in [(1, Mark::Italic), (2, Mark::Bold)] {
        if let Some(close) = find_closer(text, i, outer, c) {
            let inner = &text[i + outer..close];
            if find_closer(inner, 0, 3 - outer, c).is_some() {
                return Scan::Found(Span::Styled { inner, mark }, close + outer);
            }
        }
    }
    Scan::Skip(3)
}

/// Find the closing run of `len` delimiters for the opener at `open`.
///
/// A longer `*`/`_` run also closes when its surplus matches a run opened
/// inside the span, so `**a *b***` closes on the last two delimiters.
fn find_closer(text: &str, open: usize, len: usize, c: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let start = open + len;

    let first = text[start..].chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    if c == b'_' && text[..open].chars().next_back().is_some_and(char::is_alphanumeric) {
        return None;
    }

    let splittable = matches!(c, b'*' | b'_');
    // Bit n set once a run of n delimiters has been seen inside the span.
    let mut inner_runs = 0u8;
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' => match code_span_end(bytes, j) {
                Some((_, end)) => j = end,
                None => j += run_length(bytes, j, b'`'),
            },
            b if b == c => {
                let run = run_length(bytes, j, c);
                let surplus = run.saturating_sub(len);
                let closes = run == len
                    || (splittable && surplus > 0 && surplus < 8 && inner_runs & (1 << surplus) != 0);
                if j > start && closes {
                    let before_ok = text[..j].chars().next_back().is_some_and(|p| !p.is_whitespace());
                    let after_ok = c != b'_'
                        || text[j + run..].chars().next().is_none_or(|n| !n.is_alphanumeric());
                    if before_ok && after_ok {
                        return Some(j + surplus);
                    }
                }
                if run < 8 {
                    inner_runs |= 1 << run;
                }
                j += run;
            }
            _ => j += 1,
        }
    }
    None
}

/// `[^label]` at `i`, returning the label and end offset.
fn footnote_ref(text: &str, i: usize) -> Option<(&str, usize)> {
    let rest = text[i..].strip_prefix("[^")?;
    let close = rest.find(']')?;
    let label = &rest[..close];
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return None;
    }
    Some((label, i + 2 + close + 1))
}

/// `[label](target "title")` at `i`; the title is dropped.
fn link(text: &str, i: usize) -> Option<(&str, String, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(i) != Some(&b'[') {
        return None;
    }

    let mut depth = 0usize;
    let mut label_end = None;
    let mut j = i;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    label_end = Some(j);
                    break;
                }
            }
            _ => {}
        }
        j += 1;
    }
    let label_end = label_end?;
    if bytes.get(label_end + 1) != Some(&b'(') {
        return None;
    }

    let dest_start = label_end + 2;
    let mut parens = 1usize;
    let mut k = dest_start;
    while k < bytes.len() {
        match bytes[k] {
            b'\\' => k += 1,
            b'(' => parens += 1,
            b')' => {
                parens -= 1;
                if parens == 0 {
                    break;
                }
            }
            _ => {}
        }
        k += 1;
    }
    if k >= bytes.len() {
        return None;
    }

    let destination = text[dest_start..k].trim();
    let target = if let Some(rest) = destination.strip_prefix('<') {
        rest.split_once('>').map(|(t, _)| t).unwrap_or(rest)
    } else {
        destination.split_whitespace().next().unwrap_or("")
    };

    Some((&text[i + 1..label_end], target.to_string(), k + 1))
}

/// HTML spellings of the emphasis constructs, plus `<code>` and `<br>`.
fn html_tag(text: &str, i: usize) -> Scan<'_> {
    let rest = &text[i + 1..];
    let name_len = rest.bytes().take_while(u8::is_ascii_alphanumeric).count();
    if name_len == 0 {
        return Scan::Skip(1);
    }
    let name = rest[..name_len].to_ascii_lowercase();
    let after_name = rest.as_bytes().get(name_len).copied();
    if !matches!(after_name, Some(b'>' | b' ' | b'/')) {
        return Scan::Skip(1);
    }
    let Some(gt) = rest.find('>') else {
        return Scan::Skip(1);
    };
    if rest[..gt].contains('<') {
        return Scan::Skip(1);
    }
    let open_end = i + 1 + gt + 1;

    if name == "br" {
        return Scan::Found(Span::Text("\n".to_string()), open_end);
    }

    let is_code = matches!(name.as_str(), "code" | "kbd");
    let mark = Mark::from_tag(&name);
    if mark.is_none() && !is_code {
        return Scan::Skip(1);
    }

    let Some(close) = closing_tag(text, open_end, &name) else {
        return Scan::Skip(1);
    };
    let inner = &text[open_end..close];
    let end = close + name.len() + 3;

    match mark {
        Some(mark) => Scan::Found(Span::Styled { inner, mark }, end),
        None => Scan::Found(Span::Code(inner), end),
    }
}

/// Offset of the `</name>` matching an opener whose content starts at `from`.
fn closing_tag(text: &str, from: usize, name: &str) -> Option<usize> {
    let lower = text[from..].to_ascii_lowercase();
    let open_a = format!("<{name}>");
    let open_b = format!("<{name} ");
    let close = format!("</{name}>");

    let mut depth = 1usize;
    let mut pos = 0;
    while pos < lower.len() {
        let rest = &lower[pos..];
        if rest.starts_with(&close) {
            depth -= 1;
            if depth == 0 {
                return Some(from + pos);
            }
            pos += close.len();
        } else if rest.starts_with(&open_a) || rest.starts_with(&open_b) {
            depth += 1;
            pos += open_a.len();
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footnotes::FootnoteTable;

    fn runs(text: &str) -> Vec<StyleRun> {
        let mut registry = FootnoteRegistry::default();
        format_inline(text, &mut registry)
    }

    fn styled(text: &str, f: impl FnOnce(&mut Style)) -> StyleRun {
        let mut style = Style::default();
        f(&mut style);
        StyleRun::new(text, style)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(runs("just text"), vec![StyleRun::plain("just text")]);
        assert!(runs("").is_empty());
    }

    #[test]
    fn test_bold_containing_italic() {
        assert_eq!(
            runs("**bold *and italic* bold**"),
            vec![
                styled("bold ", |s| s.bold = true),
                styled("and italic", |s| {
                    s.bold = true;
                    s.italic = true
                }),
                styled(" bold", |s| s.bold = true),
            ]
        );
    }

    #[test]
    fn test_italic_containing_bold() {
        assert_eq!(
            runs("*a **b** c*"),
            vec![
                styled("a ", |s| s.italic = true),
                styled("b", |s| {
                    s.bold = true;
                    s.italic = true
                }),
                styled(" c", |s| s.italic = true),
            ]
        );
    }

    #[test]
    fn test_triple_delimiters() {
        assert_eq!(
            runs("***both*** and ___both___"),
            vec![
                styled("both", |s| {
                    s.bold = true;
                    s.italic = true
                }),
                StyleRun::plain(" and "),
                styled("both", |s| {
                    s.bold = true;
                    s.italic = true
                }),
            ]
        );
    }

    #[test]
    fn test_nested_span_closing_together() {
        let both = |s: &mut Style| {
            s.bold = true;
            s.italic = true
        };
        assert_eq!(
            runs("**bold *italic***"),
            vec![styled("bold ", |s| s.bold = true), styled("italic", both)]
        );
        assert_eq!(
            runs("*italic **bold***"),
            vec![styled("italic ", |s| s.italic = true), styled("bold", both)]
        );
    }

    #[test]
    fn test_triple_opener_split() {
        let both = |s: &mut Style| {
            s.bold = true;
            s.italic = true
        };
        assert_eq!(
            runs("***bold italic** then italic*"),
            vec![styled("bold italic", both), styled(" then italic", |s| s.italic = true)]
        );
        assert_eq!(
            runs("***italic* then bold**"),
            vec![styled("italic", both), styled(" then bold", |s| s.bold = true)]
        );
        assert_eq!(runs("***open"), vec![StyleRun::plain("***open")]);
    }

    #[test]
    fn test_adjacent_italic_spans() {
        assert_eq!(
            runs("*one* and *two* then **three**"),
            vec![
                styled("one", |s| s.italic = true),
                StyleRun::plain(" and "),
                styled("two", |s| s.italic = true),
                StyleRun::plain(" then "),
                styled("three", |s| s.bold = true),
            ]
        );
    }

    #[test]
    fn test_intraword_underscore_is_literal() {
        assert_eq!(runs("snake_case_name"), vec![StyleRun::plain("snake_case_name")]);
        assert_eq!(runs("_it_"), vec![styled("it", |s| s.italic = true)]);
    }

    #[test]
    fn test_unmatched_delimiters_are_literal() {
        assert_eq!(runs("2 * 3 = 6"), vec![StyleRun::plain("2 * 3 = 6")]);
        assert_eq!(runs("**open"), vec![StyleRun::plain("**open")]);
    }

    #[test]
    fn test_code_is_terminal() {
        let code = Style {
            code: true,
            ..Style::default()
        };
        assert_eq!(
            runs("**run `*not italic*` here**"),
            vec![
                styled("run ", |s| s.bold = true),
                StyleRun::new("*not italic*", code),
                styled(" here", |s| s.bold = true),
            ]
        );
    }

    #[test]
    fn test_closer_inside_code_ignored() {
        assert_eq!(
            runs("*a `b*` c*"),
            vec![
                styled("a ", |s| s.italic = true),
                StyleRun::new(
                    "b*",
                    Style {
                        code: true,
                        ..Style::default()
                    }
                ),
                styled(" c", |s| s.italic = true),
            ]
        );
    }

    #[test]
    fn test_strike_highlight_sup_sub() {
        assert_eq!(
            runs("~~gone~~ ==lit== x^2^ H~2~O"),
            vec![
                styled("gone", |s| s.strikethrough = true),
                StyleRun::plain(" "),
                styled("lit", |s| s.highlight = true),
                StyleRun::plain(" x"),
                styled("2", |s| s.superscript = true),
                StyleRun::plain(" H"),
                styled("2", |s| s.subscript = true),
                StyleRun::plain("O"),
            ]
        );
    }

    #[test]
    fn test_tilde_path_not_subscript() {
        assert_eq!(
            runs("see ~/a and ~/b"),
            vec![StyleRun::plain("see ~/a and ~/b")]
        );
    }

    #[test]
    fn test_html_tags() {
        assert_eq!(
            runs("<b>B</b><em>I</em><u>U</u><mark>M</mark><del>D</del><sup>S</sup>"),
            vec![
                styled("B", |s| s.bold = true),
                styled("I", |s| s.italic = true),
                styled("U", |s| s.underline = true),
                styled("M", |s| s.highlight = true),
                styled("D", |s| s.strikethrough = true),
                styled("S", |s| s.superscript = true),
            ]
        );
        assert_eq!(runs("a<br>b"), vec![StyleRun::plain("a\nb")]);
        assert_eq!(runs("a < b"), vec![StyleRun::plain("a < b")]);
    }

    #[test]
    fn test_links() {
        let link = |s: &mut Style| s.link = Some("https://example.com".into());
        assert_eq!(
            runs(r#"see [the **site**](https://example.com "Example")."#),
            vec![
                StyleRun::plain("see "),
                styled("the ", link),
                styled("site", |s| {
                    link(s);
                    s.bold = true
                }),
                StyleRun::plain("."),
            ]
        );
        assert_eq!(runs("[not a link]"), vec![StyleRun::plain("[not a link]")]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(runs(r"\*not\* italic"), vec![StyleRun::plain("*not* italic")]);
    }

    #[test]
    fn test_footnote_numbering_by_first_use() {
        let mut table = FootnoteTable::new();
        table.insert("a".into(), "A".into());
        table.insert("b".into(), "B".into());
        let mut registry = FootnoteRegistry::new(table);

        let runs = format_inline("x[^b] y[^a] z[^b] w[^nope]", &mut registry);
        let sup: Vec<&str> = runs
            .iter()
            .filter(|r| r.style.superscript)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(sup, vec!["1", "2", "1"]);
        assert_eq!(runs.last().unwrap().text, " w[Missing footnote: nope]");
    }

    #[test]
    fn test_inline_image_keeps_alt() {
        assert_eq!(runs("an ![icon](i.png) here"), vec![StyleRun::plain("an icon here")]);
    }

    #[test]
    fn test_unicode_around_delimiters() {
        assert_eq!(
            runs("héllo *wörld* ünd"),
            vec![
                StyleRun::plain("héllo "),
                styled("wörld", |s| s.italic = true),
                StyleRun::plain(" ünd"),
            ]
        );
    }
}
