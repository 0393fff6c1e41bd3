//! Cached regex patterns for preprocessing and block parsing.
//!
//! Uses LazyLock to compile patterns once on first use. All patterns operate
//! on a single line unless noted.

use regex_lite::Regex;
use std::sync::LazyLock;

// === Preprocessor patterns ===

/// Matches `[[Page]]`, `[[Page#Section]]`, `[[Page|Alias]]`, with an optional
/// leading `!` marking an embed.
pub static WIKI_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\]|#]*)(?:#([^\]|]*))?(?:\|([^\]]*))?\]\]").unwrap()
});

/// Matches a section link target `](#Some Section)`.
pub static SECTION_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\(#([^)]+)\)").unwrap());

/// Matches an admonition opener `> [!TYPE]` with optional fold marker and title.
pub static CALLOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*(?:>\s*)+)\[!([A-Za-z]+)\][+-]?\s*(.*)$").unwrap()
});

/// Matches a reference definition `[label]: url "optional title"`.
pub static REFERENCE_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s{0,3}\[([^\]^][^\]]*)\]:\s+<?([^\s>]+)>?(?:\s+["'(].*["')])?\s*$"#).unwrap()
});

/// Matches full and collapsed reference links `[text][label]`, `[text][]`.
pub static REFERENCE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\[([^\]]*)\]").unwrap());

/// Matches inline math `$x$`. The closing `$` must not be followed by a digit;
/// group 2 holds the character after it.
pub static INLINE_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^\s$](?:[^$]*[^\s$])?)\$([^0-9]|$)").unwrap());

/// Matches single-line block math `$$x$$`.
pub static BLOCK_MATH_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\$\$(.+)\$\$\s*$").unwrap());

/// Matches angle-bracket autolinks `<https://...>` and `<mailto:...>`.
pub static AUTOLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<((?:https?|ftp|mailto):[^\s<>]+)>").unwrap());

/// Matches a setext level-1 underline.
pub static SETEXT_H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}=+\s*$").unwrap());

/// Matches a setext level-2 underline.
pub static SETEXT_H2_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}-+\s*$").unwrap());

// === Footnote patterns ===

/// Matches a footnote definition `[^label]: text`.
pub static FOOTNOTE_DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]]+)\]:\s*(.*)$").unwrap());

// === Chunk patterns ===

/// Matches a level 1-3 heading line, where chunks may start.
pub static CHUNK_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,3}\s").unwrap());

// === Block parser patterns ===

/// Matches an ATX heading.
pub static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").unwrap());

/// Matches a task item `- [ ] text` / `- [x] text`.
pub static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+]\s+\[([ xX])\]\s+(.*)$").unwrap());

/// Matches an unordered list item.
pub static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+]\s+(.*)$").unwrap());

/// Matches an ordered list item.
pub static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)\d{1,9}[.)]\s+(.*)$").unwrap());

/// Matches a blockquote line; group 1 holds the `>` markers.
pub static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}((?:>\s?)+)(.*)$").unwrap());

/// Matches an inline-style image occupying the whole line.
pub static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*!\[([^\]]*)\]\(\s*(<[^>]+>|[^\s)]+)(?:\s+"[^"]*")?\s*\)\s*$"#).unwrap()
});

/// Matches an embedded resource `![[name|size]]` occupying the whole line.
pub static EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*!\[\[([^\]|]+)(?:\|([^\]]*))?\]\]\s*$").unwrap());

/// Matches a size suffix `300` or `300x200`.
pub static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\s*[xX]\s*(\d+))?\s*$").unwrap());

/// Matches a definition line `: text`.
pub static DEFINITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:\s+(.+)$").unwrap());

/// Matches `<summary>text</summary>`.
pub static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<summary>(.*?)</summary>").unwrap());

// === Serializer patterns ===

/// Matches the normalized callout marker line `**TYPE: title**`.
pub static CALLOUT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([A-Z]+):\s*(.*?)\*\*\s*$").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_strips_closing_hashes() {
        let caps = HEADING_RE.captures("## Title ##").unwrap();
        assert_eq!(&caps[1], "##");
        assert_eq!(&caps[2], "Title");
        assert!(HEADING_RE.captures("#NoSpace").is_none());
        assert!(HEADING_RE.captures("####### seven").is_none());
    }

    #[test]
    fn test_inline_math_skips_currency() {
        assert!(INLINE_MATH_RE.is_match("where $x^2$ holds"));
        assert!(!INLINE_MATH_RE.is_match("costs $5 and $10"));
    }

    #[test]
    fn test_image_pattern() {
        let caps = IMAGE_RE.captures("![Alt|300](img/a.png)").unwrap();
        assert_eq!(&caps[1], "Alt|300");
        assert_eq!(&caps[2], "img/a.png");
        let caps = IMAGE_RE.captures(r#"![x](<my file.png> "title")"#).unwrap();
        assert_eq!(&caps[2], "<my file.png>");
        assert!(IMAGE_RE.captures("text ![x](a.png)").is_none());
    }

    #[test]
    fn test_reference_definition() {
        let caps = REFERENCE_DEF_RE
            .captures(r#"[Docs]: https://example.com "Title""#)
            .unwrap();
        assert_eq!(&caps[1], "Docs");
        assert_eq!(&caps[2], "https://example.com");
        assert!(REFERENCE_DEF_RE.captures("[^1]: a footnote").is_none());
    }
}
