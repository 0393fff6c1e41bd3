//! Styled inline runs.

use serde::Serialize;

/// The formatting applied to a run.
///
/// `code` never combines with emphasis; [`Style::code`] is the only way the
/// inline formatter builds a code style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub highlight: bool,
    pub underline: bool,
    pub superscript: bool,
    pub subscript: bool,
    /// Hyperlink target. Rendered underlined in the accent color.
    pub link: Option<String>,
}

impl Style {
    /// Plain code style, keeping only the link target of `outer`.
    pub fn code(outer: &Style) -> Self {
        Self {
            code: true,
            link: outer.link.clone(),
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A contiguous span of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleRun {
    pub text: String,
    pub style: Style,
}

impl StyleRun {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::default())
    }
}

/// Drop empty runs and join neighbours with identical styles.
pub fn merge_runs(runs: Vec<StyleRun>) -> Vec<StyleRun> {
    let mut merged: Vec<StyleRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.style == run.style => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_runs() {
        let bold = Style {
            bold: true,
            ..Style::default()
        };
        let runs = vec![
            StyleRun::plain("a"),
            StyleRun::plain(""),
            StyleRun::plain("b"),
            StyleRun::new("c", bold.clone()),
            StyleRun::new("d", bold),
        ];
        let merged = merge_runs(runs);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "ab");
        assert_eq!(merged[1].text, "cd");
    }

    #[test]
    fn test_code_style_drops_emphasis() {
        let outer = Style {
            bold: true,
            italic: true,
            link: Some("https://example.com".into()),
            ..Style::default()
        };
        let code = Style::code(&outer);
        assert!(code.code && !code.bold && !code.italic);
        assert_eq!(code.link.as_deref(), Some("https://example.com"));
    }
}
