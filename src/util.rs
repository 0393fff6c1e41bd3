//! Small text utilities shared across the pipeline.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding
/// 3. Falls back to Windows-1252 (common in files from older editors)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Generate a GitHub-style slug from text.
///
/// Converts text to lowercase, replaces spaces and special characters with hyphens,
/// and removes consecutive/leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Word bookmark name for a heading slug.
///
/// Bookmark names may not contain hyphens and are limited to 40 characters.
/// The leading underscore hides them from the bookmark dialog.
pub fn bookmark_name(slug: &str) -> String {
    let mut name = String::with_capacity(slug.len() + 1);
    name.push('_');
    for c in slug.chars().take(39) {
        name.push(if c == '-' { '_' } else { c });
    }
    name
}

/// Count leading indentation, with tabs as four columns.
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_cp1252_fallback() {
        // 0x93/0x94 are curly quotes in Windows-1252 and invalid UTF-8.
        assert_eq!(decode_text(&[0x93, b'h', b'i', 0x94], None), "\u{201C}hi\u{201D}");
    }

    #[test]
    fn test_slugify_simple() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("snake_case"), "snake-case");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_bookmark_name() {
        assert_eq!(bookmark_name("getting-started"), "_getting_started");
        assert_eq!(bookmark_name(&"a".repeat(60)).len(), 40);
    }

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("    x"), 4);
        assert_eq!(indent_width("\t- x"), 4);
        assert_eq!(indent_width("x"), 0);
    }
}
