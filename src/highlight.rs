//! Syntax coloring for fenced code blocks.
//!
//! Lexing is delegated to a [`Tokenizer`]; this module only maps the
//! tokenizer's classes onto a fixed palette. The default tokenizer is backed
//! by syntect's bundled grammars.

use std::sync::LazyLock;

use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Lexical class of a token, one per palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Keyword,
    String,
    Comment,
    Number,
    Function,
    Variable,
    Type,
    Tag,
    Meta,
    Default,
}

impl TokenClass {
    /// Palette color as an RGB hex string.
    pub fn color(self) -> &'static str {
        match self {
            TokenClass::Keyword => "D73A49",
            TokenClass::String => "032F62",
            TokenClass::Comment => "6A737D",
            TokenClass::Number => "005CC5",
            TokenClass::Function => "6F42C1",
            TokenClass::Variable => "E36209",
            TokenClass::Type => "22863A",
            TokenClass::Tag => "116329",
            TokenClass::Meta => "735C0F",
            TokenClass::Default => "24292E",
        }
    }

    /// Classify a TextMate-style scope name such as `string.quoted.double`.
    ///
    /// Anything unrecognised is [`TokenClass::Default`].
    pub fn from_scope(scope: &str) -> Self {
        const TABLE: &[(&str, TokenClass)] = &[
            ("comment", TokenClass::Comment),
            ("string", TokenClass::String),
            ("constant.numeric", TokenClass::Number),
            ("constant.language", TokenClass::Keyword),
            ("keyword", TokenClass::Keyword),
            ("storage.modifier", TokenClass::Keyword),
            ("storage.type", TokenClass::Type),
            ("entity.name.function", TokenClass::Function),
            ("support.function", TokenClass::Function),
            ("variable.function", TokenClass::Function),
            ("entity.name.type", TokenClass::Type),
            ("entity.name.class", TokenClass::Type),
            ("entity.name.struct", TokenClass::Type),
            ("support.type", TokenClass::Type),
            ("support.class", TokenClass::Type),
            ("entity.name.tag", TokenClass::Tag),
            ("entity.other.attribute-name", TokenClass::Variable),
            ("variable", TokenClass::Variable),
            ("meta.preprocessor", TokenClass::Meta),
            ("meta.annotation", TokenClass::Meta),
            ("meta.decorator", TokenClass::Meta),
        ];

        TABLE
            .iter()
            .find(|(prefix, _)| {
                scope
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
            })
            .map(|(_, class)| *class)
            .unwrap_or(TokenClass::Default)
    }
}

/// A classified slice of source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub class: TokenClass,
}

/// Why a code block could not be highlighted.
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

/// External lexer used for code coloring.
pub trait Tokenizer: Send + Sync {
    /// Split `code` into classified tokens whose texts concatenate to `code`.
    fn tokenize(&self, code: &str, language: &str) -> Result<Vec<Token>, HighlightError>;
}

/// [`Tokenizer`] backed by syntect's default grammars.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectTokenizer;

impl SyntectTokenizer {
    /// Classify the innermost scope on the stack that maps to a palette entry.
    fn classify(stack: &ScopeStack) -> TokenClass {
        stack
            .as_slice()
            .iter()
            .rev()
            .map(|scope: &Scope| TokenClass::from_scope(&scope.build_string()))
            .find(|class| *class != TokenClass::Default)
            .unwrap_or(TokenClass::Default)
    }
}

impl Tokenizer for SyntectTokenizer {
    fn tokenize(&self, code: &str, language: &str) -> Result<Vec<Token>, HighlightError> {
        let syntax = SYNTAX_SET
            .find_syntax_by_token(language)
            .ok_or_else(|| HighlightError::UnsupportedLanguage(language.to_string()))?;

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut tokens = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ops = state
                .parse_line(line, &SYNTAX_SET)
                .map_err(|e| HighlightError::Tokenizer(e.to_string()))?;

            let mut last = 0;
            for (offset, op) in ops {
                if offset > last {
                    push_token(&mut tokens, &line[last..offset], Self::classify(&stack));
                    last = offset;
                }
                stack
                    .apply(&op)
                    .map_err(|e| HighlightError::Tokenizer(format!("{e:?}")))?;
            }
            if last < line.len() {
                push_token(&mut tokens, &line[last..], Self::classify(&stack));
            }
        }

        Ok(tokens)
    }
}

fn push_token(tokens: &mut Vec<Token>, text: &str, class: TokenClass) {
    match tokens.last_mut() {
        Some(last) if last.class == class => last.text.push_str(text),
        _ => tokens.push(Token {
            text: text.to_string(),
            class,
        }),
    }
}

/// Highlight `code`, or explain why it stays plain.
///
/// Blocks without a language tag are never highlighted and return an empty
/// token list without error.
pub fn highlight(
    tokenizer: &dyn Tokenizer,
    code: &str,
    language: Option<&str>,
) -> Result<Vec<Token>, HighlightError> {
    let Some(language) = language.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(Vec::new());
    };
    tokenizer.tokenize(code, language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_classes() {
        assert_eq!(TokenClass::from_scope("comment.line.double-slash.rust"), TokenClass::Comment);
        assert_eq!(TokenClass::from_scope("string.quoted.double"), TokenClass::String);
        assert_eq!(TokenClass::from_scope("constant.numeric.integer"), TokenClass::Number);
        assert_eq!(TokenClass::from_scope("keyword.control"), TokenClass::Keyword);
        assert_eq!(TokenClass::from_scope("entity.name.function.rust"), TokenClass::Function);
        assert_eq!(TokenClass::from_scope("entity.name.tag.html"), TokenClass::Tag);
        assert_eq!(TokenClass::from_scope("source.rust"), TokenClass::Default);
        assert_eq!(TokenClass::from_scope("keywordish"), TokenClass::Default);
    }

    #[test]
    fn test_every_class_has_color() {
        for class in [
            TokenClass::Keyword,
            TokenClass::String,
            TokenClass::Comment,
            TokenClass::Number,
            TokenClass::Function,
            TokenClass::Variable,
            TokenClass::Type,
            TokenClass::Tag,
            TokenClass::Meta,
            TokenClass::Default,
        ] {
            assert_eq!(class.color().len(), 6);
        }
    }

    #[test]
    fn test_syntect_tokens_cover_input() {
        let code = "fn main() {\n    // hi\n    let x = \"s\";\n}\n";
        let tokens = SyntectTokenizer.tokenize(code, "rust").unwrap();
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, code);
        assert!(tokens.iter().any(|t| t.class == TokenClass::Keyword));
        assert!(tokens.iter().any(|t| t.class == TokenClass::Comment));
        assert!(tokens.iter().any(|t| t.class == TokenClass::String));
    }

    #[test]
    fn test_unknown_language_is_error() {
        let result = SyntectTokenizer.tokenize("x", "no-such-language");
        assert!(matches!(result, Err(HighlightError::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_no_language_stays_plain() {
        assert!(highlight(&SyntectTokenizer, "x = 1", None).unwrap().is_empty());
        assert!(highlight(&SyntectTokenizer, "x = 1", Some("  ")).unwrap().is_empty());
    }
}
