use serde::Serialize;

use crate::span::Span;

/// A token handed over by the Tarn tokenizer, or minted by a rewrite.
///
/// Tokens are kept in the syntax tree so that regenerated source text
/// round-trips, including through synthesized structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Create a new token from a kind, its source text, and byte offsets.
    pub fn new(kind: TokenKind, text: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            span: Span::new(start, end),
        }
    }

    /// Mint a zero-width keyword token at `offset`.
    ///
    /// Used by the desugar pass for injected `else`, `new`, `on`, `let`,
    /// `break`, `repeat`, `if` and `then` keywords.
    pub fn keyword(keyword: Keyword, offset: u32) -> Self {
        Self {
            kind: TokenKind::Keyword(keyword),
            text: keyword.text().to_string(),
            span: Span::at(offset),
        }
    }

    /// Mint a zero-width token of any category at `offset`.
    pub fn synthesized(kind: TokenKind, text: impl Into<String>, offset: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            span: Span::at(offset),
        }
    }

    /// Whether this token was minted rather than read from source.
    pub fn is_synthesized(&self) -> bool {
        self.span.is_empty() && !self.text.is_empty()
    }
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    Number,
    String,
    Symbol,
    Operator,
    Punctuation,
    Whitespace,
    Comment,
}

/// Reserved words of the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    If,
    Then,
    Else,
    While,
    Do,
    Repeat,
    Break,
    Return,
    Let,
    Var,
    New,
    On,
    Fn,
    Not,
    And,
    Or,
}

impl Keyword {
    /// Source spelling of the keyword.
    pub fn text(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::Repeat => "repeat",
            Keyword::Break => "break",
            Keyword::Return => "return",
            Keyword::Let => "let",
            Keyword::Var => "var",
            Keyword::New => "new",
            Keyword::On => "on",
            Keyword::Fn => "fn",
            Keyword::Not => "not",
            Keyword::And => "and",
            Keyword::Or => "or",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_keyword_is_zero_width() {
        let tok = Token::keyword(Keyword::Else, 12);
        assert_eq!(tok.text, "else");
        assert_eq!(tok.span, Span::at(12));
        assert!(tok.is_synthesized());
    }

    #[test]
    fn source_token_is_not_synthesized() {
        let tok = Token::new(TokenKind::Identifier, "x", 0, 1);
        assert!(!tok.is_synthesized());
        assert_eq!(tok.span.len(), 1);
    }
}
