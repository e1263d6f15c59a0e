//! Logos-based lexer for the YANG statement syntax.
//!
//! RFC 7950 §6: a source is a sequence of statements, each `keyword
//! [argument]` terminated by `;` or a `{ ... }` block. Arguments are either
//! unquoted strings or quoted strings joined with `+`.

use logos::Logos;

/// A token with its kind, text, and byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: u32,
}

/// Lexer wrapping the logos-generated tokenizer.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, RawToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: RawToken::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        let text = self.inner.slice();
        let offset = self.inner.span().start as u32;
        let kind = match raw {
            Ok(token) => token.into(),
            Err(()) => TokenKind::Error,
        };
        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire source into a Vec.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Token kinds surfaced to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Semicolon,
    LBrace,
    RBrace,
    /// Double-quoted string; supports `\"` `\\` `\n` `\t` escapes.
    DoubleQuoted,
    /// Single-quoted string; no escapes.
    SingleQuoted,
    /// An unquoted keyword or argument string. `+` is a legal unquoted
    /// character; concatenation is recognized by the parser when a lone `+`
    /// separates two quoted strings.
    Bare,
    /// Lexically invalid input.
    Error,
}

/// Logos token enum - maps to TokenKind.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
enum RawToken {
    #[token(";")]
    Semicolon,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    #[regex(r#"[^ \t\r\n;{}"']+"#)]
    Bare,
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::DoubleQuoted => TokenKind::DoubleQuoted,
            RawToken::SingleQuoted => TokenKind::SingleQuoted,
            RawToken::Bare => TokenKind::Bare,
        }
    }
}

/// Precomputed newline offsets for byte-offset → line/column conversion.
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }
}
