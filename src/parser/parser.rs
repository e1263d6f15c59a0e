//! Recursive descent parser for the YANG statement syntax.
//!
//! Produces the declared-statement records the reactor consumes: `(keyword,
//! raw-argument, source-ref, [children])`. No semantic checking happens
//! here; argument strings stay raw until the per-keyword supports parse them
//! during `FullDeclaration`.

use std::sync::Arc;

use rayon::prelude::*;
use smol_str::SmolStr;

use super::lexer::{LineIndex, Token, TokenKind, tokenize};
use crate::base::SourceRef;
use crate::error::{ReactorError, SourceError};
use crate::model::{DeclaredStatement, StatementKeyword};

/// Parse one source into its root declared statement (`module` or
/// `submodule`).
pub fn parse_source(name: &str, text: &str) -> Result<DeclaredStatement, SourceError> {
    let tokens = tokenize(text);
    let index = LineIndex::new(text);
    let mut parser = Parser {
        tokens,
        pos: 0,
        source: Arc::from(name),
        index,
    };
    let root = parser.statement()?;
    if let Some(token) = parser.peek() {
        return Err(SourceError::syntax(
            format!("unexpected '{}' after top-level statement", token.text),
            parser.source_ref(token.offset),
        ));
    }
    if !matches!(
        root.keyword().as_core(),
        Some(crate::model::YangKeyword::Module | crate::model::YangKeyword::Submodule)
    ) {
        return Err(SourceError::syntax(
            format!(
                "expected 'module' or 'submodule' at top level, found '{}'",
                root.keyword().text()
            ),
            root.source_ref().clone(),
        ));
    }
    Ok(root)
}

/// Parse many sources in parallel. This is the only parallel boundary in the
/// pipeline; everything after it is single-threaded inside one reactor.
pub fn parse_sources(
    sources: &[(&str, &str)],
) -> Result<Vec<DeclaredStatement>, ReactorError> {
    let results: Vec<Result<DeclaredStatement, SourceError>> = sources
        .par_iter()
        .map(|(name, text)| parse_source(name, text))
        .collect();

    let mut roots = Vec::with_capacity(results.len());
    let mut issues = Vec::new();
    for result in results {
        match result {
            Ok(root) => roots.push(root),
            Err(err) => issues.push(err.into()),
        }
    }
    if issues.is_empty() {
        Ok(roots)
    } else {
        Err(ReactorError::new(issues))
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    source: Arc<str>,
    index: LineIndex,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn source_ref(&self, offset: u32) -> SourceRef {
        let (line, col) = self.index.line_col(offset);
        SourceRef::new(Arc::clone(&self.source), line, col)
    }

    fn eof_ref(&self) -> SourceRef {
        let offset = self
            .tokens
            .last()
            .map(|t| t.offset + t.text.len() as u32)
            .unwrap_or(0);
        self.source_ref(offset)
    }

    fn statement(&mut self) -> Result<DeclaredStatement, SourceError> {
        let keyword_token = self.bump().ok_or_else(|| {
            SourceError::syntax("expected statement, found end of input", self.eof_ref())
        })?;
        if keyword_token.kind != TokenKind::Bare {
            return Err(SourceError::syntax(
                format!("expected statement keyword, found '{}'", keyword_token.text),
                self.source_ref(keyword_token.offset),
            ));
        }
        let at = self.source_ref(keyword_token.offset);
        let keyword = StatementKeyword::parse(keyword_token.text);

        let raw_argument = self.argument(&at)?;

        let mut children = Vec::new();
        match self.bump() {
            Some(token) if token.kind == TokenKind::Semicolon => {}
            Some(token) if token.kind == TokenKind::LBrace => loop {
                match self.peek() {
                    Some(next) if next.kind == TokenKind::RBrace => {
                        self.bump();
                        break;
                    }
                    Some(_) => children.push(self.statement()?),
                    None => {
                        return Err(SourceError::syntax(
                            format!("unclosed block of '{}'", keyword_token.text),
                            at,
                        ));
                    }
                }
            },
            other => {
                let (text, at) = match other {
                    Some(token) => (token.text.to_string(), self.source_ref(token.offset)),
                    None => ("end of input".to_string(), self.eof_ref()),
                };
                return Err(SourceError::syntax(
                    format!("expected ';' or '{{' after '{}', found '{text}'", keyword_token.text),
                    at,
                ));
            }
        }

        Ok(DeclaredStatement::new(keyword, raw_argument, at, children))
    }

    /// Parse the optional argument: one bare token, or one or more quoted
    /// strings joined with `+`.
    fn argument(&mut self, at: &SourceRef) -> Result<Option<SmolStr>, SourceError> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        match token.kind {
            TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => Ok(None),
            TokenKind::Bare => {
                let text: SmolStr = token.text.into();
                self.bump();
                Ok(Some(text))
            }
            TokenKind::DoubleQuoted | TokenKind::SingleQuoted => {
                let mut value = String::new();
                while let Some(token) = self.bump() {
                    value.push_str(&unquote(token.text, token.kind));
                    // `"a" + "b"` concatenation
                    let next_is_plus =
                        matches!(self.peek(), Some(t) if t.kind == TokenKind::Bare && t.text == "+");
                    if !next_is_plus {
                        break;
                    }
                    self.bump();
                    match self.peek() {
                        Some(t)
                            if matches!(
                                t.kind,
                                TokenKind::DoubleQuoted | TokenKind::SingleQuoted
                            ) => {}
                        _ => {
                            return Err(SourceError::syntax(
                                "expected quoted string after '+'",
                                at.clone(),
                            ));
                        }
                    }
                }
                Ok(Some(value.into()))
            }
            TokenKind::Error => Err(SourceError::syntax(
                format!("unrecognized input '{}'", token.text),
                self.source_ref(token.offset),
            )),
        }
    }
}

fn unquote(text: &str, kind: TokenKind) -> String {
    let body = &text[1..text.len() - 1];
    if kind == TokenKind::SingleQuoted {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::YangKeyword;

    #[test]
    fn test_parse_minimal_module() {
        let root = parse_source(
            "foo.yang",
            r#"
            module foo {
                namespace "urn:foo";
                prefix foo;
            }
            "#,
        )
        .unwrap();
        assert!(root.keyword().is(YangKeyword::Module));
        assert_eq!(root.raw_argument(), Some("foo"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child_argument(YangKeyword::Namespace), Some("urn:foo"));
    }

    #[test]
    fn test_string_concatenation() {
        let root = parse_source(
            "foo.yang",
            r#"
            module foo {
                namespace "urn:foo";
                prefix foo;
                description "part one, " + 'part two';
            }
            "#,
        )
        .unwrap();
        assert_eq!(
            root.child_argument(YangKeyword::Description),
            Some("part one, part two")
        );
    }

    #[test]
    fn test_escapes_in_double_quotes() {
        let root = parse_source(
            "foo.yang",
            r#"module foo { namespace "urn:foo"; prefix foo; description "say \"hi\"\n"; }"#,
        )
        .unwrap();
        assert_eq!(
            root.child_argument(YangKeyword::Description),
            Some("say \"hi\"\n")
        );
    }

    #[test]
    fn test_source_refs_point_at_keywords() {
        let root = parse_source(
            "foo.yang",
            "module foo {\n  namespace \"urn:foo\";\n  prefix foo;\n}\n",
        )
        .unwrap();
        let ns = root.find_first(YangKeyword::Namespace).unwrap();
        assert_eq!(ns.source_ref().line(), 2);
        assert_eq!(ns.source_ref().col(), 3);
    }

    #[test]
    fn test_unclosed_block_is_rejected() {
        let err = parse_source("foo.yang", "module foo { namespace \"urn:foo\";").unwrap_err();
        assert!(err.to_string().contains("unclosed block"));
    }

    #[test]
    fn test_non_module_top_level_is_rejected() {
        let err = parse_source("foo.yang", "container foo;").unwrap_err();
        assert!(err.to_string().contains("expected 'module'"));
    }

    #[test]
    fn test_extension_statement_keyword() {
        let root = parse_source(
            "foo.yang",
            r#"module foo { namespace "urn:foo"; prefix foo; md:annotation note; }"#,
        )
        .unwrap();
        let ext = &root.children()[2];
        assert_eq!(ext.keyword().text(), "md:annotation");
    }

    #[test]
    fn test_parse_sources_aggregates_errors() {
        let err = parse_sources(&[
            ("a.yang", "module a { namespace \"urn:a\"; prefix a; }"),
            ("b.yang", "module b {"),
            ("c.yang", "nonsense"),
        ])
        .unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }
}
