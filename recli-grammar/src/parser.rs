//! Grammar Parser (spec.md §4.3): a hand-written recursive-descent parser
//! over the grammar DSL, producing a normalized forest via the Algebra.
//!
//! Written the way a parser that predates a parser-generator toolkit is
//! written: by hand, over a byte cursor, tracking byte offsets for error
//! reporting — bootstrapping this grammar's own reader with `cfgrammar`-style
//! machinery would be circular (that machinery exists to parse *other*
//! languages' grammars, not this one's).

use std::fs;
use std::path::Path;

use crate::engine::Engine;
use crate::error::{EngineError, SemanticError, SemanticErrorKind, StructureError};
use crate::node::Handle;

#[derive(Clone, Debug, PartialEq, Eq)]
enum TokKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Plus,
    Star,
    Equals,
    Ellipsis,
    Word(String),
    Eof,
}

#[derive(Clone, Debug)]
struct Tok {
    kind: TokKind,
    offset: usize,
}

/// Strips a trailing `#`/`;` line comment (if any) and returns the
/// remaining line unchanged otherwise. The grammar DSL has no quoting, so a
/// naive scan for the first comment marker is unambiguous.
fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(i) => &line[..i],
        None => line,
    }
}

fn lex(line: &str) -> Result<Vec<Tok>, EngineError> {
    let bytes = line.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b' ' || b == b'\t' {
            i += 1;
            continue;
        }
        let start = i;
        let kind = match b {
            b'(' => {
                i += 1;
                TokKind::LParen
            }
            b')' => {
                i += 1;
                TokKind::RParen
            }
            b'[' => {
                i += 1;
                TokKind::LBracket
            }
            b']' => {
                i += 1;
                TokKind::RBracket
            }
            b'|' => {
                i += 1;
                TokKind::Pipe
            }
            b'+' => {
                i += 1;
                TokKind::Plus
            }
            b'*' => {
                i += 1;
                TokKind::Star
            }
            b'=' => {
                i += 1;
                TokKind::Equals
            }
            b'.' if bytes[i..].starts_with(b"...") => {
                i += 3;
                TokKind::Ellipsis
            }
            _ => {
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'(' | b')' | b'[' | b']' | b'|' | b'+' | b'*' | b'=') {
                    i += 1;
                }
                if i == start {
                    return Err(StructureError {
                        byte_offset: start,
                        message: format!("unexpected character '{}'", line[start..].chars().next().unwrap()),
                    }
                    .into());
                }
                TokKind::Word(line[start..i].to_string())
            }
        };
        toks.push(Tok { kind, offset: start });
    }
    toks.push(Tok { kind: TokKind::Eof, offset: bytes.len() });
    Ok(toks)
}

struct Parser<'e> {
    engine: &'e mut Engine,
    toks: Vec<Tok>,
    pos: usize,
}

fn structure_err(offset: usize, message: impl Into<String>) -> EngineError {
    StructureError { byte_offset: offset, message: message.into() }.into()
}

fn semantic_err(offset: usize, kind: SemanticErrorKind) -> EngineError {
    SemanticError { byte_offset: Some(offset), kind }.into()
}

impl<'e> Parser<'e> {
    fn peek(&self) -> &TokKind {
        &self.toks[self.pos].kind
    }

    fn offset(&self) -> usize {
        self.toks[self.pos].offset
    }

    fn advance(&mut self) -> TokKind {
        let k = self.toks[self.pos].kind.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        k
    }

    fn expect(&mut self, expected: TokKind, what: &str) -> Result<(), EngineError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(structure_err(self.offset(), format!("expected {}", what)))
        }
    }

    fn is_macro_name(text: &str) -> bool {
        let bytes = text.as_bytes();
        !bytes.is_empty()
            && bytes[0].is_ascii_alphabetic()
            && bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
    }

    fn resolve_word(&mut self, text: &str, offset: usize) -> Result<Handle, EngineError> {
        let base = text.split('/').next().unwrap_or(text);
        if Self::is_macro_name(base) {
            if let Some(h) = self.engine.lookup_macro(base) {
                return Ok(h);
            }
            if let Some(h) = self.engine.lookup_datatype(base) {
                return Ok(h);
            }
            return Err(structure_err(offset, format!("'{}' is not a registered macro or data-type", base)));
        }
        self.engine.build_word(text).map_err(|e| with_offset(e, offset))
    }

    /// A single term: an atom optionally followed by one `+`/`*` repetition
    /// modifier.
    fn parse_term(&mut self) -> Result<Handle, EngineError> {
        let offset = self.offset();
        let atom = match self.peek().clone() {
            TokKind::LParen => {
                self.advance();
                let inner = self.parse_alt_seq(&TokKind::RParen)?;
                self.expect(TokKind::RParen, "')'")?;
                inner
            }
            TokKind::LBracket => {
                self.advance();
                let inner = self.parse_alt_seq(&TokKind::RBracket)?;
                self.expect(TokKind::RBracket, "']'")?;
                self.engine.build_optional(inner).map_err(|e| with_offset(e, offset))?
            }
            TokKind::Ellipsis => {
                self.advance();
                self.engine.build_varargs()
            }
            TokKind::Word(text) => {
                self.advance();
                self.resolve_word(&text, offset)?
            }
            other => return Err(structure_err(offset, format!("unexpected {}", describe(&other)))),
        };
        match self.peek() {
            TokKind::Plus => {
                self.advance();
                self.engine.build_plus(atom, 1).map_err(|e| with_offset(e, offset))
            }
            TokKind::Star => {
                self.advance();
                self.engine.build_plus(atom, 0).map_err(|e| with_offset(e, offset))
            }
            _ => Ok(atom),
        }
    }

    /// A whitespace-separated sequence of terms, stopping at `|`, a closing
    /// delimiter, or end of input.
    fn parse_concat_seq(&mut self) -> Result<Handle, EngineError> {
        let start_offset = self.offset();
        let mut acc: Option<Handle> = None;
        loop {
            match self.peek() {
                TokKind::Pipe | TokKind::RParen | TokKind::RBracket | TokKind::Eof => break,
                _ => {
                    let term = self.parse_term()?;
                    acc = Some(match acc {
                        None => term,
                        Some(prev) => self.engine.build_concat(prev, term).map_err(|e| with_offset(e, start_offset))?,
                    });
                }
            }
        }
        acc.ok_or_else(|| structure_err(start_offset, "expected a term"))
    }

    /// `a | b | c`, stopping at `close`. An empty alternative (two adjacent
    /// `|`s, or a `|` right next to the closing delimiter) is a
    /// `StructureError`.
    fn parse_alt_seq(&mut self, close: &TokKind) -> Result<Handle, EngineError> {
        let mut acc = self.parse_concat_seq()?;
        while *self.peek() == TokKind::Pipe {
            let pipe_offset = self.offset();
            self.advance();
            if self.peek() == close || *self.peek() == TokKind::Pipe {
                return Err(semantic_err(pipe_offset, SemanticErrorKind::EmptyAlternation));
            }
            let rhs = self.parse_concat_seq()?;
            acc = self.engine.build_alternate(acc, rhs).map_err(|e| with_offset(e, pipe_offset))?;
        }
        Ok(acc)
    }

    fn parse_top(&mut self) -> Result<Option<Handle>, EngineError> {
        if *self.peek() == TokKind::Eof {
            return Ok(None);
        }
        if let TokKind::Word(name) = self.peek().clone() {
            if Self::is_macro_name(&name) && self.toks.get(self.pos + 1).map(|t| &t.kind) == Some(&TokKind::Equals) {
                let name_offset = self.offset();
                self.advance();
                self.advance();
                let body = self.parse_alt_seq(&TokKind::Eof)?;
                self.expect(TokKind::Eof, "end of line")?;
                reject_bare_varargs(&body, name_offset)?;
                let handle = self.engine.build_macro(&name, body).map_err(|e| with_offset(e, name_offset))?;
                self.engine.register_macro(&name, handle.clone())?;
                return Ok(Some(handle));
            }
        }
        let start_offset = self.offset();
        let body = self.parse_alt_seq(&TokKind::Eof)?;
        self.expect(TokKind::Eof, "end of line")?;
        reject_bare_varargs(&body, start_offset)?;
        Ok(Some(body))
    }
}

fn reject_bare_varargs(h: &Handle, offset: usize) -> Result<(), EngineError> {
    if h.is_varargs() {
        Err(semantic_err(offset, SemanticErrorKind::VarargsSoleElement))
    } else {
        Ok(())
    }
}

fn with_offset(err: EngineError, fallback: usize) -> EngineError {
    match err {
        EngineError::Semantic(mut e) => {
            if e.byte_offset.is_none() {
                e.byte_offset = Some(fallback);
            }
            EngineError::Semantic(e)
        }
        other => other,
    }
}

fn describe(kind: &TokKind) -> &'static str {
    match kind {
        TokKind::LParen => "'('",
        TokKind::RParen => "')'",
        TokKind::LBracket => "'['",
        TokKind::RBracket => "']'",
        TokKind::Pipe => "'|'",
        TokKind::Plus => "'+'",
        TokKind::Star => "'*'",
        TokKind::Equals => "'='",
        TokKind::Ellipsis => "'...'",
        TokKind::Word(_) => "a word",
        TokKind::Eof => "end of line",
    }
}

/// Parses a single grammar source line. Returns `Ok(None)` for blank/comment
/// lines, `Ok(Some(handle))` for a normalized grammar fragment, or a
/// structured error with a byte offset into `line`.
pub fn parse_line(engine: &mut Engine, line: &str) -> Result<Option<Handle>, EngineError> {
    let stripped = strip_comment(line).trim_end();
    if stripped.trim().is_empty() {
        return Ok(None);
    }
    let toks = lex(stripped)?;
    let mut parser = Parser { engine, toks, pos: 0 };
    parser.parse_top()
}

/// `alternate(existing, parse_line(text))`, preserving "first error wins"
/// reporting: a parse error leaves `existing` untouched.
pub fn merge_line(engine: &mut Engine, existing: Option<Handle>, text: &str) -> Result<Option<Handle>, EngineError> {
    match parse_line(engine, text)? {
        None => Ok(existing),
        Some(new_node) => match existing {
            None => Ok(Some(new_node)),
            Some(prev) => Ok(Some(engine.build_alternate(prev, new_node)?)),
        },
    }
}

/// Reads `path` line by line, folding each non-blank/non-comment line into
/// one top-level alternation via `merge_line`. On error, prints the
/// offending line with a caret at the error column to stderr and stops
/// reading further lines (spec.md §4.3, §7).
pub fn parse_file(engine: &mut Engine, path: &Path) -> Result<Option<Handle>, EngineError> {
    let contents = fs::read_to_string(path).map_err(|e| EngineError::Io(format!("{}: {}", path.display(), e)))?;
    let mut current = None;
    for (lineno, line) in contents.lines().enumerate() {
        match merge_line(engine, current, line) {
            Ok(next) => current = next,
            Err(err) => {
                tracing::debug!(path = %path.display(), line = lineno + 1, "grammar parse error");
                eprintln!("{}", crate::error::render_source_error(line, &err));
                return Err(err);
            }
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn blank_and_comment_lines_are_empty() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "").unwrap().is_none());
        assert!(parse_line(&mut e, "   ").unwrap().is_none());
        assert!(parse_line(&mut e, "# comment").unwrap().is_none());
        assert!(parse_line(&mut e, "; comment").unwrap().is_none());
    }

    #[test]
    fn sole_varargs_is_rejected() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "...").is_err());
    }

    #[test]
    fn double_plus_is_rejected() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "foo+ +").is_err());
    }

    #[test]
    fn nested_optional_collapses() {
        let mut e = Engine::new();
        let a = parse_line(&mut e, "[[foo]]").unwrap().unwrap();
        let b = parse_line(&mut e, "[foo]").unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn grouping_parens_are_transparent() {
        let mut e = Engine::new();
        let a = parse_line(&mut e, "(foo)").unwrap().unwrap();
        let b = parse_line(&mut e, "foo").unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_alternative_is_rejected() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "(foo|)").is_err());
    }

    #[test]
    fn unknown_upper_name_is_rejected() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "FROBNICATE").is_err());
    }

    #[test]
    fn registered_data_type_resolves() {
        let mut e = Engine::new();
        assert!(parse_line(&mut e, "ping IPV4ADDR").unwrap().is_some());
    }
}
