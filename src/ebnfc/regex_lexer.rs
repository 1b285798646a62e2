//! A nested mini-lexer for the embedded regular-expression dialect
//! (spec.md §4.2). Whitespace skipping is disabled here: every accepted
//! character — including the ones making up an escape sequence — is
//! copied verbatim into the regex text buffer. The outer `/.../` delimiters
//! are consumed but not stored.
//!
//! Grammar:
//! ```text
//! re-expr        := re-or-expr
//! re-or-expr     := re-and-expr { '|' re-and-expr }
//! re-and-expr    := re-repeat-expr { re-repeat-expr }
//! re-repeat-expr := re-base-expr [ '+' | '*' | '?' ]
//! re-base-expr   := re-cc | re-chr | re-any | '(' re-expr ')'
//! re-cc          := '[' [ '^' ] re-cc-item+ ']'
//! re-cc-item     := re-cc-chr [ '-' re-cc-chr ]
//! re-chr         := '\' /./ | /[^\/.*?[(|]/
//! re-cc-chr      := '\' /./ | /[^\\\]]/
//! re-any         := '.'
//! ```

use crate::ebnfc::error::{CompileError, ErrorCode, Result};
use crate::ebnfc::reader::CharSource;

struct RegexLexer<'r, R> {
    reader: &'r mut R,
    buf: String,
}

impl<'r, R: CharSource> RegexLexer<'r, R> {
    fn cur(&self) -> Option<u8> {
        self.reader.current()
    }

    fn advance(&mut self) {
        self.reader.advance();
    }

    fn store(&mut self, ch: u8) {
        self.buf.push(ch as char);
    }

    fn unexpected_eof(&mut self) -> CompileError {
        let context = self.reader.drain_context();
        CompileError::positional(
            ErrorCode::UnexpectedEof,
            "unexpected end of file",
            self.reader.pos(),
            context,
        )
    }

    fn err_at(&mut self, code: ErrorCode, message: &str) -> CompileError {
        let context = self.reader.drain_context();
        CompileError::positional(code, message, self.reader.pos(), context)
    }

    fn read_any(&mut self) -> bool {
        if self.cur() != Some(b'.') {
            return false;
        }
        self.store(b'.');
        self.advance();
        true
    }

    fn read_chr(&mut self) -> Result<bool> {
        match self.cur() {
            None => Err(self.unexpected_eof()),
            Some(b'\\') => {
                self.advance();
                match self.cur() {
                    None => Err(self.unexpected_eof()),
                    Some(escaped) => {
                        self.store(b'\\');
                        self.store(escaped);
                        self.advance();
                        Ok(true)
                    }
                }
            }
            Some(c) => {
                if matches!(c, b'/' | b'.' | b'*' | b'?' | b'[' | b'(' | b'|') {
                    return Ok(false);
                }
                self.store(c);
                self.advance();
                Ok(true)
            }
        }
    }

    fn read_cc_chr(&mut self) -> Result<bool> {
        match self.cur() {
            None => Err(self.unexpected_eof()),
            Some(b'\\') => {
                self.advance();
                match self.cur() {
                    None => Err(self.unexpected_eof()),
                    Some(escaped) => {
                        self.store(b'\\');
                        self.store(escaped);
                        self.advance();
                        Ok(true)
                    }
                }
            }
            Some(c) => {
                if matches!(c, b'\\' | b']') {
                    return Ok(false);
                }
                self.store(c);
                self.advance();
                Ok(true)
            }
        }
    }

    fn read_cc_item(&mut self) -> Result<bool> {
        if !self.read_cc_chr()? {
            return Ok(false);
        }
        if self.cur() == Some(b'-') {
            self.store(b'-');
            self.advance();
            if !self.read_cc_chr()? {
                return Err(self.err_at(
                    ErrorCode::MalformedCharacterClass,
                    "bad character class in regular expression",
                ));
            }
        }
        Ok(true)
    }

    fn read_cc_items(&mut self) -> Result<bool> {
        if !self.read_cc_item()? {
            return Ok(false);
        }
        while self.read_cc_item()? {}
        Ok(true)
    }

    fn read_cc(&mut self) -> Result<bool> {
        if self.cur() != Some(b'[') {
            return Ok(false);
        }
        self.store(b'[');
        self.advance();
        if self.cur() == Some(b'^') {
            self.store(b'^');
            self.advance();
        }
        if !self.read_cc_items()? || self.cur() != Some(b']') {
            return Err(self.err_at(
                ErrorCode::MalformedCharacterClass,
                "bad character class in regular expression",
            ));
        }
        self.store(b']');
        self.advance();
        Ok(true)
    }

    fn read_base_expr(&mut self) -> Result<bool> {
        if self.read_cc()? || self.read_chr()? || self.read_any() {
            return Ok(true);
        }
        if self.cur() != Some(b'(') {
            return Ok(false);
        }
        self.store(b'(');
        self.advance();
        if !self.read_expr()? || self.cur() != Some(b')') {
            return Err(self.err_at(
                ErrorCode::ExpectedExpression,
                "expression expected in regular expression",
            ));
        }
        self.store(b')');
        self.advance();
        Ok(true)
    }

    fn read_repeat_expr(&mut self) -> Result<bool> {
        if !self.read_base_expr()? {
            return Ok(false);
        }
        if matches!(self.cur(), Some(b'+') | Some(b'*') | Some(b'?')) {
            self.store(self.cur().unwrap());
            self.advance();
        }
        Ok(true)
    }

    fn read_and_expr(&mut self) -> Result<bool> {
        if !self.read_repeat_expr()? {
            return Ok(false);
        }
        while self.read_repeat_expr()? {}
        Ok(true)
    }

    fn read_or_expr(&mut self) -> Result<bool> {
        if !self.read_and_expr()? {
            return Ok(false);
        }
        loop {
            if self.cur() != Some(b'|') {
                break;
            }
            self.store(b'|');
            self.advance();
            if !self.read_and_expr()? {
                return Err(self.err_at(
                    ErrorCode::ExpectedExpression,
                    "expression expected in regular expression",
                ));
            }
        }
        Ok(true)
    }

    fn read_expr(&mut self) -> Result<bool> {
        self.read_or_expr()
    }
}

/// Reads `/ re-expr /` starting with the look-ahead on the opening `/` and
/// returns the body text (delimiters stripped). Returns `Ok(None)` without
/// consuming anything if the look-ahead isn't `/`.
pub fn read_regex<R: CharSource>(reader: &mut R) -> Result<Option<String>> {
    if reader.current() != Some(b'/') {
        return Ok(None);
    }
    reader.advance();
    let mut lexer = RegexLexer {
        reader,
        buf: String::new(),
    };
    if !lexer.read_expr()? {
        return Err(lexer.err_at(ErrorCode::ExpectedExpression, "regular expression expected"));
    }
    if lexer.cur() != Some(b'/') {
        return Err(lexer.err_at(
            ErrorCode::ExpectedToken,
            "delimiter '/' expected after regular expression",
        ));
    }
    lexer.advance();
    Ok(Some(lexer.buf))
}
