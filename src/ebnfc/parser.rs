//! The recursive-descent grammar parser (spec.md §4.2). Builds the shared
//! syntax tree directly; there is no separate token stream — each
//! `parse_*` method reads straight off the `CharSource`, skipping
//! whitespace itself, the way the original single-pass compiler does.
//!
//! ```text
//! identifier  := /[a-z0-9-]+/
//! str-literal := '...' | "..."
//! bin-match   := hexadecimal | bin-field
//! base-expr   := identifier | str-literal | regex | bin-match
//!              | '(' expr ')' | '[' expr ']' | '{' expr '}'
//! and-expr    := base-expr { base-expr }
//! or-expr     := and-expr  { '|' and-expr }
//! expr        := or-expr
//! production  := [ 'TOKEN' ] identifier ':=' expr '.'
//! prod-list   := production { production }
//! ```

use crate::ebnfc::binfield::{self, FIELD_WIDTHS};
use crate::ebnfc::error::{CompileError, ErrorCode, Result};
use crate::ebnfc::reader::CharSource;
use crate::ebnfc::regex_lexer;
use crate::ebnfc::tree::{Node, NodeKind, NodeRef};

pub struct Parser<'r, R> {
    reader: &'r mut R,
}

impl<'r, R: CharSource> Parser<'r, R> {
    /// Parses the entire input as a `prod-list`, the tree root.
    pub fn parse(reader: &'r mut R) -> Result<NodeRef> {
        reader.advance();
        let mut parser = Parser { reader };
        parser.parse_prod_list()
    }

    fn err_at(&mut self, code: ErrorCode, message: &str) -> CompileError {
        let context = self.reader.drain_context();
        CompileError::positional(code, message, self.reader.pos(), context)
    }

    fn unexpected_eof(&mut self) -> CompileError {
        self.err_at(ErrorCode::UnexpectedEof, "unexpected end of file")
    }

    /// Line endings are never observed here: `CharSource::advance` already
    /// folds LF into line/column bookkeeping without surfacing it (see
    /// `reader.rs`), so only space and tab remain to skip.
    fn skip_ws(&mut self) {
        while matches!(self.reader.current(), Some(b' ') | Some(b'\t')) {
            self.reader.advance();
        }
    }

    /// Consumes `expected` if present (after skipping whitespace) and
    /// returns `true`; otherwise leaves the look-ahead untouched.
    fn eat(&mut self, expected: u8) -> bool {
        self.skip_ws();
        if self.reader.current() == Some(expected) {
            self.reader.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: u8, message: &str) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.err_at(ErrorCode::ExpectedToken, message))
        }
    }

    /// `identifier := /[a-z0-9-]+/`. A leading digit is accepted; spec.md §9
    /// preserves this even though it looks unintended.
    fn read_identifier(&mut self) -> Option<String> {
        self.skip_ws();
        let mut text = String::new();
        while let Some(ch) = self.reader.current() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == b'-' {
                text.push(ch as char);
                self.reader.advance();
            } else {
                break;
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        self.read_identifier()
            .ok_or_else(|| self.err_at(ErrorCode::ExpectedIdentifier, "identifier expected"))
    }

    /// `str-literal := '\'' .+ '\'' | '"' .+ '"'`, body non-empty.
    fn read_str_literal(&mut self) -> Result<Option<String>> {
        self.skip_ws();
        let delim = match self.reader.current() {
            Some(c @ (b'\'' | b'"')) => c,
            _ => return Ok(None),
        };
        self.reader.advance();
        let mut text = String::new();
        loop {
            match self.reader.current() {
                None => return Err(self.err_at(ErrorCode::UnterminatedStringLiteral, "unterminated string literal")),
                Some(c) if c == delim => {
                    self.reader.advance();
                    break;
                }
                Some(c) => {
                    text.push(c as char);
                    self.reader.advance();
                }
            }
        }
        if text.is_empty() {
            return Err(self.err_at(ErrorCode::EmptyStringLiteral, "empty string literal"));
        }
        Ok(Some(text))
    }

    /// `bin-field := ('BYTE'|'WORD'|'DWORD'|'QWORD') [ (':'|'*') identifier ]`
    fn read_bin_field(&mut self) -> Result<Option<NodeRef>> {
        self.skip_ws();
        let width = match FIELD_WIDTHS
            .iter()
            .find(|kw| binfield::try_keyword(self.reader, kw))
        {
            Some(kw) => *kw,
            None => return Ok(None),
        };
        self.skip_ws();
        let (kind, param) = match self.reader.current() {
            Some(b':') => {
                self.reader.advance();
                let name = self.expect_identifier()?;
                (NodeKind::BinFieldCount, Some(Node::identifier(name)))
            }
            Some(b'*') => {
                self.reader.advance();
                let name = self.expect_identifier()?;
                (NodeKind::BinFieldTimes, Some(Node::identifier(name)))
            }
            _ => (NodeKind::BinField, None),
        };
        Ok(Some(Node::bin_field(kind, width, param)))
    }

    fn parse_base_expr(&mut self) -> Result<Option<NodeRef>> {
        self.skip_ws();
        if let Some(text) = self.read_identifier() {
            return Ok(Some(Node::identifier(text)));
        }
        if let Some(text) = self.read_str_literal()? {
            return Ok(Some(Node::str_literal(text)));
        }
        if let Some(text) = regex_lexer::read_regex(self.reader)? {
            return Ok(Some(Node::regex(text)));
        }
        if let Some(digits) = binfield::read_hex(self.reader)? {
            return Ok(Some(Node::bin_data(digits)));
        }
        if let Some(node) = self.read_bin_field()? {
            return Ok(Some(node));
        }
        if self.eat(b'(') {
            let inner = self.parse_expr()?;
            self.expect(b')', "missing ')' in expression")?;
            return Ok(Some(inner));
        }
        if self.eat(b'[') {
            let inner = self.parse_expr()?;
            self.expect(b']', "missing ']' in optional expression")?;
            return Ok(Some(Node::brack_expr(inner)));
        }
        if self.eat(b'{') {
            let inner = self.parse_expr()?;
            self.expect(b'}', "missing '}' in repetitive expression")?;
            return Ok(Some(Node::brace_expr(inner)));
        }
        Ok(None)
    }

    fn parse_and_expr(&mut self) -> Result<Option<NodeRef>> {
        let Some(first) = self.parse_base_expr()? else {
            return Ok(None);
        };
        let mut children = vec![first];
        while let Some(next) = self.parse_base_expr()? {
            children.push(next);
        }
        if children.len() == 1 {
            Ok(Some(children.into_iter().next().unwrap()))
        } else {
            Ok(Some(Node::and_expr(children)))
        }
    }

    fn parse_or_expr(&mut self) -> Result<Option<NodeRef>> {
        let Some(first) = self.parse_and_expr()? else {
            return Ok(None);
        };
        let mut children = vec![first];
        while self.eat(b'|') {
            let next = self
                .parse_and_expr()?
                .ok_or_else(|| self.err_at(ErrorCode::ExpectedExpression, "expression expected after '|'"))?;
            children.push(next);
        }
        if children.len() == 1 {
            Ok(Some(children.into_iter().next().unwrap()))
        } else {
            Ok(Some(Node::or_expr(children)))
        }
    }

    fn parse_expr(&mut self) -> Result<NodeRef> {
        self.parse_or_expr()?
            .ok_or_else(|| self.err_at(ErrorCode::ExpectedExpression, "expression expected"))
    }

    /// `production := [ 'TOKEN' ] identifier ':=' expr '.'`
    fn parse_production(&mut self) -> Result<Option<NodeRef>> {
        self.skip_ws();
        if self.reader.current().is_none() {
            return Ok(None);
        }
        binfield::try_keyword(self.reader, "TOKEN");
        self.skip_ws();
        let Some(name) = self.read_identifier() else {
            return Ok(None);
        };
        if !self.eat(b':') {
            return Err(self.err_at(ErrorCode::ExpectedToken, "missing ':' in production"));
        }
        if !self.eat(b'=') {
            return Err(self.err_at(ErrorCode::ExpectedToken, "missing '=' in production"));
        }
        let body = self.parse_expr()?;
        self.expect(b'.', "missing '.' terminating production")?;
        Ok(Some(Node::production(name, body)))
    }

    fn parse_prod_list(&mut self) -> Result<NodeRef> {
        let mut productions = Vec::new();
        while let Some(production) = self.parse_production()? {
            productions.push(production);
        }
        self.skip_ws();
        if productions.is_empty() {
            return Err(self.unexpected_eof());
        }
        if self.reader.current().is_some() {
            return Err(self.err_at(ErrorCode::ExpectedIdentifier, "identifier expected"));
        }
        Ok(Node::prod_list(productions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebnfc::reader::ByteReader;

    fn parse(src: &str) -> Result<NodeRef> {
        let mut reader = ByteReader::from_bytes(src.as_bytes());
        Parser::parse(&mut reader)
    }

    fn dump(root: &NodeRef) -> String {
        let mut out = String::new();
        crate::ebnfc::tree::dump(root, &mut out).unwrap();
        out
    }

    #[test]
    fn minimal_grammar() {
        let root = parse("a := 'x' .").unwrap();
        assert_eq!(dump(&root), "PROD_LIST\n  PRODUCTION 'a'\n    STR_LITERAL 'x'\n");
    }

    #[test]
    fn alternation_and_grouping_with_singleton_collapse() {
        let root = parse("x := 'a' | 'b' 'c' .").unwrap();
        assert_eq!(
            dump(&root),
            "PROD_LIST\n  PRODUCTION 'x'\n    OR_EXPR\n      STR_LITERAL 'a'\n      AND_EXPR\n        STR_LITERAL 'b'\n        STR_LITERAL 'c'\n"
        );
    }

    #[test]
    fn parentheses_group_without_a_node() {
        let root = parse("x := ('a' 'b') 'c' .").unwrap();
        assert_eq!(
            dump(&root),
            "PROD_LIST\n  PRODUCTION 'x'\n    AND_EXPR\n      STR_LITERAL 'a'\n      STR_LITERAL 'b'\n      STR_LITERAL 'c'\n"
        );
    }

    #[test]
    fn optional_and_repetitive_forms() {
        let root = parse("xs := x { ',' x } .").unwrap();
        assert_eq!(
            dump(&root),
            "PROD_LIST\n  PRODUCTION 'xs'\n    AND_EXPR\n      IDENTIFIER 'x'\n      BRACE_EXPR\n        AND_EXPR\n          STR_LITERAL ','\n          IDENTIFIER 'x'\n"
        );
    }

    #[test]
    fn token_keyword_is_accepted_and_has_no_tree_effect() {
        let root = parse("TOKEN a := 'x' .").unwrap();
        assert_eq!(dump(&root), "PROD_LIST\n  PRODUCTION 'a'\n    STR_LITERAL 'x'\n");
    }

    #[test]
    fn binary_field_with_count_parameter() {
        let root = parse("rec := BYTE:count { BYTE } .").unwrap();
        assert_eq!(
            dump(&root),
            "PROD_LIST\n  PRODUCTION 'rec'\n    AND_EXPR\n      BIN_FIELD_COUNT 'BYTE'\n        IDENTIFIER 'count'\n      BRACE_EXPR\n        BIN_FIELD 'BYTE'\n"
        );
    }

    #[test]
    fn hexadecimal_literal_with_odd_digit_padding() {
        let root = parse("x := $abc .").unwrap();
        assert_eq!(dump(&root), "PROD_LIST\n  PRODUCTION 'x'\n    BIN_DATA '0abc'\n");
    }

    #[test]
    fn leading_digit_identifier_is_accepted() {
        let root = parse("9lives := 'x' .").unwrap();
        assert_eq!(dump(&root), "PROD_LIST\n  PRODUCTION '9lives'\n    STR_LITERAL 'x'\n");
    }

    #[test]
    fn empty_string_literal_is_an_error() {
        assert!(parse("a := '' .").is_err());
    }

    #[test]
    fn unterminated_string_literal_is_an_error() {
        let err = parse("a := 'x").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnterminatedStringLiteral);
    }

    #[test]
    fn missing_terminating_period_is_an_error() {
        assert!(parse("a := 'x'").is_err());
    }

    #[test]
    fn missing_assign_is_an_error() {
        assert!(parse("a 'x' .").is_err());
    }

    #[test]
    fn bare_dollar_with_no_hex_digits_is_an_error() {
        assert!(parse("a := $ .").is_err());
    }

    #[test]
    fn multiple_productions() {
        let root = parse("a := 'x' .\nb := 'y' .").unwrap();
        assert_eq!(
            dump(&root),
            "PROD_LIST\n  PRODUCTION 'a'\n    STR_LITERAL 'x'\n  PRODUCTION 'b'\n    STR_LITERAL 'y'\n"
        );
    }
}
