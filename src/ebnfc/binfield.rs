//! Lexical helpers for the binary-field match grammar (spec.md §4.2):
//! hexadecimal literals (`$1a2b`) and the `BYTE`/`WORD`/`DWORD`/`QWORD`
//! field-width keywords, plus the `TOKEN` production modifier. These are
//! matched character-by-character; on a partial mismatch the reader is
//! rewound to the checkpoint taken before the trial started, so the same
//! prefix can be retried as a plain identifier by the caller.

use crate::ebnfc::error::{CompileError, ErrorCode, Result};
use crate::ebnfc::reader::CharSource;

/// Tries to match `keyword` exactly (case-sensitive, byte-for-byte) at the
/// current look-ahead. On success, the look-ahead is left on the character
/// just past the keyword. On failure, the reader is restored to the
/// checkpoint taken before the attempt, so nothing is consumed.
pub fn try_keyword<R: CharSource>(reader: &mut R, keyword: &str) -> bool {
    let checkpoint = reader.checkpoint();
    for expected in keyword.bytes() {
        if reader.current() != Some(expected) {
            reader.restore(checkpoint);
            return false;
        }
        reader.advance();
    }
    true
}

/// `hexadecimal := '$' [0-9a-fA-F]+`. Returns the normalised (even-length)
/// digit string with a leading `0` nibble prepended if the parsed digit
/// count was odd. Returns `Ok(None)` without consuming anything if the
/// look-ahead isn't `$`. At least one hex digit is required after `$`;
/// a bare `$` is a fatal error, not an empty-text `BIN_DATA` node.
pub fn read_hex<R: CharSource>(reader: &mut R) -> Result<Option<String>> {
    if reader.current() != Some(b'$') {
        return Ok(None);
    }
    reader.advance();
    let mut digits = String::new();
    while let Some(ch) = reader.current() {
        if ch.is_ascii_hexdigit() {
            digits.push(ch as char);
            reader.advance();
        } else {
            break;
        }
    }
    if digits.is_empty() {
        let context = reader.drain_context();
        return Err(CompileError::positional(
            ErrorCode::ExpectedHexDigit,
            "hex digit expected after '$'",
            reader.pos(),
            context,
        ));
    }
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }
    Ok(Some(digits))
}

pub const FIELD_WIDTHS: [&str; 4] = ["BYTE", "WORD", "DWORD", "QWORD"];
