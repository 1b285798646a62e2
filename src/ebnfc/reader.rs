//! Character source: a single-character look-ahead reader over the grammar
//! text, with line/column tracking, a ring buffer of recently read
//! characters (for error context) and checkpoint/restore support used by
//! the parser's keyword-or-identifier backtracking.

use std::io::{self, Read};

const RING_SIZE: usize = 64;

/// A zero-based line, zero-based column position in the input.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    pub fn start() -> Position {
        Position { line: 1, column: 0 }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    fn advance_column(&mut self) {
        self.column += 1;
    }

    fn advance_line(&mut self) {
        self.line += 1;
        self.column = 0;
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} near position {}", self.line, self.column)
    }
}

/// Saved reader state, used by the parser to retry a trial keyword match
/// (`TOKEN`, `BYTE`, `WORD`, `DWORD`, `QWORD`) as a plain identifier.
///
/// Per the design note in spec.md §9, a parse-state checkpoint is used in
/// place of a literal putback stack since the whole grammar is buffered in
/// memory up front.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    char_pos: usize,
    ch: Option<u8>,
    pos: Position,
}

pub trait CharSource {
    /// Read one logical character into the look-ahead.
    fn advance(&mut self);

    /// The current look-ahead character, or `None` at end of input.
    fn current(&self) -> Option<u8>;

    fn pos(&self) -> Position;

    fn checkpoint(&self) -> Checkpoint;

    fn restore(&mut self, checkpoint: Checkpoint);

    /// Render and drain the ring buffer of recently accepted characters,
    /// for use in an error report.
    fn drain_context(&mut self) -> String;
}

pub struct ByteReader {
    data: Box<[u8]>,
    char_pos: usize,
    ch: Option<u8>,
    pos: Position,
    ring: [u8; RING_SIZE],
    wpos: usize,
    rpos: usize,
}

impl ByteReader {
    pub fn from_read(mut read: impl Read) -> io::Result<ByteReader> {
        let mut data = Vec::new();
        read.read_to_end(&mut data)?;
        Ok(ByteReader {
            data: data.into_boxed_slice(),
            char_pos: 0,
            ch: None,
            pos: Position::start(),
            ring: [0; RING_SIZE],
            wpos: 0,
            rpos: 0,
        })
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> ByteReader {
        ByteReader {
            data: data.into().into_boxed_slice(),
            char_pos: 0,
            ch: None,
            pos: Position::start(),
            ring: [0; RING_SIZE],
            wpos: 0,
            rpos: 0,
        }
    }

    fn next_raw(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.char_pos)?;
        self.char_pos += 1;
        Some(byte)
    }

    fn peek_raw(&self) -> Option<u8> {
        self.data.get(self.char_pos).copied()
    }

    fn store_ring(&mut self, ch: u8) {
        self.ring[self.wpos] = ch;
        self.wpos = (self.wpos + 1) & (RING_SIZE - 1);
    }
}

impl CharSource for ByteReader {
    fn advance(&mut self) {
        'retry: loop {
            let mut raw = self.next_raw();
            loop {
                let Some(byte) = raw else {
                    self.ch = None;
                    return;
                };
                match byte {
                    b'\r' => {
                        raw = self.next_raw();
                        continue;
                    }
                    b'\n' => {
                        self.pos.advance_line();
                        continue 'retry;
                    }
                    b'-' => {
                        if self.peek_raw() == Some(b'-') {
                            let _ = self.next_raw();
                            loop {
                                match self.next_raw() {
                                    None => {
                                        self.ch = None;
                                        return;
                                    }
                                    Some(b'\n') => {
                                        self.pos.advance_line();
                                        continue 'retry;
                                    }
                                    Some(_) => continue,
                                }
                            }
                        }
                        self.ch = Some(b'-');
                        self.pos.advance_column();
                        self.store_ring(b'-');
                        return;
                    }
                    _ => {
                        self.ch = Some(byte);
                        self.pos.advance_column();
                        self.store_ring(byte);
                        return;
                    }
                }
            }
        }
    }

    fn current(&self) -> Option<u8> {
        self.ch
    }

    fn pos(&self) -> Position {
        self.pos
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            char_pos: self.char_pos,
            ch: self.ch,
            pos: self.pos,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.char_pos = checkpoint.char_pos;
        self.ch = checkpoint.ch;
        self.pos = checkpoint.pos;
    }

    fn drain_context(&mut self) -> String {
        let mut buf = Vec::new();
        while self.rpos != self.wpos {
            buf.push(self.ring[self.rpos]);
            self.rpos = (self.rpos + 1) & (RING_SIZE - 1);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(reader: &mut ByteReader, n: usize) -> Vec<Option<u8>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            reader.advance();
            out.push(reader.current());
        }
        out
    }

    #[test]
    fn plain_text_is_read_verbatim() {
        let mut reader = ByteReader::from_bytes("ab".as_bytes());
        assert_eq!(chars(&mut reader, 3), vec![Some(b'a'), Some(b'b'), None]);
    }

    #[test]
    fn cr_is_silently_discarded() {
        let mut reader = ByteReader::from_bytes("a\r\nb".as_bytes());
        assert_eq!(chars(&mut reader, 3), vec![Some(b'a'), Some(b'b'), None]);
    }

    #[test]
    fn lone_dash_is_a_single_character() {
        let mut reader = ByteReader::from_bytes("a-b".as_bytes());
        assert_eq!(
            chars(&mut reader, 4),
            vec![Some(b'a'), Some(b'-'), Some(b'b'), None]
        );
    }

    #[test]
    fn double_dash_starts_a_line_comment() {
        let mut reader = ByteReader::from_bytes("a -- comment\nb".as_bytes());
        reader.advance();
        assert_eq!(reader.current(), Some(b'a'));
        reader.advance();
        assert_eq!(reader.current(), Some(b' '));
        reader.advance();
        assert_eq!(reader.current(), Some(b'b'));
        reader.advance();
        assert_eq!(reader.current(), None);
    }

    #[test]
    fn comment_can_run_to_eof_without_trailing_newline() {
        let mut reader = ByteReader::from_bytes("a -- comment".as_bytes());
        reader.advance();
        assert_eq!(reader.current(), Some(b'a'));
        reader.advance();
        assert_eq!(reader.current(), Some(b' '));
        reader.advance();
        assert_eq!(reader.current(), None);
    }

    #[test]
    fn line_and_column_track_newlines() {
        let mut reader = ByteReader::from_bytes("ab\ncd".as_bytes());
        reader.advance();
        assert_eq!(reader.pos(), Position { line: 1, column: 1 });
        reader.advance();
        assert_eq!(reader.pos(), Position { line: 1, column: 2 });
        reader.advance();
        assert_eq!(reader.pos(), Position { line: 2, column: 1 });
    }

    #[test]
    fn checkpoint_restores_exact_state() {
        let mut reader = ByteReader::from_bytes("TOKEN foo".as_bytes());
        reader.advance();
        let cp = reader.checkpoint();
        reader.advance();
        reader.advance();
        reader.restore(cp);
        assert_eq!(reader.current(), Some(b'T'));
        reader.advance();
        assert_eq!(reader.current(), Some(b'O'));
    }

    #[test]
    fn ring_buffer_captures_recently_accepted_chars() {
        let mut reader = ByteReader::from_bytes("abc -- skipped\nd".as_bytes());
        for _ in 0..5 {
            reader.advance();
        }
        let ctx = reader.drain_context();
        assert_eq!(ctx, "abc d");
    }
}
