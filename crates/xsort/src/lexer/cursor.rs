//! Byte cursor over markup input
//!
//! Columns count characters, not bytes: UTF-8 continuation bytes do not
//! move the column.

use crate::error::Pos;

#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    here: Pos,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            here: Pos::new(0, 1, 1),
        }
    }

    /// Byte under the cursor
    pub fn current(&self) -> Option<u8> {
        self.peek(0)
    }

    /// Byte `ahead` positions past the cursor
    pub fn peek(&self, ahead: usize) -> Option<u8> {
        self.input
            .get(self.here.offset.saturating_add(ahead))
            .copied()
    }

    pub fn starts_with(&self, pattern: &[u8]) -> bool {
        self.remaining().starts_with(pattern)
    }

    pub fn advance(&mut self) {
        let Some(b) = self.current() else {
            return;
        };
        self.here.offset += 1;
        if b == b'\n' {
            self.here.line += 1;
            self.here.col = 1;
        } else if b & 0xC0 != 0x80 {
            self.here.col += 1;
        }
    }

    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Step over `pattern` if the input continues with it
    pub fn eat(&mut self, pattern: &[u8]) -> bool {
        if self.starts_with(pattern) {
            self.advance_by(pattern.len());
            true
        } else {
            false
        }
    }

    /// Consume a single byte if it matches
    pub fn consume(&mut self, expected: u8) -> bool {
        self.eat(&[expected])
    }

    /// Skip XML whitespace (space, tab, CR, LF)
    pub fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }

    /// Consume everything up to and including `terminator`, returning the
    /// bytes before it. At end of input nothing is returned and the cursor
    /// is left at the end.
    pub fn take_until(&mut self, terminator: &[u8]) -> Option<&'a [u8]> {
        let start = self.pos();
        while !self.is_eof() {
            if self.starts_with(terminator) {
                let taken = self.slice_from(start);
                self.advance_by(terminator.len());
                return Some(taken);
            }
            self.advance();
        }
        None
    }

    pub const fn position(&self) -> Pos {
        self.here
    }

    pub const fn is_eof(&self) -> bool {
        self.here.offset >= self.input.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.here.offset..).unwrap_or_default()
    }

    /// Byte offset of the cursor
    pub const fn pos(&self) -> usize {
        self.here.offset
    }

    /// Input consumed since offset `start`
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        self.input.get(start..self.here.offset).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_advance() {
        let mut cursor = Cursor::new(b"<a/>");
        assert_eq!(cursor.current(), Some(b'<'));
        assert_eq!(cursor.peek(3), Some(b'>'));
        assert_eq!(cursor.peek(4), None);
        cursor.advance();
        assert_eq!(cursor.current(), Some(b'a'));
        assert_eq!(cursor.position(), Pos::new(1, 1, 2));
    }

    #[test]
    fn test_lines_and_columns() {
        let mut cursor = Cursor::new(b"  \t\n<r/>");
        cursor.skip_whitespace();
        assert_eq!(cursor.current(), Some(b'<'));
        assert_eq!(cursor.position(), Pos::new(4, 2, 1));
    }

    #[test]
    fn test_columns_count_chars() {
        let mut cursor = Cursor::new("é<".as_bytes());
        cursor.advance_by(2);
        assert_eq!(cursor.current(), Some(b'<'));
        assert_eq!(cursor.position().col, 2);
    }

    #[test]
    fn test_eat_and_consume() {
        let mut cursor = Cursor::new(b"<!--x-->");
        assert!(!cursor.eat(b"<?"));
        assert!(cursor.eat(b"<!--"));
        assert!(!cursor.consume(b'-'));
        assert!(cursor.consume(b'x'));
        assert!(cursor.starts_with(b"-->"));
    }

    #[test]
    fn test_take_until() {
        let mut cursor = Cursor::new(b"data]]>tail");
        assert_eq!(cursor.take_until(b"]]>"), Some(&b"data"[..]));
        assert_eq!(cursor.remaining(), b"tail");
        assert_eq!(cursor.take_until(b"]]>"), None);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_slice_from() {
        let mut cursor = Cursor::new(b"hello world");
        let start = cursor.pos();
        cursor.advance_by(3);
        assert_eq!(cursor.slice_from(start), b"hel");
    }
}
