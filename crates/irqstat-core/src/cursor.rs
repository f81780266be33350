//! Forward-only scanner over a single line of pseudo-file text.
//!
//! Both `/proc/interrupts` and the `*_list` files under `/proc/irq/N/` are
//! parsed with this instead of `str::split_whitespace` so that a line is
//! walked exactly once and nothing gets allocated per field.

/// Byte cursor over one line. The line is borrowed and only valid for the
/// current parsing step; the position never moves backwards.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current parsing position within the line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unparsed remainder of the line.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Returns `true` once the end of the line has been reached.
    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Skips over space (0x20) characters. Tabs are not separators in the
    /// kernel's formats and are left alone.
    ///
    /// Returns `true` if the end of the line was reached while skipping.
    pub fn skip_spaces(&mut self) -> bool {
        while let Some(&b' ') = self.buf.get(self.pos) {
            self.pos += 1;
        }
        self.at_end()
    }

    /// Skips `text` if the line continues with it, otherwise leaves the
    /// position untouched.
    pub fn skip_literal(&mut self, text: &str) -> bool {
        if self.rest().starts_with(text.as_bytes()) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    /// Parses the maximal run of ASCII digits at the current position.
    ///
    /// At least one digit is required. A run whose value does not fit into a
    /// `u64` is rejected as a whole. On failure the position is unchanged.
    pub fn parse_u64(&mut self) -> Option<u64> {
        let digits = self
            .rest()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let mut value: u64 = 0;
        for &b in &self.buf[self.pos..self.pos + digits] {
            value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        }
        self.pos += digits;
        Some(value)
    }

    /// Like [`Cursor::parse_u64`], but additionally rejects values that do
    /// not fit into a `u32` (IRQ and CPU numbers).
    pub fn parse_u32(&mut self) -> Option<u32> {
        let start = self.pos;
        let value = self.parse_u64()?;
        match u32::try_from(value) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    /// Counts the space-separated fields from the current position to the
    /// end of the line without consuming anything.
    pub fn count_fields(&self) -> usize {
        self.rest()
            .split(|&b| b == b' ')
            .filter(|field| !field.is_empty())
            .count()
    }

    /// Consumes and returns a single byte.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<u8> {
        let b = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Returns the byte at the current position without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_end() {
        assert!(Cursor::new(b"").at_end());

        let mut cur = Cursor::new(b"foo");
        assert!(!cur.at_end());
        cur.pos += 3;
        assert!(cur.at_end());
    }

    #[test]
    fn test_skip_spaces_reports_end() {
        let mut cur = Cursor::new(b"   ");
        assert!(cur.skip_spaces());
        assert_eq!(cur.position(), 3);
    }

    #[test]
    fn test_skip_spaces_stops_at_text() {
        let mut cur = Cursor::new(b"   foo");
        assert!(!cur.skip_spaces());
        assert_eq!(cur.position(), 3);
    }

    #[test]
    fn test_skip_spaces_ignores_tabs() {
        let mut cur = Cursor::new(b"\t 1");
        assert!(!cur.skip_spaces());
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn test_skip_literal() {
        let mut cur = Cursor::new(b"foobar");
        assert!(cur.skip_literal("foo"));
        assert_eq!(cur.position(), 3);

        let mut cur = Cursor::new(b"bar");
        assert!(!cur.skip_literal("baz"));
        assert_eq!(cur.position(), 0);
        assert!(!cur.skip_literal("barz"));
        assert_eq!(cur.position(), 0);
        assert!(cur.skip_literal("bar"));
        assert_eq!(cur.position(), 3);
        assert!(!cur.skip_literal("x"));
    }

    #[test]
    fn test_parse_u64_requires_digit() {
        for input in [&b""[..], b"foo", b"!!!", b" 1"] {
            let mut cur = Cursor::new(input);
            assert_eq!(cur.parse_u64(), None);
            assert_eq!(cur.position(), 0);
        }
    }

    #[test]
    fn test_parse_u64() {
        let mut cur = Cursor::new(b"4");
        assert_eq!(cur.parse_u64(), Some(4));
        assert_eq!(cur.position(), 1);

        let mut cur = Cursor::new(b"7foo");
        assert_eq!(cur.parse_u64(), Some(7));
        assert_eq!(cur.position(), 1);

        let mut cur = Cursor::new(b"1234567890123");
        assert_eq!(cur.parse_u64(), Some(1_234_567_890_123));
        assert_eq!(cur.position(), 13);
    }

    #[test]
    fn test_parse_u64_rejects_overflow() {
        let mut cur = Cursor::new(b"18446744073709551615 ");
        assert_eq!(cur.parse_u64(), Some(u64::MAX));

        let mut cur = Cursor::new(b"18446744073709551616");
        assert_eq!(cur.parse_u64(), None);
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn test_parse_u32_rejects_wide_values() {
        let mut cur = Cursor::new(b"4294967296,");
        assert_eq!(cur.parse_u32(), None);
        assert_eq!(cur.position(), 0);

        let mut cur = Cursor::new(b"4294967295,");
        assert_eq!(cur.parse_u32(), Some(u32::MAX));
        assert_eq!(cur.peek(), Some(b','));
    }

    #[test]
    fn test_count_fields() {
        assert_eq!(Cursor::new(b"").count_fields(), 0);
        assert_eq!(Cursor::new(b" ").count_fields(), 0);
        assert_eq!(Cursor::new(b" F  BAR BAZ").count_fields(), 3);
        assert_eq!(Cursor::new(b" F  BAR BAZ RATZ ").count_fields(), 4);
    }

    #[test]
    fn test_count_fields_does_not_move() {
        let mut cur = Cursor::new(b"a b c");
        cur.next();
        assert_eq!(cur.count_fields(), 2);
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn test_next() {
        let mut cur = Cursor::new(b"ab");
        assert_eq!(cur.next(), Some(b'a'));
        assert_eq!(cur.next(), Some(b'b'));
        assert_eq!(cur.next(), None);
        assert_eq!(cur.position(), 2);
    }
}
