//! Offset-accurate reconstruction of rewritten source text.
//!
//! A [`Splicer`] walks forward through one source string. Every byte it
//! passes is either copied or dropped on purpose, and inserted text is
//! recorded separately, so the pieces always tile the consumed input.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Copy(Range<usize>),
    Drop(Range<usize>),
    Insert(String),
}

/// Position in a piece list, used to hoist text in front of a statement
/// after the statement has been walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug)]
pub struct Splicer<'s> {
    source: &'s str,
    start: usize,
    cursor: usize,
    pieces: Vec<Piece>,
}

impl<'s> Splicer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self::starting_at(source, 0)
    }

    /// A splicer for the part of `source` beginning at `start`.
    pub fn starting_at(source: &'s str, start: usize) -> Self {
        Self {
            source,
            start,
            cursor: start,
            pieces: Vec::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copy input up to `end`. Positions behind the cursor are ignored.
    pub fn copy_to(&mut self, end: usize) {
        let end = end.min(self.source.len());
        if end > self.cursor {
            self.pieces.push(Piece::Copy(self.cursor..end));
            self.cursor = end;
        }
    }

    /// Drop input up to `end` without emitting it.
    pub fn skip_to(&mut self, end: usize) {
        let end = end.min(self.source.len());
        if end > self.cursor {
            self.pieces.push(Piece::Drop(self.cursor..end));
            self.cursor = end;
        }
    }

    pub fn insert(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.pieces.push(Piece::Insert(text));
        }
    }

    /// Copy up to `range.start`, then emit `text` in place of `range`.
    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.copy_to(range.start);
        self.insert(text);
        self.skip_to(range.end);
    }

    /// Byte right after the cursor, if any.
    pub fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.cursor).copied()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pieces.len())
    }

    /// Insert text at an earlier mark. Marks taken after `mark` shift by one.
    pub fn insert_at(&mut self, mark: Mark, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            let at = mark.0.min(self.pieces.len());
            self.pieces.insert(at, Piece::Insert(text));
        }
    }

    /// Drop a `;` that ends the most recent copied text, if nothing was
    /// emitted after it.
    pub fn trim_terminator(&mut self) {
        if let Some(Piece::Copy(range)) = self.pieces.last_mut() {
            if self.source.as_bytes()[range.end - 1] == b';' {
                range.end -= 1;
                let dropped = range.end..range.end + 1;
                if range.is_empty() {
                    self.pieces.pop();
                }
                self.pieces.push(Piece::Drop(dropped));
            }
        }
    }

    /// Copied and dropped ranges cover `[start, cursor)` exactly once, in order.
    pub fn check_invariants(&self) -> bool {
        let mut expected = self.start;
        for piece in &self.pieces {
            match piece {
                Piece::Copy(range) | Piece::Drop(range) => {
                    if range.start != expected || range.end < range.start {
                        return false;
                    }
                    expected = range.end;
                }
                Piece::Insert(_) => {}
            }
        }
        expected == self.cursor
    }

    pub fn finish(self) -> String {
        debug_assert!(self.check_invariants());
        let mut out = String::with_capacity(self.source.len());
        for piece in &self.pieces {
            match piece {
                Piece::Copy(range) => out.push_str(&self.source[range.clone()]),
                Piece::Insert(text) => out.push_str(text),
                Piece::Drop(_) => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let source = "var x = 1; // keep\n";
        let mut splicer = Splicer::new(source);
        splicer.copy_to(source.len());
        assert!(splicer.check_invariants());
        assert_eq!(splicer.cursor(), source.len());
        assert_eq!(splicer.finish(), source);
    }

    #[test]
    fn test_replace_and_hoist() {
        let source = "a; var x = f(1);";
        let mut splicer = Splicer::new(source);
        splicer.copy_to(3);
        let mark = splicer.mark();
        splicer.replace(11..15, "ret0");
        splicer.copy_to(source.len());
        splicer.insert_at(mark, "var ret0 = 1;\n");

        assert!(splicer.check_invariants());
        assert_eq!(splicer.finish(), "a; var ret0 = 1;\nvar x = ret0;");
    }

    #[test]
    fn test_cursor_never_moves_back() {
        let source = "abcdef";
        let mut splicer = Splicer::new(source);
        splicer.copy_to(4);
        splicer.copy_to(2);
        splicer.skip_to(1);
        assert_eq!(splicer.cursor(), 4);
        splicer.copy_to(6);
        assert!(splicer.check_invariants());
        assert_eq!(splicer.finish(), "abcdef");
    }

    #[test]
    fn test_trim_terminator() {
        let source = "{ log(x); }";
        let mut splicer = Splicer::starting_at(source, 2);
        splicer.copy_to(9);
        splicer.trim_terminator();
        assert_eq!(splicer.peek(), Some(b' '));
        assert!(splicer.check_invariants());
        assert_eq!(splicer.finish(), "log(x)");
    }

    #[test]
    fn test_trim_terminator_after_insert_is_noop() {
        let source = "return x;";
        let mut splicer = Splicer::new(source);
        splicer.skip_to(7);
        splicer.copy_to(8);
        splicer.skip_to(9);
        splicer.insert(";\n");
        splicer.trim_terminator();
        assert_eq!(splicer.finish(), "x;\n");
    }
}
