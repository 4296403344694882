// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Lexical line filter: turns raw trace text into a stream of trimmed,
// non-empty token lines with source line numbers attached.

/// An explicit cursor over the filtered lines of a VCD document.
///
/// Accepts `\n`, `\r\n` and `\r` line terminators. Lines are trimmed, blank
/// lines and `//` comment lines are dropped. The cursor is a plain value, so
/// two documents can be parsed at the same time without any shared state.
pub(crate) struct LineCursor<'a> {
    lines: Vec<(u32, &'a str)>,
    pos: usize,
    last_no: u32,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut line_no = 0u32;
        let push = |line_no: u32, raw: &'a str, lines: &mut Vec<(u32, &'a str)>| {
            let trimmed = raw.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("//") {
                lines.push((line_no, trimmed));
            }
        };
        for chunk in text.split('\n') {
            let chunk = chunk.strip_suffix('\r').unwrap_or(chunk);
            if chunk.contains('\r') {
                // classic Mac style `\r` terminators
                for part in chunk.split('\r') {
                    line_no += 1;
                    push(line_no, part, &mut lines);
                }
            } else {
                line_no += 1;
                push(line_no, chunk, &mut lines);
            }
        }
        Self {
            lines,
            pos: 0,
            last_no: 0,
        }
    }

    /// Returns the next filtered line and advances the cursor.
    pub(crate) fn next(&mut self) -> Option<&'a str> {
        let (no, line) = *self.lines.get(self.pos)?;
        self.pos += 1;
        self.last_no = no;
        Some(line)
    }

    /// Returns the next filtered line without advancing.
    pub(crate) fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).map(|(_, line)| *line)
    }

    /// Source line number (1-based) of the line most recently returned by `next`.
    pub(crate) fn line_no(&self) -> u32 {
        self.last_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Vec<String> {
        let mut cursor = LineCursor::new(text);
        let mut out = Vec::new();
        while let Some(line) = cursor.next() {
            out.push(line.to_string());
        }
        out
    }

    #[test]
    fn test_strips_blank_and_comment_lines() {
        let input = "$date\n\n// a comment\n  today  \n$end\n";
        assert_eq!(collect(input), ["$date", "today", "$end"]);
    }

    #[test]
    fn test_line_terminators() {
        assert_eq!(collect("a\nb\nc"), ["a", "b", "c"]);
        assert_eq!(collect("a\r\nb\r\nc"), ["a", "b", "c"]);
        assert_eq!(collect("a\rb\rc"), ["a", "b", "c"]);
    }

    #[test]
    fn test_line_numbers() {
        let mut cursor = LineCursor::new("first\n\nthird\r\nfourth");
        cursor.next();
        assert_eq!(cursor.line_no(), 1);
        cursor.next();
        assert_eq!(cursor.line_no(), 3);
        cursor.next();
        assert_eq!(cursor.line_no(), 4);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut cursor = LineCursor::new("a\nb");
        assert_eq!(cursor.peek(), Some("a"));
        assert_eq!(cursor.peek(), Some("a"));
        assert_eq!(cursor.next(), Some("a"));
        assert_eq!(cursor.peek(), Some("b"));
    }

    #[test]
    fn test_empty_input() {
        let mut cursor = LineCursor::new("");
        assert_eq!(cursor.next(), None);
    }
}
