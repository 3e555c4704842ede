/// A source location: byte offset range into one input document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Point span for a 1-based line/column pair (serde_json reports
    /// positions this way). Clamped to the end of `source`.
    pub fn at_line_col(source: &str, line: usize, column: usize) -> Self {
        let mut offset = 0usize;
        for (i, text) in source.split_inclusive('\n').enumerate() {
            if i + 1 == line {
                offset += column.saturating_sub(1).min(text.len());
                let end = (offset + 1).min(source.len());
                return Self::new(offset as u32, end as u32);
            }
            offset += text.len();
        }
        let end = source.len() as u32;
        Self::new(end.saturating_sub(1), end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_col_first_line() {
        let span = Span::at_line_col("{\n  \"x\": 1\n}", 1, 1);
        assert_eq!(span, Span::new(0, 1));
    }

    #[test]
    fn test_at_line_col_later_line() {
        let src = "{\n  \"x\": 1\n}";
        let span = Span::at_line_col(src, 2, 3);
        assert_eq!(&src[span.start as usize..span.end as usize], "\"");
    }

    #[test]
    fn test_at_line_col_past_end_clamps() {
        let src = "ab";
        let span = Span::at_line_col(src, 9, 1);
        assert_eq!(span, Span::new(1, 2));
    }
}
