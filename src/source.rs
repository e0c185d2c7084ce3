use std::fmt::{Display, Formatter};

/// A 1-based line and column, plus the length of the spanned text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub len: u32
}

impl Span {
    pub fn new(line: u32, col: u32, len: u32) -> Span {
        Span { line, col, len }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

pub trait HasSpan {
    fn span(&self) -> Span;
}

/// The text of a module, kept only so diagnostics can quote the offending line.
pub struct Source {
    name: String,
    text: String,
    line_starts: Box<[usize]>
}

impl Source {
    pub fn from_text(name: &str, text: &str) -> Source {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(i+1);
            }
        }
        line_starts.push(text.len()+1);
        Source { name: name.to_owned(), text: text.to_owned(), line_starts: line_starts.into_boxed_slice() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the text of the 1-based line `line`, without its newline.
    pub fn line(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        if idx + 1 >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[idx];
        let end = self.line_starts[idx+1] - 1;
        self.text.get(start..end)
    }
}


#[cfg(test)]
mod test {
    use crate::source::{Source, Span};

    #[test]
    fn test_line_starts_empty() {
        let s = Source::from_text("test", "");
        assert_eq!(s.line_starts, vec![0, 1].into());
    }

    #[test]
    fn test_line_starts_empty_lines() {
        let s = Source::from_text("test", "a\n\n be");
        assert_eq!(s.line_starts, vec![0, 2, 3, 7].into());
    }

    #[test]
    fn test_get_line() {
        let s = Source::from_text("test", "a\n\n be");
        assert_eq!(s.line(1), Some("a"));
        assert_eq!(s.line(2), Some(""));
        assert_eq!(s.line(3), Some(" be"));
        assert_eq!(s.line(4), None);
        assert_eq!(s.line(0), None);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 14, 2).to_string(), "3:14");
    }
}
