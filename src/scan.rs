/// A trimmed, non-blank source line split into whitespace tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    /// 1-based line number in the source document.
    pub number: usize,
    pub text: &'a str,
    pub tokens: Vec<&'a str>,
}

impl<'a> Line<'a> {
    pub fn keyword(&self) -> &'a str {
        self.tokens[0]
    }

    /// Tokens after the keyword.
    pub fn args(&self) -> &[&'a str] {
        &self.tokens[1..]
    }
}

/// Cursor over the non-blank lines of a document.
pub struct Scanner<'a> {
    lines: Vec<Line<'a>>,
    cursor: usize,
    /// Physical line count, blank lines included.
    total: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        let total = text.lines().count();
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = raw.trim();
                if text.is_empty() {
                    return None;
                }
                Some(Line {
                    number: i + 1,
                    text,
                    tokens: text.split_whitespace().collect(),
                })
            })
            .collect();
        Scanner {
            lines,
            cursor: 0,
            total,
        }
    }

    pub fn peek(&self) -> Option<&Line<'a>> {
        self.lines.get(self.cursor)
    }

    pub fn next_line(&mut self) -> Option<&Line<'a>> {
        let line = self.lines.get(self.cursor);
        if line.is_some() {
            self.cursor += 1;
        }
        line
    }

    /// Number of lines not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.cursor
    }

    /// Physical lines, blank ones included, that follow line `number`.
    pub fn lines_after(&self, number: usize) -> usize {
        self.total.saturating_sub(number)
    }

    /// Line number of the last line of the document, or 0 for an empty one.
    pub fn last_line_number(&self) -> usize {
        self.lines.last().map_or(0, |line| line.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_keeps_numbers() {
        let mut scanner = Scanner::new("HIERARCHY\n\n  ROOT Hips  \r\n\t{\n");
        assert_eq!(scanner.remaining(), 3);
        assert_eq!(scanner.next_line().map(|l| l.number), Some(1));

        let line = scanner.next_line().cloned();
        let line = line.as_ref().map(|l| (l.number, l.text, l.keyword(), l.args().to_vec()));
        assert_eq!(line, Some((3, "ROOT Hips", "ROOT", vec!["Hips"])));

        assert_eq!(scanner.peek().map(|l| l.text), Some("{"));
        assert_eq!(scanner.next_line().map(|l| l.number), Some(4));
        assert!(scanner.next_line().is_none());
        assert_eq!(scanner.remaining(), 0);
        assert_eq!(scanner.last_line_number(), 4);
        assert_eq!(scanner.lines_after(1), 3);
        assert_eq!(scanner.lines_after(4), 0);
    }

    #[test]
    fn trailing_blank_lines_still_count_as_physical_lines() {
        let scanner = Scanner::new("Frame Time: 0.1\n\n   \n");
        assert_eq!(scanner.remaining(), 1);
        assert_eq!(scanner.lines_after(1), 2);
    }

    #[test]
    fn empty_document() {
        let mut scanner = Scanner::new("   \n\n");
        assert!(scanner.peek().is_none());
        assert!(scanner.next_line().is_none());
        assert_eq!(scanner.last_line_number(), 0);
    }
}
