//! Utilities for generating error messages with source code.
use std::fmt;
use unicode_width::UnicodeWidthStr;

/// Map a position for syntax errors; line numbers are 1-based.
#[derive(Debug, Eq, PartialEq)]
pub struct SourcePos(pub usize, pub usize);

impl SourcePos {
    /// The line number for this source position.
    pub fn line(&self) -> usize {
        self.0
    }

    /// The byte offset for this source position.
    pub fn byte_offset(&self) -> usize {
        self.1
    }
}

/// Information needed to generate a source code snippet.
#[derive(Eq, PartialEq)]
pub struct ErrorInfo<'source> {
    source: &'source str,
    file_name: String,
    source_pos: SourcePos,
    notes: Vec<String>,
}

impl<'source> ErrorInfo<'source> {
    /// Create a new error info.
    pub fn new(
        source: &'source str,
        file_name: &str,
        source_pos: SourcePos,
        notes: Vec<String>,
    ) -> Self {
        Self {
            source,
            file_name: file_name.to_string(),
            source_pos,
            notes,
        }
    }
}

impl fmt::Debug for ErrorInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.source;
        let byte = self.source_pos.byte_offset().min(s.len());

        let line_start = match s[..byte].rfind('\n') {
            Some(offset) => offset + 1,
            None => 0,
        };
        let line_end = match s[byte..].find('\n') {
            Some(offset) => byte + offset,
            None => s.len(),
        };

        let line_slice = &s[line_start..line_end];
        let line_number = self.source_pos.line();

        let line_prefix = format!(" {} | ", line_number);
        let line_padding = " ".repeat(line_prefix.len() - 3);

        let cols = UnicodeWidthStr::width(&s[line_start..byte]);
        let file_info =
            format!("{}:{}:{}", self.file_name, line_number, cols + 1);

        let err_pointer = format!("{}^", "-".repeat(cols));

        writeln!(f, "{}--> {}", line_padding, file_info)?;
        writeln!(f, "{} |", line_padding)?;
        writeln!(f, "{}{}", line_prefix, line_slice)?;
        write!(f, "{} | {}", line_padding, err_pointer)?;

        for n in self.notes.iter() {
            write!(f, "\n{} = note: {}", line_padding, n)?;
        }

        Ok(())
    }
}

impl From<ErrorInfo<'_>> for String {
    fn from(info: ErrorInfo<'_>) -> Self {
        format!("{:?}", info)
    }
}
