use std::io::{self, BufRead};

/// Peekable line cursor over definition source, counting lines from 1.
///
/// End of input is `Ok(None)`, so callers can tell it apart from a failed
/// read.
pub struct LineReader<R> {
    reader: R,
    peeked: Option<String>,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader {
            reader,
            peeked: None,
            line_number: 0,
        }
    }

    /// Returns the next line without consuming it.
    pub fn peek(&mut self) -> io::Result<Option<&str>> {
        if self.peeked.is_none() {
            self.peeked = self.read_raw()?;
        }
        Ok(self.peeked.as_deref())
    }

    /// Consumes and returns the next line.
    pub fn line(&mut self) -> io::Result<Option<String>> {
        let next = match self.peeked.take() {
            Some(line) => Some(line),
            None => self.read_raw()?,
        };
        if next.is_some() {
            self.line_number += 1;
        }
        Ok(next)
    }

    /// Number of the most recently consumed line, 0 before the first one.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn read_raw(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }
}
