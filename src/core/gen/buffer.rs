use std::io::{self, Write};

/// Line-oriented output buffer which tracks brace nesting and indents
/// emitted lines accordingly.
///
/// A physical line starting with `}` dedents before printing; a line ending
/// with `{` indents after. Continuation lines of a single multi-line emit
/// receive one extra indent level.
pub struct Buffer {
    out: Box<dyn Write>,
    offset: usize,
}

impl Buffer {
    pub fn new(out: Box<dyn Write>) -> Buffer {
        Buffer { out, offset: 0 }
    }

    pub fn line(&mut self, s: &str) -> io::Result<()> {
        if s.is_empty() {
            return writeln!(self.out);
        }

        for (i, part) in s.split('\n').enumerate() {
            if part.starts_with('}') && self.offset > 0 {
                self.offset -= 1;
            }
            if self.offset > 0 {
                let depth = if i == 0 { self.offset } else { self.offset + 1 };
                write!(self.out, "{}", "  ".repeat(depth))?;
            }
            if part.ends_with('{') {
                self.offset += 1;
            }
            writeln!(self.out, "{}", part)?;
        }
        Ok(())
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }
}
