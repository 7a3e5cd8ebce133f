//! Indentation-aware text sink shared by the emitters.
use std::fmt::{self, Write};

pub struct Writer {
    out: String,
    unit: &'static str,
    level: usize,
}

impl Writer {
    /// `unit` is the text of one indentation level.
    pub fn new(unit: &'static str) -> Self {
        Self { out: String::new(), unit, level: 0 }
    }

    /// One line at the current indentation.
    pub fn line(&mut self, content: impl fmt::Display) -> fmt::Result {
        for _ in 0..self.level {
            self.out.push_str(self.unit);
        }
        writeln!(self.out, "{content}")
    }

    pub fn blank(&mut self) -> fmt::Result {
        writeln!(self.out)
    }

    /// Text copied as-is, terminated by a newline if it lacks one.
    pub fn raw(&mut self, text: &str) -> fmt::Result {
        self.out.push_str(text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
        Ok(())
    }

    /// Every line of `text` as a `//` comment. Blank lines stay bare `//`.
    pub fn comment(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.line("//")?;
            } else {
                self.line(format_args!("// {line}"))?;
            }
        }
        Ok(())
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// `open`, the indented body, then `close` on its own line.
    pub fn block(
        &mut self,
        open: impl fmt::Display,
        close: &str,
        body: impl FnOnce(&mut Self) -> fmt::Result,
    ) -> fmt::Result {
        self.line(open)?;
        self.indent();
        body(self)?;
        self.dedent();
        self.line(close)
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_indent_their_body() {
        let mut w = Writer::new("  ");
        w.block("a {", "}", |w| {
            w.comment("first\n\nsecond  ")?;
            w.block("b {", "}", |w| w.line("c;"))
        })
        .unwrap();
        assert_eq!(w.finish(), "a {\n  // first\n  //\n  // second\n  b {\n    c;\n  }\n}\n");
    }
}
