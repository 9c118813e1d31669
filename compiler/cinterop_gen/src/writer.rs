//! Indented text output shared by the source and glue emitters.

/// Line-oriented output buffer with an indentation level.
#[derive(Debug, Default)]
pub struct SourceWriter {
    indent: usize,
    output: String,
}

impl SourceWriter {
    pub fn new() -> Self {
        SourceWriter {
            indent: 0,
            output: String::with_capacity(4096),
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write a line with the current indentation.
    pub fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
    }

    /// Whether the last thing written is a blank line (or nothing at all).
    pub fn at_blank_line(&self) -> bool {
        self.output.is_empty() || self.output.ends_with("\n\n")
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}
