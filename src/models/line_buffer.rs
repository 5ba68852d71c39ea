use std::fmt::Display;

use thiserror::Error;

use super::target::Target;

/// Fixed-length text lines waiting to be sent to one display.
///
/// The number of lines is fixed at creation. Edits are capped to the display's
/// row width, the same way the input fields of the operator surface are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
    width: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LineBufferError {
    /// Line numbers are 1-based and bounded by the display's row count.
    #[error("Line {line} does not exist. This display has {count} lines.")]
    NoSuchLine { line: usize, count: usize },
}

impl LineBuffer {
    pub fn new(target: Target) -> Self {
        Self {
            lines: vec![String::new(); target.line_count()],
            width: target.line_width(),
        }
    }

    /// Build a buffer for `target` holding `lines`. Extra lines are dropped,
    /// missing lines are left empty and each line is capped to the row width.
    pub fn with_lines<I, S>(target: Target, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buffer = Self::new(target);
        for (slot, line) in buffer.lines.iter_mut().zip(lines) {
            *slot = line.as_ref().chars().take(buffer.width).collect();
        }
        buffer
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether every line is blank.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    /// Replace the text of a 1-based line, truncating it to the row width.
    pub fn set_line(&mut self, line: usize, text: &str) -> Result<(), LineBufferError> {
        let count = self.lines.len();
        let slot = line
            .checked_sub(1)
            .and_then(|index| self.lines.get_mut(index))
            .ok_or(LineBufferError::NoSuchLine { line, count })?;
        *slot = text.chars().take(self.width).collect();
        Ok(())
    }

    /// Reset every line to the empty string. The length is unchanged.
    pub fn clear(&mut self) {
        self.lines.iter_mut().for_each(String::clear);
    }
}

impl Display for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, line) in self.lines.iter().enumerate() {
            writeln!(f, "  {}: [{:<width$}]", index + 1, line, width = self.width)?;
        }
        Ok(())
    }
}
