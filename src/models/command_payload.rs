use std::fmt::Display;

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::line_buffer::LineBuffer;

/// Body of a display command: `line1`, `line2`, ... mapped to the buffer's
/// lines in order. Built fresh for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPayload {
    lines: Vec<String>,
}

impl CommandPayload {
    /// Positional key for a 0-based line index.
    pub fn key(index: usize) -> String {
        format!("line{}", index + 1)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Key/value pairs in positional order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| (Self::key(index), line.as_str()))
    }
}

impl From<&LineBuffer> for CommandPayload {
    fn from(buffer: &LineBuffer) -> Self {
        Self {
            lines: buffer.lines().to_vec(),
        }
    }
}

impl Serialize for CommandPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for (key, line) in self.entries() {
            map.serialize_entry(&key, line)?;
        }
        map.end()
    }
}

impl Display for CommandPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Command Payload | {} lines>", self.lines.len())
    }
}
