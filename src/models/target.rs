use std::str::FromStr;

use derive_more::Display;
use thiserror::Error;

/// One of the two character displays attached to the device.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// 16x2 character display.
    #[display(fmt = "LCD 1 (16x2)")]
    Lcd1,

    /// 20x4 character display.
    #[display(fmt = "LCD 2 (20x4)")]
    Lcd2,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("Unknown display '{0}'. Expected 'lcd1' or 'lcd2'.")]
    Unknown(String),
}

impl Target {
    /// Number of rows on the display, which is also the buffer length.
    pub fn line_count(&self) -> usize {
        match self {
            Target::Lcd1 => 2,
            Target::Lcd2 => 4,
        }
    }

    /// Number of characters per row.
    pub fn line_width(&self) -> usize {
        match self {
            Target::Lcd1 => 16,
            Target::Lcd2 => 20,
        }
    }

    /// API path accepting commands for this display.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Target::Lcd1 => "/api/message_lcd1",
            Target::Lcd2 => "/api/message_lcd2",
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lcd1" | "1" => Ok(Target::Lcd1),
            "lcd2" | "2" => Ok(Target::Lcd2),
            _ => Err(TargetError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions() {
        assert_eq!(Target::Lcd1.line_count(), 2);
        assert_eq!(Target::Lcd1.line_width(), 16);
        assert_eq!(Target::Lcd2.line_count(), 4);
        assert_eq!(Target::Lcd2.line_width(), 20);
    }

    #[test]
    fn test_parse_target() {
        assert_eq!("lcd1".parse::<Target>(), Ok(Target::Lcd1));
        assert_eq!("LCD2".parse::<Target>(), Ok(Target::Lcd2));
        assert!("lcd3".parse::<Target>().is_err());
    }
}
