use std::str::FromStr;

use thiserror::Error;

use crate::models::target::{Target, TargetError};

pub const HELP: &str = "\
Commands:
  status                    show connection state and distance
  show <lcd1|lcd2>          show the lines waiting to be sent
  set <lcd1|lcd2> <n> text  set line n (text is cut to the display width)
  send <lcd1|lcd2>          send the lines to the display
  help                      show this help
  quit                      stop and exit";

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    Show(Target),
    Set {
        target: Target,
        line: usize,
        text: String,
    },
    Send(Target),
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Type a command. 'help' lists them.")]
    Empty,

    #[error("Unknown command '{0}'. 'help' lists the commands.")]
    Unknown(String),

    #[error("Missing {0}.")]
    MissingArgument(&'static str),

    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    #[error("'{0}' is not a line number.")]
    InvalidLine(String),
}

/// Split off the first word. The remainder keeps its leading whitespace.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}

fn parse_target(rest: &str) -> Result<(Target, &str), CommandParseError> {
    let (word, rest) = next_word(rest).ok_or(CommandParseError::MissingArgument("display"))?;
    Ok((word.parse()?, rest))
}

impl FromStr for ConsoleCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = next_word(s).ok_or(CommandParseError::Empty)?;

        match verb.to_ascii_lowercase().as_str() {
            "status" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            "show" => Ok(ConsoleCommand::Show(parse_target(rest)?.0)),
            "send" => Ok(ConsoleCommand::Send(parse_target(rest)?.0)),
            "set" => {
                let (target, rest) = parse_target(rest)?;
                let (line, rest) =
                    next_word(rest).ok_or(CommandParseError::MissingArgument("line number"))?;
                let line = line
                    .parse()
                    .map_err(|_| CommandParseError::InvalidLine(line.to_string()))?;

                // Only the single separator is dropped so leading spaces can
                // be used to position text on the display.
                let mut chars = rest.chars();
                chars.next();
                Ok(ConsoleCommand::Set {
                    target,
                    line,
                    text: chars.as_str().to_string(),
                })
            }
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}
