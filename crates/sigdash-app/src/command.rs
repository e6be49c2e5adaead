//! Stdin commands.

use std::fmt;
use std::str::FromStr;

/// A command typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Refresh,
    Quit,
    Help,
}

/// Unrecognized input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command {:?} (type `help`)", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "toggle" => Ok(Self::Toggle),
            "r" | "refresh" => Ok(Self::Refresh),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "h" | "help" | "?" => Ok(Self::Help),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

pub const HELP: &str = "commands: t/toggle  r/refresh  q/quit  h/help";
