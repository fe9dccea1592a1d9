//! User-facing terminal output: progress lines, confirmation prompts, width

use crossterm::style::Stylize;
use std::fmt::Display;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::debug;

use crate::error::{Error, Result};

/// Width used when the terminal can't be queried
pub const DEFAULT_TERMINAL_WIDTH: usize = 20;

/// Whether per-operation progress is shown to the user
///
/// Batch runs pass `Quiet` so the batch status line is the only thing drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Verbose,
    Quiet,
}

impl Verbosity {
    pub fn is_verbose(self) -> bool {
        self == Verbosity::Verbose
    }

    /// Print a progress line to stderr when verbose
    pub fn info(self, message: impl Display) {
        debug!("{}", message);
        if self.is_verbose() {
            eprintln!("{} {}", "==>".cyan().bold(), message);
        }
    }
}

/// Ask a yes/no question on stderr; anything but yes is a cancellation
pub fn confirm(prompt: impl Display) -> Result<()> {
    eprint!("{} (y/n) ", prompt);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    parse_answer(&input)
}

fn parse_answer(input: &str) -> Result<()> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(Error::Cancelled),
    }
}

pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((width, _)) if width > 0 => width as usize,
        _ => DEFAULT_TERMINAL_WIDTH,
    }
}

pub fn stderr_is_terminal() -> bool {
    io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n").is_ok());
        assert!(parse_answer(" YES ").is_ok());
        assert!(parse_answer("n\n").unwrap_err().is_cancelled());
        assert!(parse_answer("").unwrap_err().is_cancelled());
    }
}
