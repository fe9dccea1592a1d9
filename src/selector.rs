//! Interactive choice between candidates

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ui::ListSelector;

/// Exit code of a chooser the user interrupted (fzf uses it for Esc and Ctrl-C)
const CANCELLED_EXIT_CODE: i32 = 130;

pub trait Selector {
    /// Index of the chosen item; `Error::Cancelled` when the user backs out
    fn select(&self, items: &[String]) -> Result<usize>;
}

/// Pipe candidates through an external chooser such as `fzf`
pub struct CommandSelector {
    command: String,
}

impl CommandSelector {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl Selector for CommandSelector {
    fn select(&self, items: &[String]) -> Result<usize> {
        debug!("Selecting from {} items with {}", items.len(), self.command);
        let failed = |message: String| Error::Command {
            command: self.command.clone(),
            message,
        };

        let mut child = Command::new("sh")
            .args(["-c", &self.command])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(items.join("\n").as_bytes())?;
        }
        let output = child.wait_with_output()?;

        match output.status.code() {
            Some(0) => {}
            Some(CANCELLED_EXIT_CODE) => return Err(Error::Cancelled),
            _ => return Err(failed(output.status.to_string())),
        }

        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        items
            .iter()
            .position(|item| *item == chosen)
            .ok_or_else(|| failed(format!("unknown choice {:?}", chosen)))
    }
}

/// The configured chooser: an external command when set, the built-in list otherwise
pub fn from_config(select_cmd: Option<&str>) -> Box<dyn Selector> {
    match select_cmd {
        Some(command) => Box::new(CommandSelector::new(command)),
        None => Box::new(ListSelector::new()),
    }
}
