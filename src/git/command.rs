//! Git subprocess runner

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{Error, Result};
use crate::term::Verbosity;

/// Something that can run git commands
///
/// Sync and the inspectors only talk to git through this trait, so tests can
/// script the responses.
pub trait GitRunner {
    /// Run git and return its stdout
    fn output(&self, args: &[&str]) -> Result<String>;

    fn run(&self, args: &[&str]) -> Result<()> {
        self.output(args).map(|_| ())
    }

    /// Non-empty stdout lines
    fn lines(&self, args: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .output(args)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Runs the real git binary, optionally inside a directory
#[derive(Debug, Clone)]
pub struct GitCommand {
    dir: Option<PathBuf>,
    verbosity: Verbosity,
}

impl GitCommand {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            dir: None,
            verbosity,
        }
    }

    pub fn in_dir(dir: &Path, verbosity: Verbosity) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
            verbosity,
        }
    }
}

impl GitRunner for GitCommand {
    fn output(&self, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        debug!("git {} (in {:?})", joined, self.dir);

        let mut cmd = Command::new("git");
        cmd.args(args).stdin(Stdio::null()).stdout(Stdio::piped());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        // let the user see clone/fetch progress when verbose
        if self.verbosity.is_verbose() {
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stderr(Stdio::piped());
        }

        let output = cmd.output().map_err(|e| Error::Command {
            command: format!("git {}", joined),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(Error::Git {
                args: joined,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
