//! Local branches and their tracking status, read from `git for-each-ref`

use std::fmt;
use tracing::debug;

use super::GitRunner;
use crate::error::{Error, Result};

/// Remote that sync fetches from and compares against
pub const DEFAULT_REMOTE: &str = "origin";

/// One tab separated line per local branch: head marker, name, upstream,
/// tracking markers, short commit, subject
const BRANCH_FORMAT: &str = "--format=%(HEAD)%09%(refname:short)%09%(upstream:short)%09%(upstream:track)%09%(objectname:short)%09%(contents:subject)";

/// How a local branch relates to its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    /// Up to date, or tracking something we don't reason about
    Sync,
    /// Upstream was deleted
    Gone,
    /// Has commits to push
    Ahead,
    /// Has commits to pull
    Behind,
    /// Diverged both ways
    Conflict,
    /// No upstream at all
    Detached,
}

impl BranchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchStatus::Sync => "sync",
            BranchStatus::Gone => "gone",
            BranchStatus::Ahead => "ahead",
            BranchStatus::Behind => "behind",
            BranchStatus::Conflict => "conflict",
            BranchStatus::Detached => "detached",
        }
    }

    /// Classify an upstream such as `origin/main` and its markers such as `[ahead 1, behind 2]`
    pub fn from_tracking(upstream: &str, track: &str) -> Self {
        if upstream.is_empty() {
            return BranchStatus::Detached;
        }
        // Anything not on the default remote gets no automatic action.
        if !upstream.starts_with(&format!("{}/", DEFAULT_REMOTE)) {
            return BranchStatus::Sync;
        }

        let ahead = track.contains("ahead");
        let behind = track.contains("behind");
        if track.contains("gone") {
            BranchStatus::Gone
        } else if ahead && behind {
            BranchStatus::Conflict
        } else if ahead {
            BranchStatus::Ahead
        } else if behind {
            BranchStatus::Behind
        } else {
            BranchStatus::Sync
        }
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    /// Checked out right now
    pub current: bool,
    pub status: BranchStatus,
    /// Short commit id
    pub commit: String,
    /// Commit subject
    pub message: String,
}

impl Branch {
    /// Parse one line produced with [`BRANCH_FORMAT`]
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid branch line: {:?}", line));

        let fields: Vec<&str> = line.splitn(6, '\t').collect();
        let [head, name, upstream, track, commit, message] = fields[..] else {
            return Err(invalid());
        };
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            current: head == "*",
            status: BranchStatus::from_tracking(upstream, track),
            commit: commit.to_string(),
            message: message.trim().to_string(),
        })
    }

    /// List local branches; a detached HEAD is not under `refs/heads` and never shows up
    pub fn list(git: &dyn GitRunner) -> Result<Vec<Self>> {
        let mut branches = Vec::new();
        for line in git.lines(&["for-each-ref", "refs/heads", BRANCH_FORMAT])? {
            branches.push(Self::parse(&line)?);
        }
        debug!("Found {} local branches", branches.len());
        Ok(branches)
    }
}

/// The branch `origin/HEAD` points at
pub fn default_branch(git: &dyn GitRunner) -> Result<String> {
    let head_ref = format!("refs/remotes/{}/HEAD", DEFAULT_REMOTE);
    let prefix = format!("refs/remotes/{}/", DEFAULT_REMOTE);

    if let Ok(out) = git.output(&["symbolic-ref", head_ref.as_str()]) {
        let branch = out.trim().trim_start_matches(&prefix);
        if !branch.is_empty() {
            debug!("Default branch from symbolic-ref: {}", branch);
            return Ok(branch.to_string());
        }
    }

    // origin/HEAD isn't set for repositories that were not cloned
    for line in git.lines(&["remote", "show", DEFAULT_REMOTE])? {
        if let Some(branch) = line.trim().strip_prefix("HEAD branch:") {
            let branch = branch.trim();
            if !branch.is_empty() && branch != "(unknown)" {
                debug!("Default branch from remote show: {}", branch);
                return Ok(branch.to_string());
            }
        }
    }

    Err(Error::Git {
        args: format!("remote show {}", DEFAULT_REMOTE),
        stderr: "no default branch reported".to_string(),
    })
}

/// Number of changed or untracked paths in the working tree
pub fn uncommitted_count(git: &dyn GitRunner) -> Result<usize> {
    Ok(git.lines(&["status", "-s"])?.len())
}
