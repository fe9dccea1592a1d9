//! Branch synchronization for one repository
//!
//! Fetches origin, classifies every local branch and then pushes, pulls or
//! deletes branches so they match the remote. Diverged branches and branches
//! without an upstream are only reported. The working tree ends on the branch
//! it started on, or on the default branch when that one was deleted.

use crossterm::style::{Color, Stylize};
use tracing::{debug, info};

use crate::error::Result;
use crate::git::{
    Branch, BranchStatus, DEFAULT_REMOTE, GitRunner, default_branch, uncommitted_count,
};
use crate::term::Verbosity;

/// Outcome of syncing one repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Repository id
    pub name: String,
    /// Changed paths that blocked the sync
    pub uncommitted: usize,
    pub pushed: Vec<String>,
    pub pulled: Vec<String>,
    pub deleted: Vec<String>,
    /// Diverged branches, left for the user
    pub conflict: Vec<String>,
    /// Branches without upstream
    pub detached: Vec<String>,
}

impl SyncResult {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.render_with(false, |s, _| s.to_string()).is_empty()
    }

    /// Summary lines, empty when there is nothing to report
    pub fn render(&self, with_header: bool) -> String {
        self.render_with(with_header, |s, color| s.with(color).to_string())
    }

    fn render_with(&self, with_header: bool, paint: impl Fn(&str, Color) -> String) -> String {
        let mut fields = Vec::new();
        if self.uncommitted > 0 {
            fields.push(format!(
                "  {} {} dirty",
                paint("*", Color::Yellow),
                self.uncommitted
            ));
        }
        let groups = [
            ("↑", Color::Green, &self.pushed),
            ("↓", Color::Green, &self.pulled),
            ("-", Color::Red, &self.deleted),
            ("$", Color::Magenta, &self.conflict),
            ("?", Color::Yellow, &self.detached),
        ];
        for (flag, color, branches) in groups {
            if !branches.is_empty() {
                fields.push(format!("  {} {}", paint(flag, color), branches.join(", ")));
            }
        }

        if fields.is_empty() {
            return String::new();
        }
        let body = fields.join("\n");
        if with_header {
            format!("> {}:\n{}", self.name, body)
        } else {
            body
        }
    }
}

/// What to do with one branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    Push,
    Pull,
    Delete,
}

/// Actions for one repository, in branch enumeration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub default_branch: String,
    /// Checked out before the sync, `None` on a detached HEAD
    pub current: Option<String>,
    /// Where the working tree should end up
    pub backup: String,
    pub actions: Vec<(String, BranchAction)>,
    pub conflict: Vec<String>,
    pub detached: Vec<String>,
}

impl SyncPlan {
    pub fn build(branches: &[Branch], default_branch: &str) -> Self {
        let mut plan = Self {
            default_branch: default_branch.to_string(),
            current: None,
            backup: default_branch.to_string(),
            actions: Vec::new(),
            conflict: Vec::new(),
            detached: Vec::new(),
        };

        for branch in branches {
            if branch.current {
                plan.current = Some(branch.name.clone());
                if branch.status != BranchStatus::Gone {
                    plan.backup = branch.name.clone();
                }
            }

            let action = match branch.status {
                BranchStatus::Ahead => Some(BranchAction::Push),
                BranchStatus::Behind => Some(BranchAction::Pull),
                BranchStatus::Gone if branch.name != default_branch => Some(BranchAction::Delete),
                BranchStatus::Conflict => {
                    plan.conflict.push(branch.name.clone());
                    None
                }
                BranchStatus::Detached => {
                    plan.detached.push(branch.name.clone());
                    None
                }
                BranchStatus::Gone | BranchStatus::Sync => None,
            };
            if let Some(action) = action {
                plan.actions.push((branch.name.clone(), action));
            }
        }

        plan
    }
}

/// Sync every local branch of the repository `git` is scoped to
pub fn sync_branches(git: &dyn GitRunner, name: &str, verbosity: Verbosity) -> Result<SyncResult> {
    let uncommitted = uncommitted_count(git)?;
    if uncommitted > 0 {
        info!("{} has {} uncommitted change(s), skipping", name, uncommitted);
        return Ok(SyncResult {
            uncommitted,
            ..SyncResult::new(name)
        });
    }

    verbosity.info(format!("Fetching {}", DEFAULT_REMOTE));
    git.run(&["fetch", DEFAULT_REMOTE, "--prune"])?;

    let default = default_branch(git)?;
    let branches = Branch::list(git)?;
    let plan = SyncPlan::build(&branches, &default);
    debug!("Sync plan for {}: {:?}", name, plan);

    execute(git, &plan, name, verbosity)
}

/// Run a plan; the first failing git command aborts the rest
pub fn execute(
    git: &dyn GitRunner,
    plan: &SyncPlan,
    name: &str,
    verbosity: Verbosity,
) -> Result<SyncResult> {
    let mut result = SyncResult {
        conflict: plan.conflict.clone(),
        detached: plan.detached.clone(),
        ..SyncResult::new(name)
    };
    if plan.actions.is_empty() {
        return Ok(result);
    }

    let mut current = plan.current.clone();
    let checkout = |branch: &str, current: &mut Option<String>| -> Result<()> {
        verbosity.info(format!("Checkout {}", branch));
        git.run(&["checkout", branch])?;
        *current = Some(branch.to_string());
        Ok(())
    };

    for (branch, action) in &plan.actions {
        match action {
            BranchAction::Push | BranchAction::Pull => {
                if current.as_deref() != Some(branch.as_str()) {
                    checkout(branch, &mut current)?;
                }
                if *action == BranchAction::Push {
                    verbosity.info(format!("Pushing {}", branch));
                    git.run(&["push"])?;
                    result.pushed.push(branch.clone());
                } else {
                    verbosity.info(format!("Pulling {}", branch));
                    git.run(&["pull"])?;
                    result.pulled.push(branch.clone());
                }
            }
            BranchAction::Delete => {
                // git refuses to delete the checked out branch
                if current.as_deref() == Some(branch.as_str()) {
                    checkout(&plan.default_branch, &mut current)?;
                }
                verbosity.info(format!("Deleting {}", branch));
                git.run(&["branch", "-D", branch.as_str()])?;
                result.deleted.push(branch.clone());
            }
        }
    }

    if current.as_deref() != Some(plan.backup.as_str()) {
        checkout(&plan.backup, &mut current)?;
    }

    Ok(result)
}
