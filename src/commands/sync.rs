//! `roam sync`: bring branches in line with origin, for one or many repositories

use clap::Args;
use std::path::Path;
use tracing::debug;

use super::Context;
use crate::batch::{self, Task};
use crate::config::Config;
use crate::error::Result;
use crate::git::GitCommand;
use crate::resolve::ManyFilter;
use crate::store::{RepoStore, Repository};
use crate::sync::{SyncResult, sync_branches};
use crate::term::{Verbosity, confirm};
use crate::workspace;

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Remote name or keyword
    pub head: Option<String>,

    /// `owner/`, `owner/name` or keyword within the remote
    pub query: Option<String>,

    /// Sync many repositories even from inside one
    #[arg(short, long)]
    pub recursive: bool,

    /// Include repositories not marked for sync
    #[arg(short, long)]
    pub force: bool,
}

/// Sync of one repository, run by the batch executor
pub struct SyncTask<'a> {
    config: &'a Config,
    store: &'a RepoStore,
    repo: Repository,
}

impl<'a> SyncTask<'a> {
    pub fn new(ctx: &'a Context, repo: &Repository) -> Self {
        Self {
            config: &ctx.config,
            store: &ctx.store,
            repo: repo.clone(),
        }
    }
}

impl Task for SyncTask<'_> {
    type Output = SyncResult;

    fn name(&self) -> String {
        self.repo.id()
    }

    fn run(&self) -> Result<SyncResult> {
        sync_repository(self.config, self.store, &self.repo, Verbosity::Quiet)
    }
}

pub fn run(ctx: &Context, args: &SyncArgs) -> Result<()> {
    let head = args.head.as_deref().unwrap_or_default();
    let query = args.query.as_deref().unwrap_or_default();

    if !args.recursive && head.is_empty() && query.is_empty() {
        if let Ok(repo) = ctx.current() {
            let result = sync_repository(&ctx.config, &ctx.store, &repo, Verbosity::Verbose)?;
            if !result.is_empty() {
                eprintln!("{}", result.render(false));
            }
            return Ok(());
        }
    }

    let filter = ManyFilter {
        sync: if args.force { None } else { Some(true) },
        pin: None,
    };
    let repos = ctx.resolver().resolve_many(head, query, filter)?;
    if repos.is_empty() {
        Verbosity::Verbose.info("Nothing to sync");
        return Ok(());
    }

    confirm(format!("Sync {} repositories?", repos.len()))?;
    let tasks: Vec<SyncTask> = repos.iter().map(|repo| SyncTask::new(ctx, repo)).collect();
    let results = batch::run("Sync", &tasks)?;
    for result in results.iter().filter(|result| !result.is_empty()) {
        eprintln!("{}", result.render(true));
    }
    Ok(())
}

/// Create the repository if missing, refresh its git setup, then sync branches
///
/// Repositories of local-only remotes have nothing to sync against.
fn sync_repository(
    config: &Config,
    store: &RepoStore,
    repo: &Repository,
    verbosity: Verbosity,
) -> Result<SyncResult> {
    let id = repo.id();
    let remote = config.remote(&repo.remote)?;
    if remote.clone.is_none() {
        debug!("Skipping {}: local-only remote", id);
        return Ok(SyncResult::new(&id));
    }

    let path = workspace::ensure_created(config, repo, false, verbosity)?;
    let git = GitCommand::in_dir(&path, verbosity);
    workspace::ensure_user_email(&git, &remote.owner(&repo.owner))?;
    refresh_language(store, repo, &path)?;
    workspace::ensure_origin(&git, remote, repo)?;

    sync_branches(&git, &id, verbosity)
}

fn refresh_language(store: &RepoStore, repo: &Repository, path: &Path) -> Result<()> {
    let language = workspace::detect_language(path);
    if language != repo.language {
        store.modify(&repo.id(), |stored| stored.language = language)?;
    }
    Ok(())
}
