//! `roam home`: resolve a repository, create it if needed and print its path

use clap::Args;
use std::path::Path;
use tracing::{info, warn};

use super::{Context, apply_owner_flags};
use crate::error::Result;
use crate::git::GitCommand;
use crate::resolve::{Mode, ResolveOptions};
use crate::store::{Repository, now};
use crate::term::{Verbosity, confirm};
use crate::workspace;

#[derive(Args, Debug, Default)]
pub struct HomeArgs {
    /// URL, SSH address, remote name, `-` or keyword
    pub head: Option<String>,

    /// `owner/`, `owner/name` or keyword within the remote
    pub query: Option<String>,

    /// Always choose interactively
    #[arg(short, long)]
    pub select: bool,

    /// Clone with `--depth 1`
    #[arg(short, long)]
    pub thin: bool,

    /// List an owner's repositories from the remote api
    #[arg(short, long)]
    pub remote: bool,

    /// With --remote, hide repositories already stored
    #[arg(short, long)]
    pub filter_local: bool,

    /// Ignore cached api responses
    #[arg(long)]
    pub refresh: bool,
}

impl HomeArgs {
    fn options(&self) -> ResolveOptions {
        ResolveOptions {
            mode: if self.select { Mode::Select } else { Mode::Fuzzy },
            force_local: false,
            from_api: self.remote,
            filter_local: self.filter_local,
        }
    }
}

pub fn run(ctx: &Context, args: &HomeArgs) -> Result<()> {
    let head = args.head.as_deref().unwrap_or_default();
    let query = args.query.as_deref().unwrap_or_default();
    let repo = ctx.resolver().resolve(head, query, &args.options())?;

    let repo = visit(ctx, repo, args.thin)?;
    println!("{}", ctx.path(&repo).display());
    Ok(())
}

/// Record a visit, creating the repository on disk and in the store when new
fn visit(ctx: &Context, mut repo: Repository, thin: bool) -> Result<Repository> {
    let owner = ctx.owner(&repo)?;
    let now = now();

    if repo.new_created {
        confirm(format!("Create {}?", repo.id()))?;
        repo.init_score(now);
        apply_owner_flags(&mut repo, &owner);
        let path = workspace::ensure_created(&ctx.config, &repo, thin, Verbosity::Verbose)?;
        repo.language = workspace::detect_language(&path);
        ctx.store.insert(&repo)?;
        info!("Added {}", repo.id());
        add_upstream(ctx, &repo, &path);
        return Ok(repo);
    }

    let id = repo.id();
    let repo = ctx.store.modify(&id, |repo| {
        repo.update_on_visit(now);
        apply_owner_flags(repo, &owner);
    })?;
    let path = workspace::ensure_created(&ctx.config, &repo, thin, Verbosity::Verbose)?;

    let language = workspace::detect_language(&path);
    if language == repo.language {
        return Ok(repo);
    }
    ctx.store.modify(&id, |repo| repo.language = language)
}

/// Track the parent of a freshly created fork; failures only warn
fn add_upstream(ctx: &Context, repo: &Repository, path: &Path) {
    let Some(api) = ctx.apis.get(&repo.remote) else {
        return;
    };
    let result = ctx.config.remote(&repo.remote).and_then(|remote| {
        let git = GitCommand::in_dir(path, Verbosity::Verbose);
        workspace::ensure_upstream(&git, remote, api, repo)
    });
    match result {
        Ok(Some(url)) => Verbosity::Verbose.info(format!("Upstream {}", url)),
        Ok(None) => {}
        Err(e) => warn!("Cannot set upstream for {}: {}", repo.id(), e),
    }
}
