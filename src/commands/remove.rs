//! `roam remove`: delete repositories from disk and from the store

use clap::Args;
use tracing::info;

use super::Context;
use crate::error::{Error, Result};
use crate::resolve::{ManyFilter, Mode, ResolveOptions};
use crate::store::Repository;
use crate::term::{Verbosity, confirm};
use crate::workspace;

#[derive(Args, Debug, Default)]
pub struct RemoveArgs {
    /// Remote name or keyword
    pub head: Option<String>,

    /// `owner/`, `owner/name` or keyword within the remote
    pub query: Option<String>,

    /// Remove every matching repository
    #[arg(short, long)]
    pub recursive: bool,

    /// With --recursive, include repositories marked for sync
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(ctx: &Context, args: &RemoveArgs) -> Result<()> {
    let repos = targets(ctx, args)?;
    if repos.is_empty() {
        return Err(Error::NoCandidates("no repository to remove".to_string()));
    }

    for repo in &repos {
        eprintln!("  {}", repo.id());
    }
    confirm(format!("Remove {} repositories?", repos.len()))?;

    for repo in &repos {
        remove(ctx, repo)?;
        Verbosity::Verbose.info(format!("Removed {}", repo.id()));
    }
    Ok(())
}

fn targets(ctx: &Context, args: &RemoveArgs) -> Result<Vec<Repository>> {
    let head = args.head.as_deref().unwrap_or_default();
    let query = args.query.as_deref().unwrap_or_default();

    if args.recursive {
        let filter = ManyFilter {
            sync: if args.force { None } else { Some(false) },
            pin: None,
        };
        return ctx.resolver().resolve_many(head, query, filter);
    }

    let opts = ResolveOptions {
        mode: Mode::Select,
        force_local: true,
        ..ResolveOptions::default()
    };
    Ok(vec![ctx.resolver().resolve(head, query, &opts)?])
}

/// Drop the store entry; workspace clones are deleted, attached directories are kept
fn remove(ctx: &Context, repo: &Repository) -> Result<()> {
    if repo.path.is_none() {
        workspace::remove_dir(&ctx.config.workspace, &ctx.path(repo))?;
    }
    ctx.store.delete(&repo.id())?;
    info!("Removed {}", repo.id());
    Ok(())
}
