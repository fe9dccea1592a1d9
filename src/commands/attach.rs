//! `roam attach` and `roam detach`: bind the working directory to a repository id

use clap::Args;
use tracing::info;

use super::{Context, apply_owner_flags};
use crate::error::{Error, Result};
use crate::git::GitCommand;
use crate::store::{Repository, now, split_owner};
use crate::term::Verbosity;
use crate::workspace;

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Remote name
    pub remote: String,

    /// `owner/name`
    pub name: String,
}

pub fn attach(ctx: &Context, args: &AttachArgs) -> Result<()> {
    let repo = bind(ctx, &args.remote, &args.name)?;

    let remote = ctx.config.remote(&repo.remote)?;
    let git = GitCommand::in_dir(&ctx.cwd, Verbosity::Verbose);
    workspace::ensure_origin(&git, remote, &repo)?;
    workspace::ensure_user_email(&git, &remote.owner(&repo.owner))?;

    Verbosity::Verbose.info(format!("Attached {} to {}", ctx.cwd.display(), repo.id()));
    Ok(())
}

/// Store a new repository for the working directory
fn bind(ctx: &Context, remote: &str, name: &str) -> Result<Repository> {
    if !ctx.config.has_remote(remote) {
        return Err(Error::InvalidInput(format!("unknown remote {:?}", remote)));
    }
    let (owner, name) = split_owner(name)
        .ok_or_else(|| Error::InvalidInput(format!("expected owner/name, got {:?}", name)))?;

    if let Ok(bound) = ctx.current() {
        if ctx.path(&bound) == ctx.cwd {
            return Err(Error::InvalidInput(format!(
                "{} is already attached to {}",
                ctx.cwd.display(),
                bound.id()
            )));
        }
    }

    let mut repo = Repository::new(remote, owner, name);
    if ctx.store.get(&repo.id()).is_ok() {
        return Err(Error::InvalidInput(format!("{} already exists", repo.id())));
    }
    // inside the workspace the location follows from the id
    if ctx.path(&repo) != ctx.cwd {
        repo.path = Some(ctx.cwd.clone());
    }

    repo.init_score(now());
    let owner = ctx.owner(&repo)?;
    apply_owner_flags(&mut repo, &owner);
    repo.language = workspace::detect_language(&ctx.cwd);
    ctx.store.insert(&repo)?;
    info!("Attached {}", repo.id());
    Ok(repo)
}

pub fn detach(ctx: &Context) -> Result<()> {
    let repo = ctx.current()?;
    ctx.store.delete(&repo.id())?;
    Verbosity::Verbose.info(format!("Detached {}", repo.id()));
    Ok(())
}
