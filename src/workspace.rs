//! Repository directories on disk
//!
//! Creates missing repositories (clone or init), applies the owner's git
//! identity and `on_create` hooks, and cleans directories up again on removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{Config, OwnerConfig, RemoteConfig};
use crate::error::{Error, Result};
use crate::git::{self, GitCommand, GitRunner};
use crate::remote::RemoteApi;
use crate::store::Repository;
use crate::term::Verbosity;

/// Marker files, checked in order
const LANGUAGE_MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("package.json", "javascript"),
    ("pyproject.toml", "python"),
];

/// Make sure the repository exists on disk, cloning or initializing it when missing
///
/// Returns the repository path. `thin` clones with `--depth 1`.
pub fn ensure_created(
    config: &Config,
    repo: &Repository,
    thin: bool,
    verbosity: Verbosity,
) -> Result<PathBuf> {
    let path = repo.path(&config.workspace);
    if path.exists() {
        return Ok(path);
    }

    let remote = config.remote(&repo.remote)?;
    let owner = remote.owner(&repo.owner);
    let url = remote.clone_url(&repo.owner, &repo.name, owner.ssh.unwrap_or(false));

    match url {
        Some(url) => {
            verbosity.info(format!("Clone {}", url));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let target = path.to_string_lossy();
            let mut args = vec!["clone"];
            if thin {
                args.extend(["--depth", "1"]);
            }
            args.extend([url.as_str(), &*target]);
            GitCommand::new(verbosity).run(&args)?;
        }
        None => {
            verbosity.info(format!("Init {}", path.display()));
            fs::create_dir_all(&path)?;
            GitCommand::in_dir(&path, verbosity).run(&["init"])?;
        }
    }

    let git = GitCommand::in_dir(&path, verbosity);
    ensure_user_email(&git, &owner)?;
    run_hooks(&path, repo, remote, &owner.on_create, verbosity)?;

    info!("Created {} at {}", repo.id(), path.display());
    Ok(path)
}

/// Apply the owner's git identity to the repository
pub fn ensure_user_email(git: &dyn GitRunner, owner: &OwnerConfig) -> Result<()> {
    if let Some(user) = &owner.user {
        git.run(&["config", "user.name", user])?;
    }
    if let Some(email) = &owner.email {
        git.run(&["config", "user.email", email])?;
    }
    Ok(())
}

/// Point origin at the configured clone URL; local-only remotes are left alone
pub fn ensure_origin(git: &dyn GitRunner, remote: &RemoteConfig, repo: &Repository) -> Result<()> {
    let ssh = remote.owner(&repo.owner).ssh.unwrap_or(false);
    match remote.clone_url(&repo.owner, &repo.name, ssh) {
        Some(url) => git::ensure_origin(git, &url),
        None => Ok(()),
    }
}

/// Add an `upstream` remote when the hosting api reports the repository as a fork
///
/// Returns the upstream URL that was set.
pub fn ensure_upstream(
    git: &dyn GitRunner,
    remote: &RemoteConfig,
    api: &dyn RemoteApi,
    repo: &Repository,
) -> Result<Option<String>> {
    let info = api.get_repo(&repo.owner, &repo.name)?;
    debug!("{} lives at {}", repo.id(), info.web_url);

    let Some(upstream) = info.upstream else {
        return Ok(None);
    };
    let ssh = remote.owner(&upstream.owner).ssh.unwrap_or(false);
    let Some(url) = remote.clone_url(&upstream.owner, &upstream.name, ssh) else {
        return Ok(None);
    };
    git::ensure_remote(git, git::UPSTREAM_REMOTE, &url)?;
    Ok(Some(url))
}

/// Run `on_create` commands inside the new repository
fn run_hooks(
    dir: &Path,
    repo: &Repository,
    remote: &RemoteConfig,
    commands: &[String],
    verbosity: Verbosity,
) -> Result<()> {
    for command in commands {
        verbosity.info(format!("Run {}", command));

        let mut cmd = Command::new("sh");
        cmd.args(["-c", command])
            .current_dir(dir)
            .env("REPO_REMOTE", &repo.remote)
            .env("REPO_OWNER", &repo.owner)
            .env("REPO_NAME", &repo.name)
            .env("REMOTE_CLONE", remote.clone.as_deref().unwrap_or(""))
            .stdin(Stdio::null());
        // stdout belongs to the printed path
        if verbosity.is_verbose() {
            cmd.stdout(Stdio::from(io::stderr())).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        }

        let output = cmd.output().map_err(|e| Error::Command {
            command: command.clone(),
            message: e.to_string(),
        })?;
        debug!("Hook {:?} exited with {}", command, output.status);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::Command {
                command: command.clone(),
                message: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
    }
    Ok(())
}

pub fn detect_language(dir: &Path) -> Option<String> {
    LANGUAGE_MARKERS
        .iter()
        .find(|(marker, _)| dir.join(marker).is_file())
        .map(|(_, language)| language.to_string())
}

/// Delete a repository directory, then every parent it leaves empty below the workspace
pub fn remove_dir(workspace: &Path, dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
        info!("Removed {}", dir.display());
    }

    let mut parent = dir.parent();
    while let Some(current) = parent {
        if current == workspace || !current.starts_with(workspace) {
            break;
        }
        let empty = match fs::read_dir(current) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => false,
        };
        if !empty {
            break;
        }
        debug!("Removing empty directory {}", current.display());
        fs::remove_dir(current)?;
        parent = current.parent();
    }
    Ok(())
}

/// Total size in bytes of the files under `dir`
pub fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
