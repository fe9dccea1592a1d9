//! The origin and upstream remotes of a repository

use tracing::info;

use super::{DEFAULT_REMOTE, GitRunner};
use crate::error::Result;

/// Remote pointing at the parent of a fork
pub const UPSTREAM_REMOTE: &str = "upstream";

/// URL of `name`, `None` when the repository has no such remote
pub fn remote_url(git: &dyn GitRunner, name: &str) -> Result<Option<String>> {
    let remotes = git.lines(&["remote"])?;
    if !remotes.iter().any(|r| r.trim() == name) {
        return Ok(None);
    }
    let url = git.output(&["remote", "get-url", name])?;
    Ok(Some(url.trim().to_string()))
}

/// Point `name` at `url`, adding it when missing
pub fn ensure_remote(git: &dyn GitRunner, name: &str, url: &str) -> Result<()> {
    match remote_url(git, name)? {
        Some(current) if current == url => Ok(()),
        Some(current) => {
            info!("Updating {} from {} to {}", name, current, url);
            git.run(&["remote", "set-url", name, url])
        }
        None => {
            info!("Adding {} {}", name, url);
            git.run(&["remote", "add", name, url])
        }
    }
}

pub fn ensure_origin(git: &dyn GitRunner, url: &str) -> Result<()> {
    ensure_remote(git, DEFAULT_REMOTE, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FakeGit;

    const URL: &str = "git@github.com:acme/widget.git";

    #[test]
    fn test_ensure_origin_adds_missing() {
        let git = FakeGit::new().ok("remote", "upstream\n");
        ensure_origin(&git, URL).unwrap();
        assert_eq!(git.calls(), vec!["remote".to_string(), format!("remote add origin {}", URL)]);
    }

    #[test]
    fn test_ensure_origin_updates_changed() {
        let git = FakeGit::new()
            .ok("remote", "origin\n")
            .ok("remote get-url origin", "https://github.com/acme/widget.git\n");
        ensure_origin(&git, URL).unwrap();
        assert_eq!(git.calls().last().unwrap(), &format!("remote set-url origin {}", URL));
    }

    #[test]
    fn test_ensure_upstream_remote() {
        let git = FakeGit::new().ok("remote", "origin\n");
        ensure_remote(&git, UPSTREAM_REMOTE, URL).unwrap();
        assert_eq!(git.calls().last().unwrap(), &format!("remote add upstream {}", URL));
    }

    #[test]
    fn test_ensure_origin_keeps_same() {
        let git = FakeGit::new()
            .ok("remote", "origin\n")
            .ok("remote get-url origin", &format!("{}\n", URL));
        ensure_origin(&git, URL).unwrap();
        assert_eq!(git.calls().len(), 2);
    }
}
