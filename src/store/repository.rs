//! Repository records kept in the store

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A tracked repository, identified by `remote:owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Configured remote name (e.g., "github")
    pub remote: String,
    /// Owner, may contain `/` for nested groups
    pub owner: String,
    /// Repository name
    pub name: String,

    /// Explicit location for attached repositories; derived from the workspace otherwise
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub pin: bool,

    /// Included in batch sync
    #[serde(default)]
    pub sync: bool,

    /// Detected main language
    #[serde(default)]
    pub language: Option<String>,

    /// Unix time of the last visit
    #[serde(default)]
    pub visit_time: u64,

    #[serde(default)]
    pub visit_count: u64,

    /// Cached frecency score, only used for ordering
    #[serde(default)]
    pub score: u64,

    /// Resolved but not yet in the store
    #[serde(skip)]
    pub new_created: bool,
}

/// How much of the id to show when listing repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLevel {
    /// `remote:owner/name`
    Remote,
    /// `owner/name`
    Owner,
}

impl Repository {
    pub fn new(remote: &str, owner: &str, name: &str) -> Self {
        Self {
            remote: remote.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            path: None,
            pin: false,
            sync: false,
            language: None,
            visit_time: 0,
            visit_count: 0,
            score: 0,
            new_created: false,
        }
    }

    pub fn id(&self) -> String {
        build_id(&self.remote, &self.owner, &self.name)
    }

    /// Where the repository lives on disk
    pub fn path(&self, workspace: &Path) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => workspace_path(workspace, &self.remote, &self.owner, &self.name),
        }
    }

    pub fn display(&self, level: DisplayLevel) -> String {
        match level {
            DisplayLevel::Remote => self.id(),
            DisplayLevel::Owner => format!("{}/{}", self.owner, self.name),
        }
    }
}

pub fn build_id(remote: &str, owner: &str, name: &str) -> String {
    format!("{}:{}/{}", remote, owner, name)
}

/// Split an id back into `(remote, owner, name)`
pub fn parse_id(id: &str) -> Option<(&str, &str, &str)> {
    let (remote, rest) = id.split_once(':')?;
    let (owner, name) = split_owner(rest)?;
    if remote.is_empty() {
        return None;
    }
    Some((remote, owner, name))
}

/// Split `owner/name` on the last `/`, so nested groups stay in the owner
pub fn split_owner(path: &str) -> Option<(&str, &str)> {
    let (owner, name) = path.rsplit_once('/')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner, name))
}

pub fn workspace_path(workspace: &Path, remote: &str, owner: &str, name: &str) -> PathBuf {
    let mut path = workspace.join(remote);
    for segment in owner.split('/') {
        path.push(segment);
    }
    path.join(name)
}
