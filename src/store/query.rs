//! Filtered, ordered and paginated store queries

use std::cmp::Ordering;
use std::path::PathBuf;

use super::Repository;

/// Sort order of query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Highest score first
    #[default]
    Score,
    /// Most recently visited first
    VisitTime,
}

/// Filter over the repository store; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct RepoQuery {
    pub remote: Option<String>,
    pub owner: Option<String>,
    /// Case-insensitive substring of the name
    pub name_search: Option<String>,
    /// Explicit (attached) path
    pub path: Option<PathBuf>,
    pub pin: Option<bool>,
    pub sync: Option<bool>,
    pub language: Option<String>,
    pub order: Order,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl RepoQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn search(mut self, keyword: impl Into<String>) -> Self {
        self.name_search = Some(keyword.into());
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, repo: &Repository) -> bool {
        if let Some(remote) = &self.remote {
            if &repo.remote != remote {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if &repo.owner != owner {
                return false;
            }
        }
        if let Some(keyword) = &self.name_search {
            if !repo.name.to_lowercase().contains(&keyword.to_lowercase()) {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if repo.path.as_ref() != Some(path) {
                return false;
            }
        }
        if self.pin.is_some_and(|pin| pin != repo.pin) {
            return false;
        }
        if self.sync.is_some_and(|sync| sync != repo.sync) {
            return false;
        }
        if let Some(language) = &self.language {
            if repo.language.as_ref() != Some(language) {
                return false;
            }
        }
        true
    }

    pub(super) fn compare(&self, a: &Repository, b: &Repository) -> Ordering {
        let by_id = || a.id().cmp(&b.id());
        match self.order {
            Order::Score => b.score.cmp(&a.score).then_with(by_id),
            Order::VisitTime => b.visit_time.cmp(&a.visit_time).then_with(by_id),
        }
    }
}
