//! Repository store backed by a JSON file
//!
//! Reads are served from memory and may happen concurrently; every write takes
//! the lock exclusively and rewrites the file before releasing it.

mod frecency;
mod query;
mod repository;

pub use frecency::{DAY, HOUR, now};
pub use query::{Order, RepoQuery};
pub use repository::{DisplayLevel, Repository, build_id, parse_id, split_owner};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::{Error, Result};

pub struct RepoStore {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    repos: RwLock<BTreeMap<String, Repository>>,
}

impl RepoStore {
    /// Open the store file, starting empty when it doesn't exist yet
    pub fn open(path: &Path) -> Result<Self> {
        let mut repos = BTreeMap::new();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let list: Vec<Repository> = serde_json::from_str(&content)?;
            for repo in list {
                repos.insert(repo.id(), repo);
            }
        }
        debug!("Loaded {} repositories from {}", repos.len(), path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            repos: RwLock::new(repos),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            repos: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Repository>> {
        self.repos.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Repository>> {
        self.repos.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, id: &str) -> Result<Repository> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn insert(&self, repo: &Repository) -> Result<()> {
        let id = repo.id();
        let mut repos = self.write();
        if repos.contains_key(&id) {
            return Err(Error::InvalidInput(format!("repository {} already exists", id)));
        }
        let mut repo = repo.clone();
        repo.new_created = false;
        repos.insert(id.clone(), repo);
        self.persist(&repos)?;
        debug!("Inserted {}", id);
        Ok(())
    }

    /// Apply `f` to a stored repository and persist the result
    pub fn modify<F>(&self, id: &str, f: F) -> Result<Repository>
    where
        F: FnOnce(&mut Repository),
    {
        let mut repos = self.write();
        let repo = repos
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        f(repo);
        let updated = repo.clone();
        self.persist(&repos)?;
        debug!("Updated {}", id);
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<Repository> {
        let mut repos = self.write();
        let repo = repos
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.persist(&repos)?;
        debug!("Deleted {}", id);
        Ok(repo)
    }

    pub fn query(&self, query: &RepoQuery) -> Vec<Repository> {
        let mut list: Vec<Repository> = self
            .read()
            .values()
            .filter(|repo| query.matches(repo))
            .cloned()
            .collect();
        list.sort_by(|a, b| query.compare(a, b));

        let list = list.into_iter().skip(query.offset);
        match query.limit {
            Some(limit) => list.take(limit).collect(),
            None => list.collect(),
        }
    }

    pub fn count(&self, query: &RepoQuery) -> usize {
        self.read().values().filter(|repo| query.matches(repo)).count()
    }

    /// Rewrite the backing file through a temp file so readers never see a partial write
    fn persist(&self, repos: &BTreeMap<String, Repository>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let list: Vec<&Repository> = repos.values().collect();
        let content = serde_json::to_string_pretty(&list)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(remote: &str, owner: &str, name: &str, score: u64, visit_time: u64) -> Repository {
        let mut repo = Repository::new(remote, owner, name);
        repo.score = score;
        repo.visit_time = visit_time;
        repo
    }

    fn seeded() -> RepoStore {
        let store = RepoStore::in_memory();
        store.insert(&repo("github", "acme", "widget", 10, 300)).unwrap();
        store.insert(&repo("github", "acme", "gadget", 40, 100)).unwrap();
        store.insert(&repo("github", "other", "widget-cli", 20, 200)).unwrap();
        store.insert(&repo("gitlab", "group/sub", "widget", 5, 400)).unwrap();
        store
    }

    fn ids(list: &[Repository]) -> Vec<String> {
        list.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_get_not_found() {
        let store = seeded();
        assert_eq!(store.get("github:acme/widget").unwrap().score, 10);
        assert!(store.get("github:acme/nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_insert_duplicate() {
        let store = seeded();
        let err = store.insert(&Repository::new("github", "acme", "widget")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_query_orders_by_score() {
        let store = seeded();
        let list = store.query(&RepoQuery::new().remote("github"));
        assert_eq!(
            ids(&list),
            vec!["github:acme/gadget", "github:other/widget-cli", "github:acme/widget"]
        );
    }

    #[test]
    fn test_query_by_visit_time_with_limit() {
        let store = seeded();
        let list = store.query(&RepoQuery::new().order_by(Order::VisitTime).limit(2));
        assert_eq!(ids(&list), vec!["gitlab:group/sub/widget", "github:acme/widget"]);
    }

    #[test]
    fn test_query_search_and_offset() {
        let store = seeded();
        let query = RepoQuery {
            offset: 1,
            ..RepoQuery::new().search("WIDGET")
        };
        assert_eq!(store.count(&RepoQuery::new().search("widget")), 3);
        assert_eq!(
            ids(&store.query(&query)),
            vec!["github:acme/widget", "gitlab:group/sub/widget"]
        );
    }

    #[test]
    fn test_modify_and_delete() {
        let store = seeded();
        let updated = store
            .modify("github:acme/widget", |r| r.sync = true)
            .unwrap();
        assert!(updated.sync);
        assert_eq!(
            store.count(&RepoQuery {
                sync: Some(true),
                ..RepoQuery::default()
            }),
            1
        );

        store.delete("github:acme/widget").unwrap();
        assert!(store.delete("github:acme/widget").unwrap_err().is_not_found());
        assert!(store.modify("github:acme/widget", |_| {}).is_err());
    }

    #[test]
    fn test_persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("repos.json");

        let store = RepoStore::open(&path).unwrap();
        let mut attached = repo("github", "acme", "widget", 16, 1);
        attached.path = Some(PathBuf::from("/src/widget"));
        attached.new_created = true;
        store.insert(&attached).unwrap();
        drop(store);

        let store = RepoStore::open(&path).unwrap();
        let loaded = store.get("github:acme/widget").unwrap();
        assert_eq!(loaded.score, 16);
        assert!(!loaded.new_created);
        assert_eq!(
            ids(&store.query(&RepoQuery::new().path("/src/widget"))),
            vec!["github:acme/widget"]
        );
    }
}
