//! TTL cache in front of a remote API, persisted as JSON
//!
//! Keys are `remote/owner` for listings and `remote/owner/name` for single
//! repositories. Several remotes share one [`CacheStore`] and one file.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::{RemoteApi, RemoteRepo};
use crate::error::Result;
use crate::store::now;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// Unix time after which the entry is stale
    expire_at: u64,
    value: serde_json::Value,
}

/// Cached responses shared by every [`ApiCache`]
pub struct CacheStore {
    path: Option<PathBuf>,
    ttl: Duration,
    /// Skip lookups and overwrite whatever gets fetched
    force: bool,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Load the cache file; an unreadable file starts an empty cache
    pub fn open(path: &Path, ttl: Duration, force: bool) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt api cache {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path: Some(path.to_path_buf()),
            ttl,
            force,
            entries: RwLock::new(entries),
        }
    }

    #[cfg(test)]
    pub fn in_memory(ttl: Duration, force: bool) -> Self {
        Self {
            path: None,
            ttl,
            force,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if self.force {
            return None;
        }
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.expire_at <= now() {
            debug!("Api cache expired: {}", key);
            return None;
        }
        debug!("Api cache hit: {}", key);
        serde_json::from_value(entry.value.clone()).ok()
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            expire_at: now() + self.ttl.as_secs(),
            value: serde_json::to_value(value)?,
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);

        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, serde_json::to_string(&*entries)?)?;
            std::fs::rename(&tmp, path)?;
        }
        Ok(())
    }
}

/// Caching decorator over a remote API
pub struct ApiCache<A> {
    remote: String,
    inner: A,
    store: Arc<CacheStore>,
}

impl<A: RemoteApi> ApiCache<A> {
    pub fn new(remote: &str, inner: A, store: Arc<CacheStore>) -> Self {
        Self {
            remote: remote.to_string(),
            inner,
            store,
        }
    }
}

impl<A: RemoteApi> RemoteApi for ApiCache<A> {
    fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
        let key = format!("{}/{}", self.remote, owner);
        if let Some(names) = self.store.lookup(&key) {
            return Ok(names);
        }
        let names = self.inner.list_repos(owner)?;
        self.store.save(&key, &names)?;
        Ok(names)
    }

    fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
        let key = format!("{}/{}/{}", self.remote, owner, name);
        if let Some(repo) = self.store.lookup(&key) {
            return Ok(repo);
        }
        let repo = self.inner.get_repo(owner, name)?;
        self.store.save(&key, &repo)?;
        Ok(repo)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed responses, counting how often it is asked
    #[derive(Default)]
    pub(crate) struct CountingApi {
        pub repos: HashMap<String, Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl CountingApi {
        pub fn with_owner(owner: &str, names: &[&str]) -> Self {
            let mut repos = HashMap::new();
            repos.insert(
                owner.to_string(),
                names.iter().map(|n| n.to_string()).collect(),
            );
            Self {
                repos,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RemoteApi for CountingApi {
        fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.repos
                .get(owner)
                .cloned()
                .ok_or_else(|| Error::Api(format!("owner {} not found", owner)))
        }

        fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteRepo {
                default_branch: "main".to_string(),
                upstream: None,
                web_url: format!("https://github.com/{}/{}", owner, name),
            })
        }
    }

    impl RemoteApi for Arc<CountingApi> {
        fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
            self.as_ref().list_repos(owner)
        }

        fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
            self.as_ref().get_repo(owner, name)
        }
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_cache_hit() {
        let api = Arc::new(CountingApi::with_owner("acme", &["widget", "gadget"]));
        let cache = ApiCache::new("github", api.clone(), Arc::new(CacheStore::in_memory(DAY, false)));

        assert_eq!(cache.list_repos("acme").unwrap(), vec!["widget", "gadget"]);
        assert_eq!(cache.list_repos("acme").unwrap(), vec!["widget", "gadget"]);
        assert_eq!(cache.get_repo("acme", "widget").unwrap().default_branch, "main");
        cache.get_repo("acme", "widget").unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn test_force_refresh() {
        let api = Arc::new(CountingApi::with_owner("acme", &["widget"]));
        let cache = ApiCache::new("github", api.clone(), Arc::new(CacheStore::in_memory(DAY, true)));
        cache.list_repos("acme").unwrap();
        cache.list_repos("acme").unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn test_expired_entries_refetch() {
        let api = Arc::new(CountingApi::with_owner("acme", &["widget"]));
        let cache = ApiCache::new(
            "github",
            api.clone(),
            Arc::new(CacheStore::in_memory(Duration::ZERO, false)),
        );
        cache.list_repos("acme").unwrap();
        cache.list_repos("acme").unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let api = Arc::new(CountingApi::with_owner("acme", &["widget"]));
        let cache = ApiCache::new("github", api.clone(), Arc::new(CacheStore::in_memory(DAY, false)));
        assert!(cache.list_repos("nobody").is_err());
        assert!(cache.list_repos("nobody").is_err());
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn test_persisted_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_cache.json");

        let first = Arc::new(CountingApi::with_owner("acme", &["widget"]));
        let cache = ApiCache::new("github", first.clone(), Arc::new(CacheStore::open(&path, DAY, false)));
        cache.list_repos("acme").unwrap();

        let second = Arc::new(CountingApi::with_owner("acme", &["other"]));
        let cache = ApiCache::new("github", second.clone(), Arc::new(CacheStore::open(&path, DAY, false)));
        assert_eq!(cache.list_repos("acme").unwrap(), vec!["widget"]);
        assert_eq!(second.calls(), 0);

        // a different remote has its own keys
        let cache = ApiCache::new("corp", second.clone(), Arc::new(CacheStore::open(&path, DAY, false)));
        assert_eq!(cache.list_repos("acme").unwrap(), vec!["other"]);
    }
}
