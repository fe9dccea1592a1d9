//! Remote hosting API
//!
//! Resolution only needs two calls from a hosting service: list an owner's
//! repositories and describe one repository. The provider (GitHub or GitLab)
//! is picked per remote in the config; [`ApiCache`] wraps any implementation.

mod cache;
mod http;

pub use cache::{ApiCache, CacheStore};
pub use http::HostApi;
#[cfg(test)]
pub(crate) use cache::tests::CountingApi;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

/// Repository details reported by a hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepo {
    pub default_branch: String,
    /// Parent repository for forks
    pub upstream: Option<RemoteUpstream>,
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUpstream {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

pub trait RemoteApi: Send + Sync {
    /// Names of the repositories under `owner`
    fn list_repos(&self, owner: &str) -> Result<Vec<String>>;

    fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo>;
}

/// APIs by remote name; remotes without an entry only resolve from the store
#[derive(Default)]
pub struct ApiRegistry {
    apis: HashMap<String, Box<dyn RemoteApi>>,
    /// When set, every registered api is wrapped in an [`ApiCache`]
    cache: Option<Arc<CacheStore>>,
}

impl ApiRegistry {
    pub fn cached(store: CacheStore) -> Self {
        Self {
            apis: HashMap::new(),
            cache: Some(Arc::new(store)),
        }
    }

    /// A cached adapter for every remote with an `api` section
    pub fn from_config(config: &Config, store: CacheStore) -> Self {
        let mut registry = Self::cached(store);
        for remote in config.remotes.values() {
            if let Some(api) = HostApi::from_config(remote) {
                debug!("Remote api enabled for {}", remote.name);
                registry.register(&remote.name, api);
            }
        }
        registry
    }

    pub fn register<A: RemoteApi + 'static>(&mut self, remote: &str, api: A) {
        let api: Box<dyn RemoteApi> = match &self.cache {
            Some(store) => Box::new(ApiCache::new(remote, api, store.clone())),
            None => Box::new(api),
        };
        self.apis.insert(remote.to_string(), api);
    }

    pub fn get(&self, remote: &str) -> Option<&dyn RemoteApi> {
        self.apis.get(remote).map(|api| api.as_ref())
    }
}
