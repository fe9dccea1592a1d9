//! Subcommands and the state they share

pub mod attach;
pub mod config;
pub mod home;
pub mod inspect;
pub mod list;
pub mod remove;
pub mod sync;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, OwnerConfig};
use crate::error::Result;
use crate::remote::{ApiRegistry, CacheStore};
use crate::resolve::Resolver;
use crate::selector::{self, Selector};
use crate::store::{RepoStore, Repository};

/// Everything a command needs, loaded once per invocation
pub struct Context {
    pub config: Config,
    pub store: RepoStore,
    pub apis: ApiRegistry,
    pub selector: Box<dyn Selector>,
    pub cwd: PathBuf,
}

impl Context {
    /// Load config and store; `refresh_api` bypasses cached api responses
    pub fn load(config_path: Option<&Path>, refresh_api: bool) -> Result<Self> {
        let path = Config::path(config_path)?;
        let config = Config::load(&path)?;
        debug!("Workspace {}", config.workspace.display());

        let store = RepoStore::open(&config.store_path())?;
        let ttl = Duration::from_secs(config.api_cache_hours * 60 * 60);
        let cache = CacheStore::open(&config.api_cache_path(), ttl, refresh_api);
        let apis = ApiRegistry::from_config(&config, cache);
        let selector = selector::from_config(config.select_cmd.as_deref());
        let cwd = std::env::current_dir()?;

        Ok(Self {
            config,
            store,
            apis,
            selector,
            cwd,
        })
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.config,
            &self.store,
            self.selector.as_ref(),
            &self.apis,
            &self.cwd,
        )
    }

    /// The stored repository the working directory is in
    pub fn current(&self) -> Result<Repository> {
        self.resolver().current()
    }

    pub fn path(&self, repo: &Repository) -> PathBuf {
        repo.path(&self.config.workspace)
    }

    pub fn owner(&self, repo: &Repository) -> Result<OwnerConfig> {
        Ok(self.config.remote(&repo.remote)?.owner(&repo.owner))
    }
}

/// Copy the owner's pin and sync flags onto a repository
pub fn apply_owner_flags(repo: &mut Repository, owner: &OwnerConfig) {
    if let Some(pin) = owner.pin {
        repo.pin = pin;
    }
    if let Some(sync) = owner.sync {
        repo.sync = sync;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::resolve::tests::config;
    use crate::selector::tests::ScriptedSelector;

    /// A context over an empty in-memory store, rooted at `workspace`
    pub(crate) fn context(workspace: &Path) -> Context {
        let mut config = config();
        config.workspace = workspace.to_path_buf();
        Context {
            config,
            store: RepoStore::in_memory(),
            apis: ApiRegistry::default(),
            selector: Box::new(ScriptedSelector::cancel()),
            cwd: workspace.to_path_buf(),
        }
    }

    #[test]
    fn test_apply_owner_flags() {
        let mut repo = Repository::new("github", "acme", "widget");
        repo.pin = true;

        apply_owner_flags(
            &mut repo,
            &OwnerConfig {
                sync: Some(true),
                ..OwnerConfig::default()
            },
        );
        assert!(repo.pin);
        assert!(repo.sync);

        apply_owner_flags(
            &mut repo,
            &OwnerConfig {
                pin: Some(false),
                ..OwnerConfig::default()
            },
        );
        assert!(!repo.pin);
        assert!(repo.sync);
    }
}
