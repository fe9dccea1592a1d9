//! Configuration management for roam
//!
//! Stores the workspace location, the configured remotes and per-owner
//! settings in a JSON file under the user's config directory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "ROAM_CONFIG";

/// The name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory repositories are cloned into (`<workspace>/<remote>/<owner>/<name>`)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Directory holding the repository store and the api cache
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// External chooser command (e.g. "fzf"); the built-in list is used when unset
    #[serde(default)]
    pub select_cmd: Option<String>,

    /// How long remote api responses stay cached
    #[serde(default = "default_api_cache_hours")]
    pub api_cache_hours: u64,

    /// Configured remotes by name
    #[serde(default = "default_remotes")]
    pub remotes: BTreeMap<String, RemoteConfig>,
}

fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dev")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roam")
}

fn default_api_cache_hours() -> u64 {
    24
}

fn default_remotes() -> BTreeMap<String, RemoteConfig> {
    let mut remotes = BTreeMap::new();
    remotes.insert(
        "github".to_string(),
        RemoteConfig {
            name: "github".to_string(),
            clone: Some("github.com".to_string()),
            provider: Some(Provider::GitHub),
            api: Some(ApiConfig::default()),
            default: OwnerConfig::default(),
            owners: HashMap::new(),
        },
    );
    remotes
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            data_dir: default_data_dir(),
            select_cmd: None,
            api_cache_hours: default_api_cache_hours(),
            remotes: default_remotes(),
        }
    }
}

/// Hosting flavour of a remote, decides how web URLs are split into owner and name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Exactly `owner/name`
    GitHub,
    /// Nested groups, `-` ends the repository path
    GitLab,
}

/// A configured remote, e.g. "github" cloning from github.com
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Remote name, filled from the map key
    #[serde(skip)]
    pub name: String,

    /// Clone host; local-only remotes have none
    #[serde(default)]
    pub clone: Option<String>,

    /// Hosting flavour, inferred from the clone host when absent
    #[serde(default)]
    pub provider: Option<Provider>,

    /// Hosting api for owner listings and fork detection
    #[serde(default)]
    pub api: Option<ApiConfig>,

    /// Settings applied to every owner
    #[serde(default)]
    pub default: OwnerConfig,

    /// Per-owner overrides
    #[serde(default)]
    pub owners: HashMap<String, OwnerConfig>,
}

impl RemoteConfig {
    pub fn provider(&self) -> Provider {
        match (self.provider, self.clone.as_deref()) {
            (Some(provider), _) => provider,
            (None, Some("github.com")) => Provider::GitHub,
            _ => Provider::GitLab,
        }
    }

    /// Effective settings for an owner: the remote default overlaid with the owner entry
    pub fn owner(&self, owner: &str) -> OwnerConfig {
        match self.owners.get(owner) {
            Some(specific) => self.default.merge(specific),
            None => self.default.clone(),
        }
    }

    /// Clone URL for a repository, `None` for local-only remotes
    pub fn clone_url(&self, owner: &str, name: &str, ssh: bool) -> Option<String> {
        let host = self.clone.as_deref()?;
        if ssh {
            Some(format!("git@{}:{}/{}.git", host, owner, name))
        } else {
            Some(format!("https://{}/{}/{}.git", host, owner, name))
        }
    }
}

/// Access to a remote's hosting api
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Access token, `$NAME` reads it from the environment; never printed
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Api base URL, derived from the clone host when unset
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size of owner listings
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_api_timeout_secs() -> u64 {
    5
}

fn default_list_limit() -> usize {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            url: None,
            timeout_secs: default_api_timeout_secs(),
            list_limit: default_list_limit(),
        }
    }
}

impl ApiConfig {
    /// The effective token; an empty or unset one means anonymous access
    pub fn token(&self) -> Option<String> {
        let token = self.token.as_deref()?;
        let token = match token.strip_prefix('$') {
            Some(var) => std::env::var(var).ok()?,
            None => token.to_string(),
        };
        (!token.is_empty()).then_some(token)
    }
}

/// Settings for the repositories of one owner
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OwnerConfig {
    /// Include in batch sync
    #[serde(default)]
    pub sync: Option<bool>,

    /// Mark repositories as pinned
    #[serde(default)]
    pub pin: Option<bool>,

    /// Clone over ssh instead of https
    #[serde(default)]
    pub ssh: Option<bool>,

    /// git user.name applied after creation
    #[serde(default)]
    pub user: Option<String>,

    /// git user.email applied after creation
    #[serde(default)]
    pub email: Option<String>,

    /// Shell commands run inside a newly created repository
    #[serde(default)]
    pub on_create: Vec<String>,
}

impl OwnerConfig {
    /// Overlay `other` on top of `self`
    pub fn merge(&self, other: &OwnerConfig) -> OwnerConfig {
        OwnerConfig {
            sync: other.sync.or(self.sync),
            pin: other.pin.or(self.pin),
            ssh: other.ssh.or(self.ssh),
            user: other.user.clone().or_else(|| self.user.clone()),
            email: other.email.clone().or_else(|| self.email.clone()),
            on_create: if other.on_create.is_empty() {
                self.on_create.clone()
            } else {
                other.on_create.clone()
            },
        }
    }
}

impl Config {
    /// Resolve the config file location
    pub fn path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("roam").join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Load config from a file, or use the default if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
            })?;
            Self::parse(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
            })?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Config::default()
        };
        config.normalize()
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Fill derived fields and validate remote names
    fn normalize(mut self) -> Result<Self> {
        self.workspace = expand_home(&self.workspace);
        self.data_dir = expand_home(&self.data_dir);
        for (name, remote) in self.remotes.iter_mut() {
            if name.is_empty() || name == "-" || name.contains([':', '/']) {
                return Err(Error::Config(format!("invalid remote name {:?}", name)));
            }
            remote.name = name.clone();
        }
        Ok(self)
    }

    pub fn remote(&self, name: &str) -> Result<&RemoteConfig> {
        self.remotes
            .get(name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown remote {:?}", name)))
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.remotes.contains_key(name)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("repos.json")
    }

    pub fn api_cache_path(&self) -> PathBuf {
        self.data_dir.join("api_cache.json")
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "workspace": "/work",
        "remotes": {
            "github": {
                "clone": "github.com",
                "default": { "sync": false, "ssh": false, "user": "me" },
                "owners": {
                    "acme": { "sync": true, "ssh": true, "on_create": ["make setup"] }
                }
            },
            "corp": {
                "clone": "gitlab.example.com",
                "api": { "token": "glpat-secret", "list_limit": 20 }
            },
            "local": {}
        }
    }"#;

    fn sample() -> Config {
        Config::parse(SAMPLE).unwrap().normalize().unwrap()
    }

    #[test]
    fn test_parse_fills_remote_names() {
        let config = sample();
        assert_eq!(config.workspace, PathBuf::from("/work"));
        assert_eq!(config.remote("corp").unwrap().name, "corp");
        assert_eq!(config.api_cache_hours, 24);
    }

    #[test]
    fn test_api_config() {
        let config = sample();
        assert!(config.remote("github").unwrap().api.is_none());

        let api = config.remote("corp").unwrap().api.clone().unwrap();
        assert_eq!(api.list_limit, 20);
        assert_eq!(api.timeout_secs, 5);
        assert_eq!(api.token().as_deref(), Some("glpat-secret"));

        let printed = serde_json::to_string(&config).unwrap();
        assert!(!printed.contains("glpat-secret"));

        let anonymous = ApiConfig {
            token: Some(String::new()),
            ..ApiConfig::default()
        };
        assert_eq!(anonymous.token(), None);
        assert!(Config::default().remote("github").unwrap().api.is_some());
    }

    #[test]
    fn test_unknown_remote() {
        let config = sample();
        let err = config.remote("bitbucket").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!config.has_remote("bitbucket"));
    }

    #[test]
    fn test_provider_inference() {
        let config = sample();
        assert_eq!(config.remote("github").unwrap().provider(), Provider::GitHub);
        assert_eq!(config.remote("corp").unwrap().provider(), Provider::GitLab);
    }

    #[test]
    fn test_owner_merge() {
        let github = sample().remote("github").unwrap().clone();

        let acme = github.owner("acme");
        assert_eq!(acme.sync, Some(true));
        assert_eq!(acme.ssh, Some(true));
        assert_eq!(acme.user.as_deref(), Some("me"));
        assert_eq!(acme.on_create, vec!["make setup".to_string()]);

        let other = github.owner("someone");
        assert_eq!(other.sync, Some(false));
        assert!(other.on_create.is_empty());
    }

    #[test]
    fn test_clone_url() {
        let config = sample();
        let github = config.remote("github").unwrap();
        assert_eq!(
            github.clone_url("acme", "widget", true).as_deref(),
            Some("git@github.com:acme/widget.git")
        );
        assert_eq!(
            github.clone_url("acme", "widget", false).as_deref(),
            Some("https://github.com/acme/widget.git")
        );
        assert_eq!(config.remote("local").unwrap().clone_url("a", "b", false), None);
    }

    #[test]
    fn test_invalid_remote_name() {
        let config = Config::parse(r#"{"remotes": {"a:b": {}}}"#).unwrap();
        assert!(matches!(config.normalize(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert!(config.has_remote("github"));
        assert_eq!(config.remote("github").unwrap().name, "github");
    }
}
