//! GitHub and GitLab REST adapters
//!
//! Both speak blocking JSON over `ureq`. Which one a remote gets is decided by
//! its [`Provider`]; [`HostApi`] is the closed set the registry holds.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

use super::{RemoteApi, RemoteRepo, RemoteUpstream};
use crate::config::{ApiConfig, Provider, RemoteConfig};
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("roam/", env!("CARGO_PKG_VERSION"));

const GITHUB_HOST: &str = "github.com";
const GITHUB_API: &str = "https://api.github.com";

struct HttpClient {
    agent: ureq::Agent,
    base: String,
    /// Header carrying the token
    auth: Option<(&'static str, String)>,
    list_limit: usize,
}

impl HttpClient {
    fn new(base: String, auth: Option<(&'static str, String)>, api: &ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base: base.trim_end_matches('/').to_string(),
            auth,
            list_limit: api.list_limit,
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        debug!("GET {}", url);

        let mut request = self.agent.get(&url);
        if let Some((header, value)) = &self.auth {
            request = request.set(header, value);
        }
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = request
            .call()
            .map_err(|e| Error::Api(format!("GET {}: {}", url, e)))?;
        response
            .into_json()
            .map_err(|e| Error::Api(format!("GET {}: {}", url, e)))
    }

    fn page(&self) -> [(&'static str, String); 1] {
        [("per_page", self.list_limit.to_string())]
    }
}

/// `group/sub` as a single path segment
fn encode_segment(path: &str) -> String {
    form_urlencoded::byte_serialize(path.as_bytes()).collect()
}

fn missing(field: &str, owner: &str, name: &str) -> Error {
    Error::Api(format!("missing {} for {}/{}", field, owner, name))
}

pub struct GitHubApi {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    #[serde(default)]
    owner: Option<GitHubOwner>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    html_url: String,
    /// Root of the fork network
    #[serde(default)]
    source: Option<Box<GitHubRepo>>,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

impl GitHubApi {
    pub fn new(host: &str, api: &ApiConfig) -> Self {
        let base = match &api.url {
            Some(url) => url.clone(),
            None if host == GITHUB_HOST => GITHUB_API.to_string(),
            None => format!("https://{}/api/v3", host),
        };
        let auth = api
            .token()
            .map(|token| ("Authorization", format!("Bearer {}", token)));
        Self {
            client: HttpClient::new(base, auth, api),
        }
    }

    fn convert(owner: &str, repo: GitHubRepo) -> Result<RemoteRepo> {
        let default_branch = repo
            .default_branch
            .filter(|branch| !branch.is_empty())
            .ok_or_else(|| missing("default branch", owner, &repo.name))?;

        let upstream = match repo.source {
            Some(source) => {
                let source = *source;
                let upstream_owner = source
                    .owner
                    .map(|o| o.login)
                    .ok_or_else(|| missing("upstream owner", owner, &repo.name))?;
                let upstream_branch = source
                    .default_branch
                    .ok_or_else(|| missing("upstream default branch", owner, &repo.name))?;
                Some(RemoteUpstream {
                    owner: upstream_owner,
                    name: source.name,
                    default_branch: upstream_branch,
                })
            }
            None => None,
        };

        Ok(RemoteRepo {
            default_branch,
            upstream,
            web_url: repo.html_url,
        })
    }
}

impl RemoteApi for GitHubApi {
    fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
        let path = format!("/users/{}/repos", encode_segment(owner));
        let repos: Vec<GitHubRepo> = self.client.get(&path, &self.client.page())?;
        Ok(repos.into_iter().map(|repo| repo.name).collect())
    }

    fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
        let path = format!("/repos/{}/{}", encode_segment(owner), encode_segment(name));
        let repo: GitHubRepo = self.client.get(&path, &[])?;
        Self::convert(owner, repo)
    }
}

pub struct GitLabApi {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path: String,
    #[serde(default)]
    namespace: Option<GitLabNamespace>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    forked_from_project: Option<Box<GitLabProject>>,
}

#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    full_path: String,
}

impl GitLabApi {
    pub fn new(host: &str, api: &ApiConfig) -> Self {
        let base = match &api.url {
            Some(url) => url.clone(),
            None => format!("https://{}/api/v4", host),
        };
        let auth = api.token().map(|token| ("PRIVATE-TOKEN", token));
        Self {
            client: HttpClient::new(base, auth, api),
        }
    }

    fn convert(owner: &str, project: GitLabProject) -> Result<RemoteRepo> {
        let default_branch = project
            .default_branch
            .filter(|branch| !branch.is_empty())
            .ok_or_else(|| missing("default branch", owner, &project.path))?;

        let upstream = match project.forked_from_project {
            Some(parent) => {
                let parent = *parent;
                let upstream_owner = parent
                    .namespace
                    .map(|ns| ns.full_path)
                    .ok_or_else(|| missing("upstream namespace", owner, &project.path))?;
                let upstream_branch = parent
                    .default_branch
                    .ok_or_else(|| missing("upstream default branch", owner, &project.path))?;
                Some(RemoteUpstream {
                    owner: upstream_owner,
                    name: parent.path,
                    default_branch: upstream_branch,
                })
            }
            None => None,
        };

        Ok(RemoteRepo {
            default_branch,
            upstream,
            web_url: project.web_url,
        })
    }
}

impl RemoteApi for GitLabApi {
    fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
        let path = format!("/groups/{}/projects", encode_segment(owner));
        let projects: Vec<GitLabProject> = self.client.get(&path, &self.client.page())?;
        Ok(projects.into_iter().map(|project| project.path).collect())
    }

    fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
        let id = encode_segment(&format!("{}/{}", owner, name));
        let project: GitLabProject = self.client.get(&format!("/projects/{}", id), &[])?;
        Self::convert(owner, project)
    }
}

/// The api adapter of one remote
pub enum HostApi {
    GitHub(GitHubApi),
    GitLab(GitLabApi),
}

impl HostApi {
    /// `None` unless the remote has both a clone host and an `api` section
    pub fn from_config(remote: &RemoteConfig) -> Option<Self> {
        let api = remote.api.as_ref()?;
        let host = remote.clone.as_deref()?;
        Some(match remote.provider() {
            Provider::GitHub => HostApi::GitHub(GitHubApi::new(host, api)),
            Provider::GitLab => HostApi::GitLab(GitLabApi::new(host, api)),
        })
    }
}

impl RemoteApi for HostApi {
    fn list_repos(&self, owner: &str) -> Result<Vec<String>> {
        match self {
            HostApi::GitHub(api) => api.list_repos(owner),
            HostApi::GitLab(api) => api.list_repos(owner),
        }
    }

    fn get_repo(&self, owner: &str, name: &str) -> Result<RemoteRepo> {
        match self {
            HostApi::GitHub(api) => api.get_repo(owner, name),
            HostApi::GitLab(api) => api.get_repo(owner, name),
        }
    }
}
