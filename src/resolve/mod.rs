//! Turn user input into exactly one repository
//!
//! Input is an optional `head` (URL, SSH address, remote name, `-` or a
//! keyword) and an optional `query` (`owner/`, `owner/name` or a keyword
//! scoped to the remote in `head`). Repositories missing from the store come
//! back as unsaved placeholders with `new_created` set.

mod url;

pub use url::{is_ssh, is_url, parse_repo_url};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{Config, RemoteConfig};
use crate::error::{Error, Result};
use crate::remote::ApiRegistry;
use crate::selector::Selector;
use crate::store::{
    DisplayLevel, Order, RepoQuery, RepoStore, Repository, build_id, parse_id, split_owner,
};

/// Head keyword for the most recently visited repositories
pub const LATEST: &str = "-";

/// How many repositories `-` considers
const LATEST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Pick the best candidate automatically
    #[default]
    Fuzzy,
    /// Always ask the user
    Select,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub mode: Mode,
    /// A store miss is an error instead of a placeholder
    pub force_local: bool,
    /// List an owner's repositories from the remote api instead of the store
    pub from_api: bool,
    /// With `from_api`, hide names already in the store
    pub filter_local: bool,
}

/// Flag filters for resolving many repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyFilter {
    pub sync: Option<bool>,
    pub pin: Option<bool>,
}

/// Everything one resolution needs, borrowed for the duration of a command
pub struct Resolver<'a> {
    config: &'a Config,
    store: &'a RepoStore,
    selector: &'a dyn Selector,
    apis: &'a ApiRegistry,
    cwd: PathBuf,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a Config,
        store: &'a RepoStore,
        selector: &'a dyn Selector,
        apis: &'a ApiRegistry,
        cwd: &Path,
    ) -> Self {
        Self {
            config,
            store,
            selector,
            apis,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn resolve(&self, head: &str, query: &str, opts: &ResolveOptions) -> Result<Repository> {
        debug!("Resolve head={:?} query={:?} opts={:?}", head, query, opts);

        if head.is_empty() {
            return match opts.mode {
                Mode::Fuzzy => self.fuzzy(&RepoQuery::new(), true),
                Mode::Select => self.select(&RepoQuery::new(), DisplayLevel::Remote),
            };
        }

        if query.is_empty() {
            if is_ssh(head) || is_url(head) {
                let (remote, owner, name) = parse_repo_url(head, self.config)?;
                return self.from_id(&remote, &owner, &name, opts.force_local);
            }
            if let Some((remote, owner, name)) = parse_id(head) {
                if self.config.has_remote(remote) {
                    return self.from_id(remote, owner, name, opts.force_local);
                }
            }
            if head == LATEST {
                let latest = RepoQuery::new()
                    .order_by(Order::VisitTime)
                    .limit(LATEST_LIMIT);
                return self.choose(&latest, DisplayLevel::Remote, opts.mode);
            }
            if self.config.has_remote(head) {
                return self.choose(&RepoQuery::new().remote(head), DisplayLevel::Owner, opts.mode);
            }
            return self.choose(&RepoQuery::new().search(head), DisplayLevel::Remote, opts.mode);
        }

        let remote = self.config.remote(head)?;
        if let Some(owner) = query.strip_suffix('/') {
            return self.from_owner(remote, owner, opts);
        }
        if query.contains('/') {
            let (owner, name) = split_owner(query)
                .ok_or_else(|| Error::InvalidInput(format!("invalid repository {:?}", query)))?;
            return self.from_id(&remote.name, owner, name, opts.force_local);
        }
        self.choose(
            &RepoQuery::new().remote(head).search(query),
            DisplayLevel::Owner,
            opts.mode,
        )
    }

    /// Repositories for batch commands, highest score first
    pub fn resolve_many(&self, head: &str, query: &str, filter: ManyFilter) -> Result<Vec<Repository>> {
        let mut repo_query = RepoQuery {
            sync: filter.sync,
            pin: filter.pin,
            ..RepoQuery::default()
        };

        if !head.is_empty() && query.is_empty() {
            if self.config.has_remote(head) {
                repo_query.remote = Some(head.to_string());
            } else {
                repo_query.name_search = Some(head.to_string());
            }
        } else if !head.is_empty() {
            let remote = self.config.remote(head)?;
            repo_query.remote = Some(remote.name.clone());
            if let Some(owner) = query.strip_suffix('/') {
                repo_query.owner = Some(owner.to_string());
            } else if let Some((owner, name)) = split_owner(query) {
                let repo = self.store.get(&build_id(&remote.name, owner, name))?;
                return Ok(vec![repo]);
            } else {
                repo_query.name_search = Some(query.to_string());
            }
        }

        Ok(self.store.query(&repo_query))
    }

    /// Innermost stored repository containing the working directory
    pub fn current(&self) -> Result<Repository> {
        for dir in self.cwd.ancestors() {
            if let Some(repo) = self.repo_at(dir) {
                debug!("Current repository {}", repo.id());
                return Ok(repo);
            }
        }
        Err(Error::NotFound(format!("at {}", self.cwd.display())))
    }

    fn repo_at(&self, dir: &Path) -> Option<Repository> {
        if let Some(repo) = self.store.query(&RepoQuery::new().path(dir)).into_iter().next() {
            return Some(repo);
        }

        let rel = dir.strip_prefix(&self.config.workspace).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        if parts.len() < 3 || !self.config.has_remote(parts[0]) {
            return None;
        }
        let owner = parts[1..parts.len() - 1].join("/");
        let id = build_id(parts[0], &owner, parts[parts.len() - 1]);
        self.store.get(&id).ok()
    }

    fn choose(&self, query: &RepoQuery, level: DisplayLevel, mode: Mode) -> Result<Repository> {
        match mode {
            Mode::Fuzzy => self.fuzzy(query, false),
            Mode::Select => self.select(query, level),
        }
    }

    /// Best scored candidate that isn't the repository we are standing in
    ///
    /// With `stay`, a repository whose subdirectory we are in wins over everything.
    fn fuzzy(&self, query: &RepoQuery, stay: bool) -> Result<Repository> {
        let candidates = self.store.query(query);

        if stay {
            let inside = candidates
                .iter()
                .map(|repo| (repo, repo.path(&self.config.workspace)))
                .filter(|(_, path)| self.cwd != *path && self.cwd.starts_with(path))
                .max_by_key(|(_, path)| path.components().count());
            if let Some((repo, _)) = inside {
                return Ok(repo.clone());
            }
        }

        candidates
            .into_iter()
            .find(|repo| repo.path(&self.config.workspace) != self.cwd)
            .ok_or_else(|| Error::NoCandidates("cannot find matched repository".to_string()))
    }

    fn select(&self, query: &RepoQuery, level: DisplayLevel) -> Result<Repository> {
        let candidates = self.store.query(query);
        if candidates.is_empty() {
            return Err(Error::NoCandidates("no repository to select".to_string()));
        }
        let items: Vec<String> = candidates.iter().map(|repo| repo.display(level)).collect();
        let index = self.selector.select(&items)?;
        candidates
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::InvalidInput(format!("selected index {} out of range", index)))
    }

    fn from_owner(&self, remote: &RemoteConfig, owner: &str, opts: &ResolveOptions) -> Result<Repository> {
        let local_names = || -> Vec<String> {
            self.store
                .query(&RepoQuery::new().remote(&remote.name).owner(owner))
                .into_iter()
                .map(|repo| repo.name)
                .collect()
        };

        let api = if opts.from_api {
            let api = self.apis.get(&remote.name);
            if api.is_none() {
                warn!("Remote {} has no api, listing local repositories", remote.name);
            }
            api
        } else {
            None
        };

        let names = match api {
            Some(api) => {
                let mut names = api.list_repos(owner)?;
                if opts.filter_local {
                    let local: HashSet<String> = local_names().into_iter().collect();
                    names.retain(|name| !local.contains(name));
                }
                names
            }
            None => local_names(),
        };
        if names.is_empty() {
            return Err(Error::NoCandidates(format!(
                "no repository to select under {}:{}",
                remote.name, owner
            )));
        }

        let index = self.selector.select(&names)?;
        let name = names
            .get(index)
            .ok_or_else(|| Error::InvalidInput(format!("selected index {} out of range", index)))?;
        self.from_id(&remote.name, owner, name, opts.force_local)
    }

    fn from_id(&self, remote: &str, owner: &str, name: &str, force_local: bool) -> Result<Repository> {
        match self.store.get(&build_id(remote, owner, name)) {
            Ok(repo) => Ok(repo),
            Err(e) if e.is_not_found() && !force_local => {
                debug!("{} is new", build_id(remote, owner, name));
                let mut repo = Repository::new(remote, owner, name);
                repo.new_created = true;
                Ok(repo)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{OwnerConfig, Provider};
    use crate::remote::CountingApi;
    use crate::selector::tests::ScriptedSelector;
    use std::collections::{BTreeMap, HashMap};

    fn remote(name: &str, clone: Option<&str>, provider: Option<Provider>) -> RemoteConfig {
        RemoteConfig {
            name: name.to_string(),
            clone: clone.map(str::to_string),
            provider,
            api: None,
            default: OwnerConfig::default(),
            owners: HashMap::new(),
        }
    }

    pub(crate) fn config() -> Config {
        let mut remotes = BTreeMap::new();
        remotes.insert(
            "github".to_string(),
            remote("github", Some("github.com"), Some(Provider::GitHub)),
        );
        remotes.insert("corp".to_string(), remote("corp", Some("gitlab.example.com"), None));
        remotes.insert("local".to_string(), remote("local", None, None));
        Config {
            workspace: PathBuf::from("/work"),
            data_dir: PathBuf::from("/data"),
            select_cmd: None,
            api_cache_hours: 24,
            remotes,
        }
    }

    fn add(store: &RepoStore, id: &str, score: u64, visit_time: u64) {
        let (remote, owner, name) = parse_id(id).unwrap();
        let mut repo = Repository::new(remote, owner, name);
        repo.score = score;
        repo.visit_time = visit_time;
        store.insert(&repo).unwrap();
    }

    /// github:acme/widget (50) > github:acme/gadget (40) > corp:group/sub/widget-api (30)
    /// > github:other/tool (20) > corp:group/billing (10)
    fn store() -> RepoStore {
        let store = RepoStore::in_memory();
        add(&store, "github:acme/widget", 50, 100);
        add(&store, "github:acme/gadget", 40, 500);
        add(&store, "corp:group/sub/widget-api", 30, 300);
        add(&store, "github:other/tool", 20, 400);
        add(&store, "corp:group/billing", 10, 200);
        add(&store, "local:me/notes", 5, 50);
        store
    }

    struct Fixture {
        config: Config,
        store: RepoStore,
        apis: ApiRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: config(),
                store: store(),
                apis: ApiRegistry::default(),
            }
        }

        fn resolve(
            &self,
            selector: &dyn Selector,
            cwd: &str,
            head: &str,
            query: &str,
            opts: &ResolveOptions,
        ) -> Result<Repository> {
            Resolver::new(&self.config, &self.store, selector, &self.apis, Path::new(cwd))
                .resolve(head, query, opts)
        }

        fn fuzzy(&self, cwd: &str, head: &str, query: &str) -> Result<Repository> {
            self.resolve(&ScriptedSelector::cancel(), cwd, head, query, &ResolveOptions::default())
        }
    }

    fn select_opts() -> ResolveOptions {
        ResolveOptions {
            mode: Mode::Select,
            ..ResolveOptions::default()
        }
    }

    #[test]
    fn test_fuzzy_top_score() {
        let fx = Fixture::new();
        assert_eq!(fx.fuzzy("/home/me", "", "").unwrap().id(), "github:acme/widget");
    }

    #[test]
    fn test_fuzzy_skips_current_repository() {
        let fx = Fixture::new();
        let repo = fx.fuzzy("/work/github/acme/widget", "", "").unwrap();
        assert_eq!(repo.id(), "github:acme/gadget");
    }

    #[test]
    fn test_fuzzy_stays_inside_repository() {
        let fx = Fixture::new();
        let repo = fx.fuzzy("/work/github/other/tool/src/bin", "", "").unwrap();
        assert_eq!(repo.id(), "github:other/tool");

        // a keyword means the user wants to go somewhere
        let repo = fx.fuzzy("/work/github/other/tool/src", "github", "").unwrap();
        assert_eq!(repo.id(), "github:acme/widget");
    }

    #[test]
    fn test_select_whole_store() {
        let fx = Fixture::new();
        let selector = ScriptedSelector::pick(2);
        let repo = fx.resolve(&selector, "/", "", "", &select_opts()).unwrap();
        assert_eq!(repo.id(), "corp:group/sub/widget-api");
        assert_eq!(selector.shown()[0], "github:acme/widget");
        assert_eq!(selector.shown().len(), 6);
    }

    #[test]
    fn test_latest() {
        let fx = Fixture::new();
        // most recent is gadget; standing in it jumps to the one before
        assert_eq!(fx.fuzzy("/", LATEST, "").unwrap().id(), "github:acme/gadget");
        assert_eq!(
            fx.fuzzy("/work/github/acme/gadget", LATEST, "").unwrap().id(),
            "github:other/tool"
        );

        let selector = ScriptedSelector::pick(0);
        fx.resolve(&selector, "/", LATEST, "", &select_opts()).unwrap();
        assert_eq!(
            selector.shown(),
            vec![
                "github:acme/gadget",
                "github:other/tool",
                "corp:group/sub/widget-api",
                "corp:group/billing",
                "github:acme/widget",
            ]
        );
    }

    #[test]
    fn test_remote_head() {
        let fx = Fixture::new();
        assert_eq!(fx.fuzzy("/", "corp", "").unwrap().id(), "corp:group/sub/widget-api");

        let selector = ScriptedSelector::pick(1);
        let repo = fx.resolve(&selector, "/", "corp", "", &select_opts()).unwrap();
        assert_eq!(repo.id(), "corp:group/billing");
        assert_eq!(selector.shown(), vec!["group/sub/widget-api", "group/billing"]);
    }

    #[test]
    fn test_keyword_head() {
        let fx = Fixture::new();
        assert_eq!(fx.fuzzy("/", "api", "").unwrap().id(), "corp:group/sub/widget-api");
        assert!(matches!(fx.fuzzy("/", "nothing", ""), Err(Error::NoCandidates(_))));
    }

    #[test]
    fn test_keyword_in_remote() {
        let fx = Fixture::new();
        assert_eq!(fx.fuzzy("/", "github", "get").unwrap().id(), "github:acme/widget");
        assert_eq!(fx.fuzzy("/", "corp", "widget").unwrap().id(), "corp:group/sub/widget-api");
    }

    #[test]
    fn test_url_head() {
        let fx = Fixture::new();
        let repo = fx.fuzzy("/", "https://github.com/acme/widget/tree/main", "").unwrap();
        assert_eq!(repo.id(), "github:acme/widget");
        assert!(!repo.new_created);

        let repo = fx
            .fuzzy("/", "https://gitlab.example.com/group/subgroup/project/-/tree/main", "")
            .unwrap();
        assert_eq!(repo.id(), "corp:group/subgroup/project");
        assert!(repo.new_created);

        let repo = fx.fuzzy("/", "git@github.com:acme/gadget.git", "").unwrap();
        assert_eq!(repo.id(), "github:acme/gadget");

        assert!(matches!(
            fx.fuzzy("/", "https://nowhere.dev/a/b", ""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_full_id_head() {
        let fx = Fixture::new();
        assert_eq!(fx.fuzzy("/", "github:other/tool", "").unwrap().id(), "github:other/tool");
        assert!(fx.fuzzy("/", "corp:group/fresh", "").unwrap().new_created);
        // unknown remote falls back to a keyword search
        assert!(matches!(fx.fuzzy("/", "svn:acme/widget", ""), Err(Error::NoCandidates(_))));
    }

    #[test]
    fn test_direct_id() {
        let fx = Fixture::new();
        let repo = fx.fuzzy("/", "corp", "group/sub/new-thing").unwrap();
        assert_eq!((repo.owner.as_str(), repo.name.as_str()), ("group/sub", "new-thing"));
        assert!(repo.new_created);

        let force = ResolveOptions {
            force_local: true,
            ..ResolveOptions::default()
        };
        let err = fx
            .resolve(&ScriptedSelector::cancel(), "/", "corp", "group/sub/new-thing", &force)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_remote_with_query() {
        let fx = Fixture::new();
        assert!(matches!(fx.fuzzy("/", "nope", "acme/widget"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_owner_listing_from_store() {
        let fx = Fixture::new();
        let selector = ScriptedSelector::pick(1);
        let repo = fx.resolve(&selector, "/", "github", "acme/", &ResolveOptions::default()).unwrap();
        assert_eq!(selector.shown(), vec!["widget", "gadget"]);
        assert_eq!(repo.id(), "github:acme/gadget");

        assert!(matches!(
            fx.fuzzy("/", "github", "ghost/"),
            Err(Error::NoCandidates(_))
        ));
    }

    #[test]
    fn test_owner_listing_from_api() {
        let mut fx = Fixture::new();
        fx.apis.register(
            "github",
            CountingApi::with_owner("acme", &["widget", "gadget", "sprocket"]),
        );
        let opts = ResolveOptions {
            from_api: true,
            filter_local: true,
            ..ResolveOptions::default()
        };
        let selector = ScriptedSelector::pick(0);
        let repo = fx.resolve(&selector, "/", "github", "acme/", &opts).unwrap();
        assert_eq!(selector.shown(), vec!["sprocket"]);
        assert_eq!(repo.id(), "github:acme/sprocket");
        assert!(repo.new_created);
    }

    #[test]
    fn test_cancel_propagates() {
        let fx = Fixture::new();
        let err = fx
            .resolve(&ScriptedSelector::cancel(), "/", "", "", &select_opts())
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let fx = Fixture::new();
        let first = fx.fuzzy("/", "github", "").unwrap();
        for _ in 0..5 {
            assert_eq!(fx.fuzzy("/", "github", "").unwrap(), first);
        }
    }

    fn many(fx: &Fixture, head: &str, query: &str) -> Vec<String> {
        let selector = ScriptedSelector::cancel();
        Resolver::new(&fx.config, &fx.store, &selector, &fx.apis, Path::new("/"))
            .resolve_many(head, query, ManyFilter::default())
            .unwrap()
            .iter()
            .map(Repository::id)
            .collect()
    }

    #[test]
    fn test_resolve_many() {
        let fx = Fixture::new();
        assert_eq!(many(&fx, "", "").len(), 6);
        assert_eq!(many(&fx, "corp", ""), vec!["corp:group/sub/widget-api", "corp:group/billing"]);
        assert_eq!(many(&fx, "widget", ""), vec!["github:acme/widget", "corp:group/sub/widget-api"]);
        assert_eq!(many(&fx, "github", "acme/"), vec!["github:acme/widget", "github:acme/gadget"]);
        assert_eq!(many(&fx, "github", "other/tool"), vec!["github:other/tool"]);
    }

    #[test]
    fn test_current_repository() {
        let fx = Fixture::new();
        let mut attached = Repository::new("local", "me", "scratch");
        attached.path = Some(PathBuf::from("/src/scratch"));
        fx.store.insert(&attached).unwrap();

        let selector = ScriptedSelector::cancel();
        let at = |cwd: &str| {
            Resolver::new(&fx.config, &fx.store, &selector, &fx.apis, Path::new(cwd))
                .current()
                .map(|repo| repo.id())
        };
        assert_eq!(at("/work/corp/group/sub/widget-api/src").unwrap(), "corp:group/sub/widget-api");
        assert_eq!(at("/src/scratch/docs").unwrap(), "local:me/scratch");
        assert!(at("/tmp").unwrap_err().is_not_found());
    }
}
