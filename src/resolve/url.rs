//! Map web URLs and SSH clone addresses to `(remote, owner, name)`

use url::Url;

use crate::config::{Config, Provider};
use crate::error::{Error, Result};
use crate::store::split_owner;

/// GitLab puts `-` between the project path and branch/file paths
const GITLAB_PATH_END: &str = "-";

/// `git@host:owner/name.git`
pub fn is_ssh(input: &str) -> bool {
    input.starts_with("git@") && input.contains(':')
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("https://") || input.starts_with("http://")
}

/// Rewrite `git@host:owner/name.git` to `https://host/owner/name`
pub fn ssh_to_https(input: &str) -> Option<String> {
    let rest = input.strip_prefix("git@")?;
    let (host, path) = rest.split_once(':')?;
    let path = path.strip_suffix(".git").unwrap_or(path);
    Some(format!("https://{}/{}", host, path))
}

/// Find the configured remote cloning from the URL's host and split the path
pub fn parse_repo_url(input: &str, config: &Config) -> Result<(String, String, String)> {
    let invalid = |reason: &str| Error::InvalidInput(format!("invalid url {:?}: {}", input, reason));

    let text = if is_ssh(input) {
        ssh_to_https(input).ok_or_else(|| invalid("bad ssh address"))?
    } else {
        input.to_string()
    };
    let url = Url::parse(&text).map_err(|e| invalid(&e.to_string()))?;
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

    let remote = config
        .remotes
        .values()
        .find(|remote| remote.clone.as_deref() == Some(host))
        .ok_or_else(|| invalid(&format!("no remote clones from {}", host)))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let parts: Vec<&str> = match remote.provider() {
        Provider::GitHub => segments.into_iter().take(2).collect(),
        Provider::GitLab => segments
            .into_iter()
            .take_while(|s| *s != GITLAB_PATH_END)
            .collect(),
    };
    if parts.len() < 2 {
        return Err(invalid("missing owner or name"));
    }

    let path = parts.join("/");
    let (owner, name) = split_owner(&path).ok_or_else(|| invalid("missing owner or name"))?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return Err(invalid("missing name"));
    }

    Ok((remote.name.clone(), owner.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::config;

    fn parse(input: &str) -> Result<(String, String, String)> {
        parse_repo_url(input, &config())
    }

    fn triple(remote: &str, owner: &str, name: &str) -> (String, String, String) {
        (remote.to_string(), owner.to_string(), name.to_string())
    }

    #[test]
    fn test_github_url() {
        assert_eq!(
            parse("https://github.com/acme/widget/tree/main").unwrap(),
            triple("github", "acme", "widget")
        );
        assert_eq!(
            parse("https://github.com/acme/widget.git").unwrap(),
            triple("github", "acme", "widget")
        );
    }

    #[test]
    fn test_gitlab_nested_url() {
        assert_eq!(
            parse("https://gitlab.example.com/group/subgroup/project/-/tree/main").unwrap(),
            triple("corp", "group/subgroup", "project")
        );
        assert_eq!(
            parse("https://gitlab.example.com/group/project").unwrap(),
            triple("corp", "group", "project")
        );
    }

    #[test]
    fn test_ssh() {
        assert_eq!(
            ssh_to_https("git@github.com:acme/widget.git").as_deref(),
            Some("https://github.com/acme/widget")
        );
        assert_eq!(
            parse("git@gitlab.example.com:group/sub/project.git").unwrap(),
            triple("corp", "group/sub", "project")
        );
    }

    #[test]
    fn test_only_one_git_suffix_is_stripped() {
        assert_eq!(
            parse("https://github.com/acme/widget.git.git").unwrap(),
            triple("github", "acme", "widget.git")
        );
        assert_eq!(
            ssh_to_https("git@github.com:acme/widget.git.git").as_deref(),
            Some("https://github.com/acme/widget.git")
        );
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(parse("https://github.com/acme"), Err(Error::InvalidInput(_))));
        assert!(matches!(
            parse("https://unknown.example.org/acme/widget"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            parse("https://gitlab.example.com/group/-/tree/main"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_detection() {
        assert!(is_ssh("git@github.com:acme/widget.git"));
        assert!(!is_ssh("acme/widget"));
        assert!(is_url("http://github.com/acme/widget"));
        assert!(!is_url("github"));
    }
}
