//! Remote URL parsing and web link generation
//!
//! Two remote shapes are recognised:
//!
//! | Form | Example |
//! |------|---------|
//! | scheme | `https://github.com/acme/widgets.git`, `ssh://git@host:22/acme/widgets` |
//! | scp-like | `git@gitlab.example.com:acme/widgets.git` |
//!
//! Anything else yields `None`, which callers treat the same as a repository
//! without a remote.

use crate::types::{HostKind, RemoteInfo};

const SCHEMES: &[&str] = &["https", "http", "ssh", "git", "git+ssh", "ssh+git"];

/// Parse a remote URL into its web location.
pub fn parse_remote_url(url: &str) -> Option<RemoteInfo> {
    let url = url.trim();
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return None;
    }

    let (host, path, keep_port) = match url.split_once("://") {
        Some((scheme, rest)) => {
            if !SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                return None;
            }
            let (authority, path) = rest.split_once('/')?;
            let authority = authority.rsplit('@').next().unwrap_or(authority);
            let is_http = scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http");
            (authority, path, is_http)
        }
        None => {
            let (user_host, path) = url.split_once(':')?;
            let (_, host) = user_host.split_once('@')?;
            (host, path, false)
        }
    };

    let host = if keep_port {
        host
    } else {
        host.split(':').next().unwrap_or(host)
    };
    if host.is_empty() {
        return None;
    }

    let (owner, repo) = split_owner_repo(path)?;
    let hostname = host.split(':').next().unwrap_or(host);

    Some(RemoteInfo {
        base_url: format!("https://{}", host),
        owner: owner.to_string(),
        repo: repo.to_string(),
        host: HostKind::detect(hostname),
    })
}

/// Splits `owner[/group...]/repo[.git][/]` into owner path and repository name.
fn split_owner_repo(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.rsplit_once('/')?;
    let owner = owner.trim_start_matches('/');
    if owner.is_empty() || repo.is_empty() || owner.split('/').any(str::is_empty) {
        return None;
    }
    Some((owner, repo))
}

impl RemoteInfo {
    /// Web URL of the repository itself.
    pub fn repo_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, self.owner, self.repo)
    }

    /// Web URL of a single commit, when the host's layout is known.
    pub fn commit_url(&self, revision: &str) -> Option<String> {
        let repo = self.repo_url();
        match self.host {
            HostKind::GitHub | HostKind::Gitea | HostKind::AzureDevOps => {
                Some(format!("{}/commit/{}", repo, revision))
            }
            HostKind::GitLab => Some(format!("{}/-/commit/{}", repo, revision)),
            HostKind::Bitbucket => Some(format!("{}/commits/{}", repo, revision)),
            HostKind::Unknown => None,
        }
    }

    /// Web URL listing the repository's commits by one author.
    pub fn author_url(&self, author: &str, email: &str) -> Option<String> {
        let repo = self.repo_url();
        match self.host {
            HostKind::GitHub => Some(format!(
                "{}/commits?author={}",
                repo,
                urlencoding::encode(email)
            )),
            HostKind::GitLab => Some(format!(
                "{}/-/commits?author={}",
                repo,
                urlencoding::encode(author)
            )),
            HostKind::Gitea => Some(format!(
                "{}/commits/branch/HEAD/search?q={}&author=true",
                repo,
                urlencoding::encode(author)
            )),
            HostKind::Bitbucket | HostKind::AzureDevOps | HostKind::Unknown => None,
        }
    }
}
