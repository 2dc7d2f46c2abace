//! Annotation source: git blame, parsed and cached
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ DocumentInfo │ ──► │ AnnotationSource │ ──► │  AnnotationMap  │
//! └──────────────┘     │                  │     └─────────────────┘
//!                      │  ├─ cache hit? ──┼──► AnnotationCache
//!                      │  └─ miss ────────┼──► GitRunner::blame ──► parse_porcelain
//!                      └──────────────────┘
//! ```
//!
//! Failures never leave this module: a missing annotation must not interfere
//! with editing, so every error is logged and surfaced as `None`.

mod cache;
mod porcelain;

pub use cache::{AnnotationCache, Clock, ManualClock, SystemClock, DEFAULT_TTL};
pub use porcelain::parse_porcelain;

use crate::error::Result;
use crate::git::GitRunner;
use crate::remote::parse_remote_url;
use crate::types::{AnnotationMap, CacheKey, DocumentInfo, RemoteInfo, Revision};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Resolves annotations and remote info for documents, caching both.
pub struct AnnotationSource {
    git: Arc<dyn GitRunner>,
    cache: Arc<AnnotationCache>,
    /// Per-repository remote info, negative results included
    remotes: Mutex<HashMap<PathBuf, Option<RemoteInfo>>>,
}

impl AnnotationSource {
    pub fn new(git: Arc<dyn GitRunner>, cache: Arc<AnnotationCache>) -> Self {
        Self {
            git,
            cache,
            remotes: Mutex::new(HashMap::new()),
        }
    }

    pub fn git(&self) -> &Arc<dyn GitRunner> {
        &self.git
    }

    fn remotes(&self) -> MutexGuard<'_, HashMap<PathBuf, Option<RemoteInfo>>> {
        self.remotes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Annotations for a resolved document, from cache or a fresh blame.
    pub async fn annotations(&self, info: &DocumentInfo) -> Option<Arc<AnnotationMap>> {
        if let Some(map) = self.cache.get(&info.cache_key) {
            tracing::trace!(key = %info.cache_key, "Annotation cache hit");
            return Some(map);
        }

        let output = match self.blame(info).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    repo = %info.repo_path.display(),
                    file = %info.file_path,
                    revision = %info.revision,
                    error = %e,
                    "git blame failed"
                );
                return None;
            }
        };

        let map = Arc::new(parse_porcelain(&output));
        tracing::debug!(
            key = %info.cache_key,
            lines = map.len(),
            "Parsed blame output"
        );
        self.cache.put(info.cache_key.clone(), map.clone());
        Some(map)
    }

    async fn blame(&self, info: &DocumentInfo) -> Result<String> {
        let (repo, file) = (info.repo_path.as_path(), info.file_path.as_str());
        match info.revision {
            Revision::Index => {
                // `:<path>` names the staged blob
                let staged = self.git.show_file(repo, "", file).await?;
                self.git.blame_contents(repo, file, &staged).await
            }
            _ => self.git.blame(repo, file, info.revision.as_arg()).await,
        }
    }

    /// Remote info for a repository, looked up at most once per repository.
    pub async fn remote_info(&self, repo_path: &Path) -> Option<RemoteInfo> {
        let memoised = self.remotes().get(repo_path).cloned();
        if let Some(cached) = memoised {
            return cached;
        }

        let info = match self.git.remote_url(repo_path).await {
            Ok(Some(url)) => {
                let parsed = parse_remote_url(&url);
                if parsed.is_none() {
                    tracing::debug!(url = %url, "Unrecognised remote URL");
                }
                parsed
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(repo = %repo_path.display(), error = %e, "Remote lookup failed");
                None
            }
        };

        self.remotes().insert(repo_path.to_path_buf(), info.clone());
        info
    }

    /// Remote info if it has already been looked up; never calls git.
    pub fn cached_remote_info(&self, repo_path: &Path) -> Option<RemoteInfo> {
        self.remotes().get(repo_path).cloned().flatten()
    }

    /// Whether a remote lookup (successful or not) is memoised for `repo_path`.
    pub fn has_remote_entry(&self, repo_path: &Path) -> bool {
        self.remotes().contains_key(repo_path)
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key);
    }

    /// Drop every cached annotation and remote lookup.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.remotes().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const OUTPUT: &str = "1111111111111111111111111111111111111111 1 1 1\n\
                          author Ada\n\
                          author-mail <ada@example.com>\n\
                          author-time 1600000000\n\
                          summary Initial\n\
                          \tfn main() {}\n";

    #[derive(Default)]
    struct CountingGit {
        blames: AtomicUsize,
        remotes: AtomicUsize,
        fail_blame: bool,
        remote: Option<String>,
        /// (revision argument, piped contents) per blame call
        calls: Mutex<Vec<(Option<String>, Option<String>)>>,
        shown: Mutex<Vec<String>>,
    }

    impl CountingGit {
        fn calls(&self) -> Vec<(Option<String>, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitRunner for CountingGit {
        async fn blame(&self, _: &Path, _: &str, revision: Option<&str>) -> Result<String> {
            self.blames.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((revision.map(str::to_string), None));
            if self.fail_blame {
                return Err(Error::Git {
                    command: "blame".into(),
                    message: "fatal: no such path".into(),
                });
            }
            Ok(OUTPUT.to_string())
        }

        async fn blame_contents(&self, _: &Path, _: &str, contents: &str) -> Result<String> {
            self.blames.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((None, Some(contents.to_string())));
            Ok(OUTPUT.to_string())
        }

        async fn remote_url(&self, _: &Path) -> Result<Option<String>> {
            self.remotes.fetch_add(1, Ordering::SeqCst);
            Ok(self.remote.clone())
        }

        async fn parent_revision(&self, _: &Path, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn show_file(&self, _: &Path, revision: &str, path: &str) -> Result<String> {
            let object = format!("{}:{}", revision, path);
            self.shown.lock().unwrap().push(object.clone());
            Ok(format!("staged {}\n", object))
        }

        async fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
            Ok(dir.to_path_buf())
        }
    }

    fn source(git: Arc<CountingGit>) -> (Arc<ManualClock>, AnnotationSource) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = Arc::new(AnnotationCache::new(clock.clone(), DEFAULT_TTL));
        (clock, AnnotationSource::new(git, cache))
    }

    fn info() -> DocumentInfo {
        DocumentInfo::new(PathBuf::from("/repo"), "src/main.rs".into(), Revision::WorkingTree)
    }

    #[tokio::test]
    async fn test_annotations_are_cached_until_ttl() {
        let git = Arc::new(CountingGit::default());
        let (clock, source) = source(git.clone());

        let map = source.annotations(&info()).await.unwrap();
        assert_eq!(map.get(1).unwrap().author, "Ada");
        source.annotations(&info()).await.unwrap();
        assert_eq!(git.blames.load(Ordering::SeqCst), 1);

        clock.advance(DEFAULT_TTL + Duration::from_millis(1));
        source.annotations(&info()).await.unwrap();
        assert_eq!(git.blames.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let git = Arc::new(CountingGit::default());
        let (_clock, source) = source(git.clone());

        source.annotations(&info()).await.unwrap();
        source.invalidate(&info().cache_key);
        source.annotations(&info()).await.unwrap();
        assert_eq!(git.blames.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blame_failure_is_none() {
        let git = Arc::new(CountingGit {
            fail_blame: true,
            ..Default::default()
        });
        let (_clock, source) = source(git.clone());

        assert!(source.annotations(&info()).await.is_none());
        // Failures are not cached.
        assert!(source.annotations(&info()).await.is_none());
        assert_eq!(git.blames.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_revision_selects_blame_input() {
        let git = Arc::new(CountingGit::default());
        let (_clock, source) = source(git.clone());
        let repo = PathBuf::from("/repo");
        let at = |revision| DocumentInfo::new(repo.clone(), "src/main.rs".into(), revision);

        source.annotations(&at(Revision::WorkingTree)).await.unwrap();
        source
            .annotations(&at(Revision::Commit("HEAD~1".into())))
            .await
            .unwrap();
        source.annotations(&at(Revision::Index)).await.unwrap();

        assert_eq!(
            git.calls(),
            vec![
                (None, None),
                (Some("HEAD~1".to_string()), None),
                (None, Some("staged :src/main.rs\n".to_string())),
            ]
        );
        assert_eq!(*git.shown.lock().unwrap(), vec![":src/main.rs".to_string()]);
    }

    #[tokio::test]
    async fn test_remote_info_memoised_including_negative() {
        let git = Arc::new(CountingGit::default());
        let (_clock, source) = source(git.clone());
        let repo = Path::new("/repo");

        assert!(source.remote_info(repo).await.is_none());
        assert!(source.remote_info(repo).await.is_none());
        assert_eq!(git.remotes.load(Ordering::SeqCst), 1);
        assert!(source.has_remote_entry(repo));
    }

    #[tokio::test]
    async fn test_remote_info_parsed_and_peekable() {
        let git = Arc::new(CountingGit {
            remote: Some("git@github.com:acme/widgets.git".into()),
            ..Default::default()
        });
        let (_clock, source) = source(git.clone());
        let repo = Path::new("/repo");

        assert!(source.cached_remote_info(repo).is_none());
        let info = source.remote_info(repo).await.unwrap();
        assert_eq!(info.repo, "widgets");
        assert_eq!(source.cached_remote_info(repo), Some(info));

        source.invalidate_all();
        assert!(!source.has_remote_entry(repo));
    }
}
