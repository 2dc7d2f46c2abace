//! Core domain types for blameline
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Annotation** | The commit that last touched one line, as reported by `git blame` |
//! | **Revision** | Which content of a file is being blamed: working tree, index, or a commit |
//! | **Cache key** | Composite identity of (repository root, relative path, revision) |
//! | **Remote** | The `origin` remote of a repository, decomposed for link generation |
//!
//! Line numbers stored in annotations are 1-based, matching git. Editor-facing
//! positions (cursor lines, decorations, hover positions) are 0-based.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Revision id git reports for lines that are not committed yet.
pub const UNCOMMITTED_REVISION: &str = "0000000000000000000000000000000000000000";

// ============================================
// Annotations
// ============================================

/// The commit that last modified a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Full 40-hex revision id
    pub revision: String,
    pub author: String,
    /// Email with surrounding angle brackets removed
    pub author_email: String,
    /// Author time as seconds since the epoch
    pub author_time: i64,
    /// First line of the commit message
    pub summary: String,
    /// 1-based line number in the blamed content
    pub line_number: u32,
}

impl AnnotationRecord {
    /// Abbreviated revision id used in hover output.
    pub fn short_revision(&self) -> &str {
        let end = self
            .revision
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.revision.len());
        &self.revision[..end]
    }

    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.author_time, 0).single()
    }

    /// Whether this line only exists in the working tree.
    pub fn is_uncommitted(&self) -> bool {
        self.revision == UNCOMMITTED_REVISION
    }
}

/// Annotations for every attributed line of one file revision, keyed by 1-based line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationMap {
    lines: HashMap<u32, AnnotationRecord>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record at its own line number, replacing any previous one.
    pub fn insert(&mut self, record: AnnotationRecord) {
        self.lines.insert(record.line_number, record);
    }

    pub fn get(&self, line_number: u32) -> Option<&AnnotationRecord> {
        self.lines.get(&line_number)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Records ordered by line number.
    pub fn sorted(&self) -> Vec<&AnnotationRecord> {
        let mut records: Vec<_> = self.lines.values().collect();
        records.sort_by_key(|r| r.line_number);
        records
    }
}

// ============================================
// Revisions and cache identity
// ============================================

/// Which content of a file is being blamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    /// Current file on disk
    WorkingTree,
    /// Staged content shown by a read-only VCS document
    Index,
    /// A concrete revision (hash or ref name)
    Commit(String),
}

impl Revision {
    /// Discriminator used inside cache keys.
    pub fn as_key_part(&self) -> &str {
        match self {
            Revision::WorkingTree => "working-tree",
            Revision::Index => "index",
            Revision::Commit(id) => id,
        }
    }

    /// Revision argument passed to `git blame`, if any.
    ///
    /// The index has no revision name; it is blamed by feeding the staged
    /// blob to `git blame --contents -`.
    pub fn as_arg(&self) -> Option<&str> {
        match self {
            Revision::WorkingTree | Revision::Index => None,
            Revision::Commit(id) => Some(id),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key_part())
    }
}

/// Composite identity of "this file's content at this revision, within this repository".
///
/// Format: `{repo_root}::{relative_path}::{revision}`. Relative paths always
/// use `/` separators so the same file reached through different documents
/// produces the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(repo_path: &Path, file_path: &str, revision: &Revision) -> Self {
        Self(format!(
            "{}::{}::{}",
            repo_path.display(),
            file_path,
            revision.as_key_part()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document resolved to the shape the annotation pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub cache_key: CacheKey,
    /// Absolute repository root
    pub repo_path: PathBuf,
    /// Path relative to `repo_path`, `/`-separated
    pub file_path: String,
    pub revision: Revision,
}

impl DocumentInfo {
    pub fn new(repo_path: PathBuf, file_path: String, revision: Revision) -> Self {
        Self {
            cache_key: CacheKey::new(&repo_path, &file_path, &revision),
            repo_path,
            file_path,
            revision,
        }
    }
}

// ============================================
// Remotes
// ============================================

/// Hosting service a remote points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostKind {
    GitHub,
    GitLab,
    Gitea,
    Bitbucket,
    AzureDevOps,
    Unknown,
}

impl HostKind {
    /// Classify a host name by case-insensitive substring match.
    pub fn detect(host: &str) -> Self {
        let host = host.to_lowercase();
        if host.contains("github") {
            HostKind::GitHub
        } else if host.contains("gitlab") {
            HostKind::GitLab
        } else if host.contains("gitea") {
            HostKind::Gitea
        } else if host.contains("bitbucket") {
            HostKind::Bitbucket
        } else if host.contains("dev.azure") || host.contains("visualstudio.com") {
            HostKind::AzureDevOps
        } else {
            HostKind::Unknown
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HostKind::GitHub => "GitHub",
            HostKind::GitLab => "GitLab",
            HostKind::Gitea => "Gitea",
            HostKind::Bitbucket => "Bitbucket",
            HostKind::AzureDevOps => "Azure DevOps",
            HostKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Web location of a repository's `origin` remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    /// `https://{host}`
    pub base_url: String,
    /// Owner or group path, may contain `/` for nested groups
    pub owner: String,
    pub repo: String,
    pub host: HostKind,
}
