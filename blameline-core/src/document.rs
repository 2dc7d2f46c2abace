//! Documents an editor can show and how they map onto blame requests
//!
//! | Kind | Resolves to |
//! |------|-------------|
//! | [`Document::File`] | workspace root containing it, working tree |
//! | [`Document::Revision`] | its own repository, path and revision |
//! | [`Document::Vcs`] | workspace root of the path in its query, ref from the query |
//! | [`Document::Untitled`] | nothing |
//!
//! Documents that do not resolve are inert: no blame is attempted and no
//! decoration changes.

use crate::error::{Error, Result};
use crate::types::{DocumentInfo, Revision};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// URI scheme of synthetic revision documents.
pub const REVISION_SCHEME: &str = "blameline-rev";

/// An open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Ordinary file on disk
    File { path: PathBuf },
    /// Historical revision of a file, opened by blameline itself
    Revision(RevisionDocument),
    /// Read-only document served by the host's version control integration
    Vcs {
        /// Path the host reports for the document
        path: PathBuf,
        /// JSON query of the form `{"path": "...", "ref": "..."}`
        query: String,
    },
    /// Unsaved buffer
    Untitled { name: String },
}

impl Document {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Document::File { path: path.into() }
    }

    /// Whether this is a version-control comparison side.
    pub fn is_vcs(&self) -> bool {
        matches!(self, Document::Vcs { .. })
    }

    pub fn is_revision(&self) -> bool {
        matches!(self, Document::Revision(_))
    }
}

/// A file at a specific revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionDocument {
    /// Absolute repository root
    pub repo: PathBuf,
    /// Path relative to `repo`
    pub path: String,
    pub revision: String,
    /// False when the file has no content at `revision` (e.g. the empty tree side of a diff)
    pub exists: bool,
}

impl RevisionDocument {
    pub fn new(
        repo: impl Into<PathBuf>,
        path: impl Into<String>,
        revision: impl Into<String>,
        exists: bool,
    ) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
            revision: revision.into(),
            exists,
        }
    }

    /// Encode as `blameline-rev:{file name}?{percent-encoded JSON}`.
    ///
    /// The file name keeps the extension visible to hosts that pick a
    /// language from the URI.
    pub fn to_uri(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        Ok(format!(
            "{}:{}?{}",
            REVISION_SCHEME,
            urlencoding::encode(name),
            urlencoding::encode(&json)
        ))
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(REVISION_SCHEME)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| Error::Document(format!("not a revision document: {}", uri)))?;
        let (_, query) = rest
            .split_once('?')
            .ok_or_else(|| Error::Document(format!("revision document has no query: {}", uri)))?;
        let json = urlencoding::decode(query)
            .map_err(|e| Error::Document(format!("invalid query encoding: {}", e)))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Query carried by a VCS read-only document.
#[derive(Debug, Default, Deserialize)]
struct VcsQuery {
    path: Option<PathBuf>,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Workspace roots the host has open; each is treated as a repository root.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    roots: Vec<PathBuf>,
}

impl Workspace {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Innermost root containing `path`.
    pub fn root_for(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Resolve a document to the shape the annotation pipeline consumes.
    pub fn resolve(&self, document: &Document) -> Option<DocumentInfo> {
        match document {
            Document::File { path } => {
                let (repo, file) = self.split(path)?;
                Some(DocumentInfo::new(repo, file, Revision::WorkingTree))
            }
            Document::Revision(doc) => {
                if !doc.exists {
                    return None;
                }
                Some(DocumentInfo::new(
                    doc.repo.clone(),
                    doc.path.clone(),
                    Revision::Commit(doc.revision.clone()),
                ))
            }
            Document::Vcs { path, query } => {
                let query: VcsQuery = serde_json::from_str(query).unwrap_or_default();
                let fs_path = query.path.unwrap_or_else(|| path.clone());
                let (repo, file) = self.split(&fs_path)?;
                let revision = match query.reference.as_deref() {
                    None | Some("") => Revision::Index,
                    Some("~") => Revision::Commit("HEAD".to_string()),
                    Some(reference) => Revision::Commit(reference.to_string()),
                };
                Some(DocumentInfo::new(repo, file, revision))
            }
            Document::Untitled { .. } => None,
        }
    }

    fn split(&self, path: &Path) -> Option<(PathBuf, String)> {
        let root = self.root_for(path)?;
        let relative = relative_path(root, path)?;
        Some((root.to_path_buf(), relative))
    }
}

/// `path` relative to `root`, `/`-separated. `None` for the root itself.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::new([PathBuf::from("/work/app"), PathBuf::from("/work/app/vendor/lib")])
    }

    #[test]
    fn test_file_resolves_to_working_tree() {
        let info = workspace()
            .resolve(&Document::file("/work/app/src/main.rs"))
            .unwrap();
        assert_eq!(info.repo_path, PathBuf::from("/work/app"));
        assert_eq!(info.file_path, "src/main.rs");
        assert_eq!(info.revision, Revision::WorkingTree);
        assert_eq!(info.cache_key.as_str(), "/work/app::src/main.rs::working-tree");
    }

    #[test]
    fn test_innermost_root_wins() {
        let info = workspace()
            .resolve(&Document::file("/work/app/vendor/lib/mod.rs"))
            .unwrap();
        assert_eq!(info.repo_path, PathBuf::from("/work/app/vendor/lib"));
        assert_eq!(info.file_path, "mod.rs");
    }

    #[test]
    fn test_outside_workspace_is_inert() {
        assert!(workspace().resolve(&Document::file("/tmp/scratch.rs")).is_none());
        assert!(workspace().resolve(&Document::file("/work/application/x.rs")).is_none());
        assert!(workspace().resolve(&Document::file("/work/app")).is_none());
        assert!(workspace()
            .resolve(&Document::Untitled { name: "Untitled-1".into() })
            .is_none());
    }

    #[test]
    fn test_revision_document() {
        let rev = "a".repeat(40);
        let doc = Document::Revision(RevisionDocument::new("/work/app", "src/main.rs", &rev, true));
        let info = workspace().resolve(&doc).unwrap();
        assert_eq!(info.revision, Revision::Commit(rev.clone()));
        assert_eq!(info.cache_key.as_str(), format!("/work/app::src/main.rs::{rev}"));

        let missing = Document::Revision(RevisionDocument::new("/work/app", "src/main.rs", &rev, false));
        assert!(workspace().resolve(&missing).is_none());
    }

    #[test]
    fn test_revision_document_resolves_without_workspace() {
        let doc = Document::Revision(RevisionDocument::new("/elsewhere", "a.rs", "HEAD", true));
        assert!(Workspace::default().resolve(&doc).is_some());
    }

    #[test]
    fn test_vcs_document_refs() {
        let vcs = |query: &str| Document::Vcs {
            path: PathBuf::from("/work/app/src/main.rs"),
            query: query.to_string(),
        };
        let ws = workspace();

        let head = ws.resolve(&vcs(r#"{"path":"/work/app/src/main.rs","ref":"~"}"#)).unwrap();
        assert_eq!(head.revision, Revision::Commit("HEAD".into()));

        let index = ws.resolve(&vcs(r#"{"path":"/work/app/src/main.rs","ref":""}"#)).unwrap();
        assert_eq!(index.revision, Revision::Index);

        let commit = ws.resolve(&vcs(r#"{"path":"/work/app/src/lib.rs","ref":"abc123"}"#)).unwrap();
        assert_eq!(commit.file_path, "src/lib.rs");
        assert_eq!(commit.revision, Revision::Commit("abc123".into()));

        // Malformed query falls back to the document path.
        let fallback = ws.resolve(&vcs("not json")).unwrap();
        assert_eq!(fallback.file_path, "src/main.rs");
        assert_eq!(fallback.revision, Revision::Index);
    }

    #[test]
    fn test_same_content_same_key_across_surfaces() {
        let rev = "b".repeat(40);
        let ws = workspace();
        let from_revision_doc = ws
            .resolve(&Document::Revision(RevisionDocument::new("/work/app", "src/main.rs", &rev, true)))
            .unwrap();
        let from_vcs_doc = ws
            .resolve(&Document::Vcs {
                path: PathBuf::from("/work/app/src/main.rs"),
                query: format!(r#"{{"path":"/work/app/src/main.rs","ref":"{rev}"}}"#),
            })
            .unwrap();
        assert_eq!(from_revision_doc.cache_key, from_vcs_doc.cache_key);
    }

    #[test]
    fn test_revision_uri_round_trip() {
        let doc = RevisionDocument::new("/work/app", "src/a b.rs", "HEAD~1", true);
        let uri = doc.to_uri().unwrap();
        assert!(uri.starts_with("blameline-rev:a%20b.rs?"));
        assert_eq!(RevisionDocument::from_uri(&uri).unwrap(), doc);
    }

    #[test]
    fn test_revision_uri_rejects_other_schemes() {
        assert!(matches!(
            RevisionDocument::from_uri("file:///work/app/a.rs"),
            Err(Error::Document(_))
        ));
        assert!(matches!(
            RevisionDocument::from_uri("blameline-rev:a.rs"),
            Err(Error::Document(_))
        ));
    }
}
