//! "Show diff for this revision"
//!
//! A comparison pairs the file at the revision's first parent with the file
//! at the revision. Root commits have no parent, so the left side is the
//! empty tree and is marked as non-existent.

use crate::document::RevisionDocument;
use crate::error::Result;
use crate::git::GitRunner;
use crate::render::DiffCommand;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Object id of git's empty tree.
pub const EMPTY_TREE_REVISION: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Two revision documents to show side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub left: RevisionDocument,
    pub right: RevisionDocument,
    pub title: String,
}

/// Host surface that opens side-by-side comparisons.
#[async_trait]
pub trait DiffViewer: Send + Sync {
    async fn open_comparison(&self, comparison: Comparison) -> Result<()>;
}

/// Resolve the comparison for `command`, falling back to the empty tree for root commits.
pub async fn resolve_comparison(git: &dyn GitRunner, command: &DiffCommand) -> Result<Comparison> {
    let parent = git
        .parent_revision(&command.repo, &command.revision)
        .await?;

    let (parent_revision, parent_exists) = match parent {
        Some(parent) => (parent, true),
        None => {
            tracing::debug!(
                revision = %command.revision,
                "Revision has no parent, comparing against the empty tree"
            );
            (EMPTY_TREE_REVISION.to_string(), false)
        }
    };

    let name = command.path.rsplit('/').next().unwrap_or(&command.path);
    let title = format!(
        "{} ({}) ↔ ({})",
        name,
        short(&parent_revision),
        short(&command.revision)
    );

    Ok(Comparison {
        left: RevisionDocument::new(
            command.repo.clone(),
            command.path.clone(),
            parent_revision,
            parent_exists,
        ),
        right: RevisionDocument::new(
            command.repo.clone(),
            command.path.clone(),
            command.revision.clone(),
            true,
        ),
        title,
    })
}

fn short(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}

/// Serves file contents for revision documents, memoised per document URI.
pub struct RevisionContentProvider {
    git: Arc<dyn GitRunner>,
    contents: Mutex<HashMap<String, String>>,
}

impl RevisionContentProvider {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self {
            git,
            contents: Mutex::new(HashMap::new()),
        }
    }

    /// File contents at the document's revision; empty for missing files or git failures.
    pub async fn content(&self, document: &RevisionDocument) -> String {
        if !document.exists {
            return String::new();
        }
        let key = match document.to_uri() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode revision document");
                return String::new();
            }
        };

        let cached = self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(content) = cached {
            return content;
        }

        match self
            .git
            .show_file(&document.repo, &document.revision, &document.path)
            .await
        {
            Ok(content) => {
                self.contents
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, content.clone());
                content
            }
            Err(e) => {
                tracing::warn!(
                    revision = %document.revision,
                    path = %document.path,
                    error = %e,
                    "Failed to read file at revision"
                );
                String::new()
            }
        }
    }

    pub fn clear(&self) {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
