//! Inline decorations and hover content
//!
//! Rendering is synchronous: the hover provider answers from annotations the
//! controller has already fetched, through the [`AnnotationLookup`] and
//! [`RemoteInfoLookup`] capabilities, and never invokes git itself.

use crate::document::Document;
use crate::format::{format_local_timestamp, format_relative_time, truncate};
use crate::types::{AnnotationMap, AnnotationRecord, RemoteInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Command id hosts should bind to [`DiffCommand`] execution.
pub const SHOW_DIFF_COMMAND: &str = "blameline.showDiff";

/// Trailing text shown after one line of an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Zero-based line
    pub line: u32,
    pub text: String,
}

/// Render one decoration per distinct cursor line that has an annotation.
///
/// `cursor_lines` are zero-based editor lines; annotations are 1-based.
pub fn render_decorations(
    map: &AnnotationMap,
    cursor_lines: &[u32],
    now: i64,
    summary_max_chars: usize,
) -> Vec<Decoration> {
    let lines: BTreeSet<u32> = cursor_lines.iter().copied().collect();
    lines
        .into_iter()
        .filter_map(|line| {
            let record = map.get(line + 1)?;
            Some(Decoration {
                line,
                text: decoration_text(record, now, summary_max_chars),
            })
        })
        .collect()
}

fn decoration_text(record: &AnnotationRecord, now: i64, summary_max_chars: usize) -> String {
    let relative = format_relative_time(record.author_time, now);
    if record.is_uncommitted() {
        return format!("You, {} • Uncommitted changes", relative);
    }
    format!(
        "{}, {} • {}",
        record.author,
        relative,
        truncate(&record.summary, summary_max_chars)
    )
}

/// Synchronous access to annotations already fetched for a document.
pub trait AnnotationLookup: Send + Sync {
    /// Annotation for a 1-based line of `document`, if cached.
    fn annotation(&self, document: &Document, line_number: u32) -> Option<AnnotationRecord>;

    /// Repository root and relative path the document resolves to.
    fn location(&self, document: &Document) -> Option<(PathBuf, String)>;
}

/// Synchronous access to remote info already looked up for a document's repository.
pub trait RemoteInfoLookup: Send + Sync {
    fn remote_info(&self, document: &Document) -> Option<RemoteInfo>;
}

/// Arguments of the "show diff for this revision" action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCommand {
    pub revision: String,
    pub repo: PathBuf,
    /// Path relative to `repo`
    pub path: String,
}

impl DiffCommand {
    /// `command:` link a markdown host can render as a clickable action.
    pub fn to_link(&self) -> crate::error::Result<String> {
        let args = serde_json::to_string(&[self])?;
        Ok(format!(
            "command:{}?{}",
            SHOW_DIFF_COMMAND,
            urlencoding::encode(&args)
        ))
    }
}

/// Hover page for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverContent {
    pub markdown: String,
    pub record: AnnotationRecord,
    /// Present when the line is committed and its document's repository is known
    pub diff: Option<DiffCommand>,
}

/// Builds hover pages from cached annotations.
#[derive(Clone)]
pub struct HoverProvider {
    annotations: Arc<dyn AnnotationLookup>,
    remotes: Arc<dyn RemoteInfoLookup>,
}

impl HoverProvider {
    pub fn new(annotations: Arc<dyn AnnotationLookup>, remotes: Arc<dyn RemoteInfoLookup>) -> Self {
        Self {
            annotations,
            remotes,
        }
    }

    /// Hover for a zero-based `line` of `document`, `None` when nothing is cached.
    pub fn provide(&self, document: &Document, line: u32) -> Option<HoverContent> {
        let record = self.annotations.annotation(document, line + 1)?;
        let remote = self.remotes.remote_info(document);
        let diff = if record.is_uncommitted() {
            None
        } else {
            self.annotations
                .location(document)
                .map(|(repo, path)| DiffCommand {
                    revision: record.revision.clone(),
                    repo,
                    path,
                })
        };

        Some(HoverContent {
            markdown: hover_markdown(&record, remote.as_ref(), diff.as_ref()),
            record,
            diff,
        })
    }
}

/// Markdown body of a hover. Links are only emitted when the remote host supports them.
pub fn hover_markdown(
    record: &AnnotationRecord,
    remote: Option<&RemoteInfo>,
    diff: Option<&DiffCommand>,
) -> String {
    let mut md = String::from("### Git Blame\n\n");

    let commit_url = remote.and_then(|r| r.commit_url(&record.revision));
    match &commit_url {
        Some(url) => md.push_str(&format!(
            "**Commit:** [`{}`]({})\n\n",
            record.short_revision(),
            url
        )),
        None => md.push_str(&format!("**Commit:** `{}`\n\n", record.short_revision())),
    }

    let author = escape_markdown(&record.author);
    match remote.and_then(|r| r.author_url(&record.author, &record.author_email)) {
        Some(url) => md.push_str(&format!("**Author:** [{}]({})\n\n", author, url)),
        None => md.push_str(&format!("**Author:** {}\n\n", author)),
    }

    md.push_str(&format!("**Email:** {}\n\n", escape_markdown(&record.author_email)));
    md.push_str(&format!(
        "**Date:** {}\n\n",
        format_local_timestamp(record.author_time)
    ));

    let summary = escape_markdown(&record.summary);
    match &commit_url {
        Some(url) => md.push_str(&format!("**Summary:**\n\n> [{}]({})\n\n", summary, url)),
        None => md.push_str(&format!("**Summary:**\n\n> {}\n\n", summary)),
    }

    if let Some(link) = diff.and_then(|d| d.to_link().ok()) {
        md.push_str(&format!("[Show diff]({})\n", link));
    }

    md
}

/// Escape characters that would otherwise be read as markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '|'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
