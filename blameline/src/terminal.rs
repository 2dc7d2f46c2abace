//! Terminal implementations of the editor host surfaces.

use anyhow::{Context, Result};
use async_trait::async_trait;
use blameline_core::blame::{AnnotationCache, AnnotationSource, SystemClock};
use blameline_core::controller::{
    BlameController, Collaborators, ControllerOptions, DecorationSink, EditorHost, EditorId,
    EditorView, Notifier,
};
use blameline_core::diff::{Comparison, DiffViewer, RevisionContentProvider};
use blameline_core::document::{Document, RevisionDocument, Workspace};
use blameline_core::git::{GitCli, GitRunner};
use blameline_core::render::Decoration;
use blameline_core::settings::TomlSettingsStore;
use blameline_core::{Config, DocumentInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The single editor the CLI drives.
pub const EDITOR: EditorId = EditorId(1);

/// A file (optionally at a revision) resolved against its repository.
pub struct Target {
    pub repo: PathBuf,
    pub document: Document,
    pub workspace: Workspace,
    pub info: DocumentInfo,
}

impl Target {
    pub async fn open(git: &GitCli, file: &Path, revision: Option<&str>) -> Result<Self> {
        let absolute = if file.is_absolute() {
            file.to_path_buf()
        } else {
            std::env::current_dir()
                .context("failed to read current directory")?
                .join(file)
        };
        let name = absolute
            .file_name()
            .with_context(|| format!("{} is not a file", file.display()))?;
        let dir = absolute
            .parent()
            .context("file has no parent directory")?
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", file.display()))?;
        let path = dir.join(name);

        let repo = git
            .toplevel(&dir)
            .await
            .with_context(|| format!("{} is not inside a git repository", dir.display()))?
            .canonicalize()
            .context("failed to resolve repository root")?;
        let workspace = Workspace::new([repo.clone()]);

        let document = match revision {
            Some(revision) => {
                let relative = workspace
                    .resolve(&Document::file(&path))
                    .map(|info| info.file_path)
                    .context("file is not inside the repository")?;
                Document::Revision(RevisionDocument::new(
                    repo.clone(),
                    relative,
                    revision,
                    true,
                ))
            }
            None => Document::file(&path),
        };

        let info = workspace
            .resolve(&document)
            .context("file is not inside the repository")?;

        Ok(Self {
            repo,
            document,
            workspace,
            info,
        })
    }

    pub fn view(&self, cursor_line: u32) -> EditorView {
        EditorView {
            id: EDITOR,
            document: self.document.clone(),
            cursor_lines: vec![cursor_line],
        }
    }
}

/// Build an annotation source from configuration.
pub fn annotation_source(config: &Config) -> Arc<AnnotationSource> {
    let git = Arc::new(GitCli::from_config(&config.annotation));
    let cache = Arc::new(AnnotationCache::new(
        Arc::new(SystemClock),
        config.annotation.cache_ttl(),
    ));
    Arc::new(AnnotationSource::new(git, cache))
}

/// A controller wired to terminal surfaces.
pub struct Session {
    pub controller: BlameController,
    pub host: Arc<TerminalHost>,
    pub sink: Arc<TerminalSink>,
}

impl Session {
    pub fn new(config: &Config, workspace: Workspace, editors: Vec<EditorView>, echo: bool) -> Self {
        let source = annotation_source(config);
        let host = Arc::new(TerminalHost::new(editors));
        let sink = Arc::new(TerminalSink::new(echo));
        let viewer = Arc::new(TerminalDiffViewer::new(source.git().clone()));

        let controller = BlameController::new(
            source,
            workspace,
            Collaborators {
                host: host.clone(),
                decorations: sink.clone(),
                diff_viewer: viewer,
                settings: Arc::new(TomlSettingsStore::new(
                    Config::settings_path(),
                    config.annotation.enabled,
                )),
                notifier: Arc::new(TerminalNotifier),
                clock: Arc::new(SystemClock),
            },
            ControllerOptions::from(&config.annotation),
        );

        Self {
            controller,
            host,
            sink,
        }
    }
}

// ============================================
// Host surfaces
// ============================================

pub struct TerminalHost {
    editors: Mutex<Vec<EditorView>>,
}

impl TerminalHost {
    pub fn new(editors: Vec<EditorView>) -> Self {
        Self {
            editors: Mutex::new(editors),
        }
    }

    pub fn set_cursor(&self, id: EditorId, line: u32) {
        let mut editors = self.editors.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(editor) = editors.iter_mut().find(|e| e.id == id) {
            editor.cursor_lines = vec![line];
        }
    }
}

impl EditorHost for TerminalHost {
    fn visible_editors(&self) -> Vec<EditorView> {
        self.editors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn active_editor(&self) -> Option<EditorId> {
        self.visible_editors().first().map(|e| e.id)
    }
}

/// Keeps the latest decorations per editor and optionally echoes changes.
pub struct TerminalSink {
    echo: bool,
    current: Mutex<HashMap<EditorId, Vec<Decoration>>>,
}

impl TerminalSink {
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            current: Mutex::new(HashMap::new()),
        }
    }
}

impl DecorationSink for TerminalSink {
    fn set_decorations(&self, editor: EditorId, decorations: Vec<Decoration>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current.get(&editor) == Some(&decorations) {
            return;
        }

        if self.echo {
            let timestamp = chrono::Local::now().format("%H:%M:%S");
            if decorations.is_empty() {
                println!("[{}] (no annotation)", timestamp);
            }
            for decoration in &decorations {
                println!(
                    "[{}] {:>5} │ {}",
                    timestamp,
                    decoration.line + 1,
                    decoration.text
                );
            }
        }
        current.insert(editor, decorations);
    }

    fn dispose(&self) {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
        eprintln!("error: {}", message);
    }
}

/// Prints comparisons as a unified diff.
pub struct TerminalDiffViewer {
    contents: RevisionContentProvider,
}

impl TerminalDiffViewer {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self {
            contents: RevisionContentProvider::new(git),
        }
    }
}

#[async_trait]
impl DiffViewer for TerminalDiffViewer {
    async fn open_comparison(&self, comparison: Comparison) -> blameline_core::Result<()> {
        let left = self.contents.content(&comparison.left).await;
        let right = self.contents.content(&comparison.right).await;

        let left_label = format!("a/{} ({})", comparison.left.path, comparison.left.revision);
        let right_label = format!(
            "b/{} ({})",
            comparison.right.path, comparison.right.revision
        );

        println!("{}", comparison.title);
        let diff = similar::TextDiff::from_lines(&left, &right);
        print!(
            "{}",
            diff.unified_diff()
                .context_radius(3)
                .header(&left_label, &right_label)
        );
        Ok(())
    }
}
