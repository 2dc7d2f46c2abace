//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use blameline_core::blame::{AnnotationCache, AnnotationSource, ManualClock};
use blameline_core::controller::{
    BlameController, Collaborators, ControllerOptions, DecorationSink, EditorHost, EditorId,
    EditorView, Notifier,
};
use blameline_core::diff::{Comparison, DiffViewer};
use blameline_core::document::{Document, Workspace};
use blameline_core::git::GitRunner;
use blameline_core::render::Decoration;
use blameline_core::settings::MemorySettings;
use blameline_core::{Error, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wall clock seen by the controller, in seconds.
pub const NOW: i64 = 1_700_000_000;
pub const REPO: &str = "/work/app";

pub const REV_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const REV_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Build `--line-porcelain` output, one entry per line starting at line 1.
///
/// Every commit is authored one hour before [`NOW`].
pub fn porcelain(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::new();
    for (i, (revision, author, summary)) in entries.iter().enumerate() {
        let line = i + 1;
        out.push_str(&format!(
            "{revision} {line} {line} 1\n\
             author {author}\n\
             author-mail <{email}@example.com>\n\
             author-time {time}\n\
             author-tz +0000\n\
             summary {summary}\n\
             filename src/lib.rs\n\
             \tline {line}\n",
            email = author.to_lowercase(),
            time = NOW - 3600,
        ));
    }
    out
}

pub fn file_doc(relative: &str) -> Document {
    Document::file(Path::new(REPO).join(relative))
}

pub fn view(id: u64, document: Document, cursor_lines: &[u32]) -> EditorView {
    EditorView {
        id: EditorId(id),
        document,
        cursor_lines: cursor_lines.to_vec(),
    }
}

// ============================================
// Git
// ============================================

#[derive(Debug, Clone)]
pub enum ParentScript {
    Parent(String),
    Root,
    Fail,
}

/// Git runner returning canned output and counting calls.
pub struct ScriptedGit {
    output: Mutex<String>,
    /// Per-call (delay, output) overrides consumed in order before `output`
    queued: Mutex<VecDeque<(Duration, String)>>,
    failing: AtomicBool,
    remote: Option<String>,
    parent: Mutex<ParentScript>,
    pub blames: AtomicUsize,
    pub remote_lookups: AtomicUsize,
    pub blamed_revisions: Mutex<Vec<Option<String>>>,
    /// Contents piped to `blame --contents -`
    pub blamed_contents: Mutex<Vec<String>>,
}

impl ScriptedGit {
    pub fn new(output: String) -> Self {
        Self {
            output: Mutex::new(output),
            queued: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
            remote: Some("git@github.com:acme/widgets.git".to_string()),
            parent: Mutex::new(ParentScript::Parent(REV_B.to_string())),
            blames: AtomicUsize::new(0),
            remote_lookups: AtomicUsize::new(0),
            blamed_revisions: Mutex::new(Vec::new()),
            blamed_contents: Mutex::new(Vec::new()),
        }
    }

    pub fn without_remote(mut self) -> Self {
        self.remote = None;
        self
    }

    pub fn set_output(&self, output: String) {
        *self.output.lock().unwrap() = output;
    }

    pub fn queue(&self, delay: Duration, output: String) {
        self.queued.lock().unwrap().push_back((delay, output));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_parent(&self, parent: ParentScript) {
        *self.parent.lock().unwrap() = parent;
    }

    pub fn blame_count(&self) -> usize {
        self.blames.load(Ordering::SeqCst)
    }

    pub fn remote_count(&self) -> usize {
        self.remote_lookups.load(Ordering::SeqCst)
    }

    async fn next_output(&self) -> Result<String> {
        self.blames.fetch_add(1, Ordering::SeqCst);
        let queued = self.queued.lock().unwrap().pop_front();
        let output = match queued {
            Some((delay, output)) => {
                tokio::time::sleep(delay).await;
                output
            }
            None => self.output.lock().unwrap().clone(),
        };

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Git {
                command: "blame".into(),
                message: "fatal: no such path 'src/lib.rs' in HEAD".into(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn blame(&self, _: &Path, _: &str, revision: Option<&str>) -> Result<String> {
        self.blamed_revisions
            .lock()
            .unwrap()
            .push(revision.map(str::to_string));
        self.next_output().await
    }

    async fn blame_contents(&self, _: &Path, _: &str, contents: &str) -> Result<String> {
        self.blamed_contents
            .lock()
            .unwrap()
            .push(contents.to_string());
        self.next_output().await
    }

    async fn remote_url(&self, _: &Path) -> Result<Option<String>> {
        self.remote_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote.clone())
    }

    async fn parent_revision(&self, _: &Path, _: &str) -> Result<Option<String>> {
        match self.parent.lock().unwrap().clone() {
            ParentScript::Parent(parent) => Ok(Some(parent)),
            ParentScript::Root => Ok(None),
            ParentScript::Fail => Err(Error::Git {
                command: "rev-parse".into(),
                message: "fatal: bad revision".into(),
            }),
        }
    }

    async fn show_file(&self, _: &Path, revision: &str, path: &str) -> Result<String> {
        Ok(format!("{path}@{revision}"))
    }

    async fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
        Ok(dir.to_path_buf())
    }
}

// ============================================
// Host surfaces
// ============================================

#[derive(Default)]
pub struct FakeHost {
    editors: Mutex<Vec<EditorView>>,
    active: Mutex<Option<EditorId>>,
}

impl FakeHost {
    pub fn set_editors(&self, editors: Vec<EditorView>) {
        let first = editors.first().map(|e| e.id);
        *self.editors.lock().unwrap() = editors;
        let mut active = self.active.lock().unwrap();
        if active.is_none() {
            *active = first;
        }
    }

    pub fn set_active(&self, id: EditorId) {
        *self.active.lock().unwrap() = Some(id);
    }

    pub fn move_cursor(&self, id: EditorId, lines: &[u32]) {
        let mut editors = self.editors.lock().unwrap();
        if let Some(editor) = editors.iter_mut().find(|e| e.id == id) {
            editor.cursor_lines = lines.to_vec();
        }
    }
}

impl EditorHost for FakeHost {
    fn visible_editors(&self) -> Vec<EditorView> {
        self.editors.lock().unwrap().clone()
    }

    fn active_editor(&self) -> Option<EditorId> {
        *self.active.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(EditorId, Vec<Decoration>)>>,
    disposals: AtomicUsize,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(EditorId, Vec<Decoration>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_for(&self, id: EditorId) -> Option<Vec<Decoration>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(editor, _)| *editor == id)
            .map(|(_, decorations)| decorations.clone())
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl DecorationSink for RecordingSink {
    fn set_decorations(&self, editor: EditorId, decorations: Vec<Decoration>) {
        self.calls.lock().unwrap().push((editor, decorations));
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingViewer {
    pub opened: Mutex<Vec<Comparison>>,
}

#[async_trait]
impl DiffViewer for RecordingViewer {
    async fn open_comparison(&self, comparison: Comparison) -> Result<()> {
        self.opened.lock().unwrap().push(comparison);
        Ok(())
    }
}

// ============================================
// Harness
// ============================================

pub struct Harness {
    pub git: Arc<ScriptedGit>,
    pub host: Arc<FakeHost>,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub viewer: Arc<RecordingViewer>,
    pub settings: Arc<MemorySettings>,
    pub source: Arc<AnnotationSource>,
    pub controller: BlameController,
}

impl Harness {
    pub fn new(git: ScriptedGit) -> Self {
        blameline_core::logging::init_test();
        let git = Arc::new(git);
        let host = Arc::new(FakeHost::default());
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let viewer = Arc::new(RecordingViewer::default());
        let settings = Arc::new(MemorySettings::new(true));
        let clock = Arc::new(ManualClock::new(NOW * 1000));

        let cache = Arc::new(AnnotationCache::new(
            clock.clone(),
            Duration::from_secs(60),
        ));
        let source = Arc::new(AnnotationSource::new(git.clone(), cache));
        let controller = BlameController::new(
            source.clone(),
            Workspace::new([PathBuf::from(REPO)]),
            Collaborators {
                host: host.clone(),
                decorations: sink.clone(),
                diff_viewer: viewer.clone(),
                settings: settings.clone(),
                notifier: notifier.clone(),
                clock,
            },
            ControllerOptions {
                debounce: Duration::from_millis(50),
                summary_max_chars: 50,
            },
        );

        Self {
            git,
            host,
            sink,
            notifier,
            viewer,
            settings,
            source,
            controller,
        }
    }
}
