//! Update scheduling for live editors
//!
//! The controller reacts to [`EditorEvent`]s and keeps every visible
//! editor's decorations in step with the annotation source:
//!
//! | Event | Effect |
//! |-------|--------|
//! | active editor changed | recompute now |
//! | selection changed | recompute after the debounce window, last event wins |
//! | document changed | drop cached annotations, no redraw |
//! | document saved | drop cached annotations, redraw editors showing it |
//! | configuration changed | re-read the enabled toggle |
//!
//! When any visible editor shows a VCS comparison side, or the trigger shows
//! a revision document, all visible editors are recomputed together so both
//! sides of a comparison stay in sync.
//!
//! Decorations are replaced in place and never cleared while a debounce
//! timer is pending. Each editor update carries a generation number and only
//! the most recently started update for an editor may render.

mod host;
mod lookup;

pub use host::{
    DecorationSink, EditorEvent, EditorHost, EditorId, EditorView, LogNotifier, Notifier,
};
pub use lookup::VisibleAnnotations;

use crate::blame::{AnnotationSource, Clock};
use crate::config::AnnotationConfig;
use crate::diff::{resolve_comparison, Comparison, DiffViewer};
use crate::document::{Document, Workspace};
use crate::render::{render_decorations, DiffCommand, HoverProvider};
use crate::settings::SettingsStore;
use crate::types::CacheKey;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub debounce: Duration,
    pub summary_max_chars: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&AnnotationConfig::default())
    }
}

impl From<&AnnotationConfig> for ControllerOptions {
    fn from(config: &AnnotationConfig) -> Self {
        Self {
            debounce: config.debounce(),
            summary_max_chars: config.summary_max_chars,
        }
    }
}

/// Host-provided collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub host: Arc<dyn EditorHost>,
    pub decorations: Arc<dyn DecorationSink>,
    pub diff_viewer: Arc<dyn DiffViewer>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Used for relative times in decorations
    pub clock: Arc<dyn Clock>,
}

/// Whether every visible editor must be updated together.
pub fn is_synchronized(visible: &[EditorView], trigger: Option<&EditorView>) -> bool {
    visible.iter().any(|e| e.document.is_vcs())
        || trigger.is_some_and(|t| t.document.is_revision())
}

struct PendingTimer {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    enabled: bool,
    disposed: bool,
    debounce: Option<PendingTimer>,
    next_timer: u64,
    event_loop: Option<JoinHandle<()>>,
    /// Dispatched event handlers still running
    in_flight: Vec<JoinHandle<()>>,
    /// Most recently started update per editor
    generations: HashMap<EditorId, u64>,
    next_generation: u64,
}

struct Inner {
    source: Arc<AnnotationSource>,
    workspace: Workspace,
    lookups: Arc<VisibleAnnotations>,
    collab: Collaborators,
    options: ControllerOptions,
    state: Mutex<State>,
}

/// Coordinates annotation fetching and rendering for a set of editors.
#[derive(Clone)]
pub struct BlameController {
    inner: Arc<Inner>,
}

impl BlameController {
    pub fn new(
        source: Arc<AnnotationSource>,
        workspace: Workspace,
        collab: Collaborators,
        options: ControllerOptions,
    ) -> Self {
        let enabled = collab.settings.enabled();
        let lookups = Arc::new(VisibleAnnotations::new(workspace.clone(), source.clone()));
        Self {
            inner: Arc::new(Inner {
                source,
                workspace,
                lookups,
                collab,
                options,
                state: Mutex::new(State {
                    enabled,
                    ..Default::default()
                }),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state().enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state().disposed
    }

    /// Whether a debounced update is waiting to fire.
    pub fn has_pending_update(&self) -> bool {
        self.inner.state().debounce.is_some()
    }

    /// Hover provider answering from this controller's rendered annotations.
    pub fn hover_provider(&self) -> HoverProvider {
        HoverProvider::new(self.inner.lookups.clone(), self.inner.lookups.clone())
    }

    pub fn visible_annotations(&self) -> Arc<VisibleAnnotations> {
        self.inner.lookups.clone()
    }

    /// Render the active editor (or all visible editors in synchronized mode).
    pub async fn start(&self) {
        let active = self.inner.collab.host.active_editor();
        self.inner.update_targets(active).await;
    }

    /// Handle an event without waiting for its work to finish.
    ///
    /// Must be called from within a tokio runtime. [`dispose`](Self::dispose) cancels
    /// work still running.
    pub fn dispatch(&self, event: EditorEvent) {
        self.inner.dispatch(event);
    }

    /// Handle an event and wait for any immediate work it triggers.
    ///
    /// Selection changes only arm the debounce timer and return.
    pub async fn handle_event(&self, event: EditorEvent) {
        self.inner.handle_event(event).await;
    }

    /// Consume events from a channel until it closes or the controller is disposed.
    pub fn spawn_event_loop(&self, mut events: mpsc::UnboundedReceiver<EditorEvent>) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                inner.dispatch(event);
            }
            tracing::debug!("Editor event channel closed");
        });

        let mut state = self.inner.state();
        if state.disposed {
            handle.abort();
            return;
        }
        if let Some(previous) = state.event_loop.replace(handle) {
            previous.abort();
        }
    }

    /// Flip and persist the enabled toggle. Returns the new value.
    pub async fn toggle(&self) -> bool {
        let enabled = {
            let state = self.inner.state();
            if state.disposed {
                return state.enabled;
            }
            !state.enabled
        };

        if let Err(e) = self.inner.collab.settings.set_enabled(enabled) {
            tracing::warn!(error = %e, "Failed to persist enabled setting");
        }
        self.inner.apply_enabled(enabled).await;

        self.inner.collab.notifier.info(if enabled {
            "Git blame annotations enabled"
        } else {
            "Git blame annotations disabled"
        });
        enabled
    }

    /// Open a comparison between `command.revision` and its parent.
    pub async fn show_diff(&self, command: &DiffCommand) -> Option<Comparison> {
        self.inner.show_diff(command).await
    }

    /// Open the comparison for the commit under an editor's first cursor.
    pub async fn show_diff_at_cursor(&self, editor: EditorId) -> Option<Comparison> {
        let inner = &self.inner;
        let view = inner.collab.host.editor(editor)?;
        let info = inner.workspace.resolve(&view.document)?;
        let line = *view.cursor_lines.first()?;
        let map = inner.lookups.get(&info.cache_key)?;
        let record = map.get(line + 1)?;

        if record.is_uncommitted() {
            inner.collab.notifier.info("This line has uncommitted changes");
            return None;
        }

        let command = DiffCommand {
            revision: record.revision.clone(),
            repo: info.repo_path,
            path: info.file_path,
        };
        inner.show_diff(&command).await
    }

    /// Cancel pending work, release the event loop and decorations, drop all cached state.
    ///
    /// Safe to call more than once.
    pub fn dispose(&self) {
        let (timer, event_loop, in_flight) = {
            let mut state = self.inner.state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.generations.clear();
            (
                state.debounce.take(),
                state.event_loop.take(),
                std::mem::take(&mut state.in_flight),
            )
        };

        if let Some(timer) = timer {
            timer.handle.abort();
        }
        if let Some(event_loop) = event_loop {
            event_loop.abort();
        }
        for task in in_flight {
            task.abort();
        }
        self.inner.collab.decorations.dispose();
        self.inner.lookups.clear();
        self.inner.source.invalidate_all();
        tracing::info!("Blame controller disposed");
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        let state = self.state();
        state.enabled && !state.disposed
    }

    fn dispatch(self: &Arc<Self>, event: EditorEvent) {
        match event {
            EditorEvent::SelectionChanged(editor) => self.arm_debounce(editor),
            other => {
                let mut state = self.state();
                if state.disposed {
                    return;
                }
                state.in_flight.retain(|task| !task.is_finished());
                let inner = Arc::clone(self);
                state
                    .in_flight
                    .push(tokio::spawn(async move { inner.handle_event(other).await }));
            }
        }
    }

    async fn handle_event(self: &Arc<Self>, event: EditorEvent) {
        tracing::trace!(?event, "Editor event");
        match event {
            EditorEvent::ActiveEditorChanged(editor) => self.update_targets(Some(editor)).await,
            EditorEvent::SelectionChanged(editor) => self.arm_debounce(editor),
            EditorEvent::DocumentChanged(document) => {
                self.invalidate_document(&document);
            }
            EditorEvent::DocumentSaved(document) => self.document_saved(&document).await,
            EditorEvent::ConfigurationChanged => {
                let enabled = self.collab.settings.enabled();
                let changed = self.state().enabled != enabled;
                if changed {
                    self.apply_enabled(enabled).await;
                }
            }
        }
    }

    /// Replace any pending timer with one that updates `editor` after the debounce window.
    fn arm_debounce(self: &Arc<Self>, editor: EditorId) {
        let mut state = self.state();
        if state.disposed {
            return;
        }
        if let Some(previous) = state.debounce.take() {
            previous.handle.abort();
        }

        state.next_timer += 1;
        let token = state.next_timer;
        let delay = self.options.debounce;
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire_debounce(token, editor).await;
        });
        state.debounce = Some(PendingTimer { token, handle });
    }

    async fn fire_debounce(&self, token: u64, editor: EditorId) {
        {
            let mut state = self.state();
            match &state.debounce {
                Some(pending) if pending.token == token => state.debounce = None,
                _ => return,
            }
        }
        self.update_targets(Some(editor)).await;
    }

    /// Update the trigger editor, or every visible editor in synchronized mode.
    async fn update_targets(&self, trigger: Option<EditorId>) {
        let host = &self.collab.host;
        let visible = host.visible_editors();
        let trigger_view = trigger.and_then(|id| {
            visible
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .or_else(|| host.editor(id))
        });

        let targets = if is_synchronized(&visible, trigger_view.as_ref()) {
            visible
        } else {
            trigger_view.into_iter().collect()
        };

        for view in targets {
            self.update_editor(view).await;
        }
    }

    async fn update_editor(&self, view: EditorView) {
        if !self.is_active() {
            return;
        }
        let Some(info) = self.workspace.resolve(&view.document) else {
            tracing::trace!(editor = %view.id, "Document does not resolve to a repository");
            return;
        };

        let generation = {
            let mut state = self.state();
            state.next_generation += 1;
            let generation = state.next_generation;
            state.generations.insert(view.id, generation);
            generation
        };

        let map = self.source.annotations(&info).await;
        if self.state().disposed {
            // Undo whatever the fetch cached after teardown
            self.source.invalidate(&info.cache_key);
            return;
        }
        self.source.remote_info(&info.repo_path).await;
        if self.state().disposed {
            self.source.invalidate_all();
            return;
        }

        let current = {
            let state = self.state();
            state.enabled
                && !state.disposed
                && state.generations.get(&view.id) == Some(&generation)
        };
        if !current {
            tracing::debug!(editor = %view.id, generation, "Discarding superseded annotation update");
            return;
        }

        match map {
            Some(map) => {
                self.lookups.store(info.cache_key.clone(), map.clone());
                self.prune_lookups(&info.cache_key);
                let now = self.collab.clock.now_millis() / 1000;
                let decorations = render_decorations(
                    &map,
                    &view.cursor_lines,
                    now,
                    self.options.summary_max_chars,
                );
                self.collab.decorations.set_decorations(view.id, decorations);
            }
            None => self.collab.decorations.clear(view.id),
        }
    }

    /// Forget rendered maps for documents no longer on screen.
    fn prune_lookups(&self, rendered: &CacheKey) {
        let mut keep: HashSet<CacheKey> = self
            .collab
            .host
            .visible_editors()
            .iter()
            .filter_map(|view| self.workspace.resolve(&view.document))
            .map(|info| info.cache_key)
            .collect();
        keep.insert(rendered.clone());
        self.lookups.retain(&keep);
    }

    /// Drop cached annotations for a document. Returns its key when it resolves.
    fn invalidate_document(&self, document: &Document) -> Option<CacheKey> {
        let info = self.workspace.resolve(document)?;
        self.source.invalidate(&info.cache_key);
        self.lookups.remove(&info.cache_key);
        tracing::trace!(key = %info.cache_key, "Invalidated annotations");
        Some(info.cache_key)
    }

    async fn document_saved(&self, document: &Document) {
        let Some(key) = self.invalidate_document(document) else {
            return;
        };
        let targets: Vec<EditorView> = self
            .collab
            .host
            .visible_editors()
            .into_iter()
            .filter(|view| {
                self.workspace
                    .resolve(&view.document)
                    .is_some_and(|info| info.cache_key == key)
            })
            .collect();

        for view in targets {
            self.update_editor(view).await;
        }
    }

    /// Set the enabled flag, then recompute or clear every visible editor.
    async fn apply_enabled(&self, enabled: bool) {
        {
            let mut state = self.state();
            if state.disposed {
                return;
            }
            state.enabled = enabled;
            if !enabled {
                if let Some(timer) = state.debounce.take() {
                    timer.handle.abort();
                }
            }
        }

        let visible = self.collab.host.visible_editors();
        if enabled {
            for view in visible {
                self.update_editor(view).await;
            }
        } else {
            for view in visible {
                self.collab.decorations.clear(view.id);
            }
        }
    }

    async fn show_diff(&self, command: &DiffCommand) -> Option<Comparison> {
        let comparison = match resolve_comparison(self.source.git().as_ref(), command).await {
            Ok(comparison) => comparison,
            Err(e) => {
                tracing::warn!(revision = %command.revision, error = %e, "Failed to resolve diff");
                self.collab
                    .notifier
                    .error(&format!("Failed to show diff: {}", e));
                return None;
            }
        };

        match self
            .collab
            .diff_viewer
            .open_comparison(comparison.clone())
            .await
        {
            Ok(()) => Some(comparison),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open comparison");
                self.collab
                    .notifier
                    .error(&format!("Failed to open diff: {}", e));
                None
            }
        }
    }
}
