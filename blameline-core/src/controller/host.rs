//! Host editor surfaces the controller drives
//!
//! The controller never talks to an editor directly. Hosts implement these
//! traits and feed [`EditorEvent`]s in.

use crate::document::Document;
use crate::render::Decoration;
use std::fmt;

/// Stable identifier of an editor pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

/// Snapshot of one visible editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub id: EditorId,
    pub document: Document,
    /// Zero-based lines holding a cursor, one per selection
    pub cursor_lines: Vec<u32>,
}

/// Lifecycle events a host reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    ActiveEditorChanged(EditorId),
    SelectionChanged(EditorId),
    /// Text edited but not saved
    DocumentChanged(Document),
    DocumentSaved(Document),
    /// Persisted settings may have changed outside the controller
    ConfigurationChanged,
}

/// Read access to the host's window state.
pub trait EditorHost: Send + Sync {
    /// Editors currently on screen.
    fn visible_editors(&self) -> Vec<EditorView>;

    /// Editor with keyboard focus.
    fn active_editor(&self) -> Option<EditorId>;

    fn editor(&self, id: EditorId) -> Option<EditorView> {
        self.visible_editors().into_iter().find(|e| e.id == id)
    }
}

/// Receives trailing line annotations. Each call replaces the editor's previous set.
pub trait DecorationSink: Send + Sync {
    fn set_decorations(&self, editor: EditorId, decorations: Vec<Decoration>);

    fn clear(&self, editor: EditorId) {
        self.set_decorations(editor, Vec::new());
    }

    /// Release rendering resources; called once when the controller is disposed.
    fn dispose(&self);
}

/// User-visible messages.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}
