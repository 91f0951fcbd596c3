//! Host editor abstraction
//!
//! The refresh pipeline only sees the editor through these traits: a
//! [`TextEditor`] for the document and viewport, and an [`EditorHost`] for
//! commands, configuration and user-visible messages.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use jsdoc_deco_core::lsp_types::Range;
use serde_json::Value;

pub mod in_process;
pub mod simulated;

pub use in_process::InProcessHost;
pub use simulated::SimulatedEditor;

/// Command that forwards a request to the language service
pub use jsdoc_deco_core::codec::TSSERVER_REQUEST_COMMAND;

/// Command that restarts the language service
pub const RESTART_TSSERVER_COMMAND: &str = "typescript.restartTsServer";

/// Setting that selects the syntax-only or semantic language service
pub const USE_SYNTAX_SERVER_SETTING: &str = "typescript.tsserver.useSyntaxServer";

/// Identifies an editor (a view onto a document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

/// Point-in-time view of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: String,
    /// Path the language service knows the document by
    pub file_name: String,
    pub language_id: String,
    /// Incremented by the host on every change
    pub version: i32,
    pub text: Arc<str>,
}

pub trait TextEditor: Send + Sync {
    fn id(&self) -> EditorId;

    fn document(&self) -> DocumentSnapshot;

    /// Current document version; cheaper than a full snapshot
    fn version(&self) -> i32 {
        self.document().version
    }

    fn visible_ranges(&self) -> Vec<Range>;
}

#[async_trait]
pub trait EditorHost: Send + Sync {
    async fn execute_command(&self, command: &str, args: Vec<Value>) -> Result<Value>;

    fn get_configuration(&self, key: &str) -> Option<Value>;

    async fn update_configuration(&self, key: &str, value: Value) -> Result<()>;

    fn show_warning_message(&self, message: &str);
}

/// Host notifications the extension reacts to.
#[derive(Clone)]
pub enum EditorEvent {
    ContentChanged { uri: String },
    DocumentOpened { uri: String },
    ActiveEditorChanged(Option<Arc<dyn TextEditor>>),
    SelectionChanged(Arc<dyn TextEditor>),
    VisibleRangesChanged(Arc<dyn TextEditor>),
    DocumentClosed { uri: String },
}

impl fmt::Debug for EditorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentChanged { uri } => write!(f, "ContentChanged({uri})"),
            Self::DocumentOpened { uri } => write!(f, "DocumentOpened({uri})"),
            Self::ActiveEditorChanged(editor) => {
                write!(f, "ActiveEditorChanged({:?})", editor.as_ref().map(|e| e.id()))
            }
            Self::SelectionChanged(editor) => write!(f, "SelectionChanged({})", editor.id()),
            Self::VisibleRangesChanged(editor) => {
                write!(f, "VisibleRangesChanged({})", editor.id())
            }
            Self::DocumentClosed { uri } => write!(f, "DocumentClosed({uri})"),
        }
    }
}
