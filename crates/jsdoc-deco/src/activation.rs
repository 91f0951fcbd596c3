//! Extension lifecycle: activation, host events and deactivation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::channel::TsServerChannel;
use crate::config::DecoConfig;
use crate::decoration::DecorationSink;
use crate::host::{
    EditorEvent, EditorHost, TextEditor, RESTART_TSSERVER_COMMAND, USE_SYNTAX_SERVER_SETTING,
};
use crate::refresh::RefreshController;

/// Value of the syntax-server setting that keeps the semantic server on
const SEMANTIC_ONLY: &str = "never";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn switch_to_semantic_server(host: &dyn EditorHost) -> Result<bool> {
    let current = host.get_configuration(USE_SYNTAX_SERVER_SETTING);
    if current.as_ref().and_then(Value::as_str) == Some(SEMANTIC_ONLY) {
        return Ok(false);
    }
    host.update_configuration(USE_SYNTAX_SERVER_SETTING, Value::from(SEMANTIC_ONLY))
        .await
        .with_context(|| format!("Failed to set {}", USE_SYNTAX_SERVER_SETTING))?;
    host.execute_command(RESTART_TSSERVER_COMMAND, Vec::new())
        .await
        .context("Failed to restart the TypeScript server")?;
    Ok(true)
}

/// Make sure the language service runs with plugins loaded.
///
/// Returns false when the setting could not be applied; the user has then
/// been warned once and decorations will stay empty.
pub async fn ensure_semantic_server(host: &dyn EditorHost) -> bool {
    match switch_to_semantic_server(host).await {
        Ok(true) => {
            tracing::info!("Switched the TypeScript server to semantic mode");
            true
        }
        Ok(false) => true,
        Err(err) => {
            tracing::warn!("Semantic server not enforced: {:#}", err);
            host.show_warning_message(&format!(
                "jsdoc-deco could not set {} to \"{}\"; inline documentation is unavailable. ({:#})",
                USE_SYNTAX_SERVER_SETTING, SEMANTIC_ONLY, err
            ));
            false
        }
    }
}

/// One activation of the extension
pub struct Extension {
    controller: RefreshController,
    sink: Arc<dyn DecorationSink>,
    active: Mutex<Option<Arc<dyn TextEditor>>>,
    semantic_server: bool,
}

impl Extension {
    /// Must be awaited within a tokio runtime
    pub async fn activate(
        host: Arc<dyn EditorHost>,
        sink: Arc<dyn DecorationSink>,
        config: DecoConfig,
        active_editor: Option<Arc<dyn TextEditor>>,
    ) -> Self {
        let semantic_server = if config.enforce_semantic_server {
            ensure_semantic_server(host.as_ref()).await
        } else {
            true
        };

        let channel = Arc::new(TsServerChannel::new(host));
        let controller = RefreshController::new(config, channel, Arc::clone(&sink));
        if let Some(editor) = &active_editor {
            controller.schedule(Arc::clone(editor), Duration::ZERO);
        }
        tracing::info!("jsdoc-deco activated");

        Self {
            controller,
            sink,
            active: Mutex::new(active_editor),
            semantic_server,
        }
    }

    pub fn controller(&self) -> &RefreshController {
        &self.controller
    }

    /// False if activation could not switch the language service to
    /// semantic mode
    pub fn semantic_server(&self) -> bool {
        self.semantic_server
    }

    pub fn active_editor(&self) -> Option<Arc<dyn TextEditor>> {
        lock(&self.active).clone()
    }

    /// Must be called within a tokio runtime
    pub fn handle_event(&self, event: EditorEvent) {
        tracing::trace!("{:?}", event);
        let debounce = self.controller.config().debounce();
        match event {
            EditorEvent::ContentChanged { uri } | EditorEvent::DocumentOpened { uri } => {
                if let Some(editor) = self.active_editor() {
                    if editor.document().uri == uri {
                        self.controller.schedule(editor, debounce);
                    }
                }
            }
            EditorEvent::ActiveEditorChanged(editor) => {
                *lock(&self.active) = editor.clone();
                if let Some(editor) = editor {
                    self.controller.schedule(editor, Duration::ZERO);
                }
            }
            EditorEvent::SelectionChanged(editor) | EditorEvent::VisibleRangesChanged(editor) => {
                self.controller.schedule(editor, debounce);
            }
            EditorEvent::DocumentClosed { uri } => {
                self.controller.release_document(&uri);
            }
        }
    }

    /// Tear down: no further refresh is scheduled and the decoration kind
    /// is released
    pub fn deactivate(self) {
        self.controller.cancel_pending();
        if let Some(editor) = lock(&self.active).take() {
            self.sink.clear(editor.id());
        }
        self.sink.dispose();
        tracing::info!("jsdoc-deco deactivated");
    }
}
