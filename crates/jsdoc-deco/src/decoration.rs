//! Decoration sink
//!
//! One decoration kind: an "after" annotation carrying documentation text.
//! The pipeline always hands over the complete set for an editor, so the
//! sink only has to replace, clear, or dispose.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use jsdoc_deco_core::lsp_types::Range;
use serde::Serialize;

use crate::config::DecorationStyle;
use crate::host::EditorId;

/// Namespace the sink files its annotations under
pub const DECORATION_NAMESPACE: &str = "jsdoc-deco";

/// Annotation rendered after a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterAttachment {
    pub content_text: String,
    pub color: String,
    pub margin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecorationOptions {
    pub range: Range,
    pub after: AfterAttachment,
}

impl DecorationOptions {
    pub fn after(range: Range, text: impl Into<String>, style: &DecorationStyle) -> Self {
        Self {
            range,
            after: AfterAttachment {
                content_text: text.into(),
                color: style.color.clone(),
                margin: style.margin.clone(),
            },
        }
    }
}

pub trait DecorationSink: Send + Sync {
    /// Replace every decoration on `editor` with `decorations`
    fn apply(&self, editor: EditorId, decorations: Vec<DecorationOptions>);

    fn clear(&self, editor: EditorId);

    /// Release the decoration kind. Later calls are ignored.
    fn dispose(&self);
}

/// Unique identifier for an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualTextId(pub u64);

#[derive(Debug, Clone)]
struct VirtualText {
    id: VirtualTextId,
    decoration: DecorationOptions,
}

#[derive(Default)]
struct SinkState {
    texts: HashMap<EditorId, Vec<VirtualText>>,
    /// Bumped on every visible change, per editor
    revisions: HashMap<EditorId, u64>,
    next_id: u64,
    disposed: bool,
}

/// In-memory sink holding each editor's annotations as virtual text.
///
/// A renderer reads a consistent snapshot with [`VirtualTextSink::decorations`];
/// writes that would not change what is shown leave the revision alone.
#[derive(Default)]
pub struct VirtualTextSink {
    state: Mutex<SinkState>,
}

impl VirtualTextSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current annotations on `editor`, in document order
    pub fn decorations(&self, editor: EditorId) -> Vec<DecorationOptions> {
        let state = self.state();
        let mut decorations: Vec<DecorationOptions> = state
            .texts
            .get(&editor)
            .map(|texts| texts.iter().map(|t| t.decoration.clone()).collect())
            .unwrap_or_default();
        decorations.sort_by_key(|d| (d.range.start, d.range.end));
        decorations
    }

    /// How many times the annotations on `editor` have visibly changed
    pub fn revision(&self, editor: EditorId) -> u64 {
        self.state().revisions.get(&editor).copied().unwrap_or(0)
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }
}

impl DecorationSink for VirtualTextSink {
    fn apply(&self, editor: EditorId, decorations: Vec<DecorationOptions>) {
        let mut state = self.state();
        if state.disposed {
            tracing::debug!("Ignoring decorations for {} after dispose", editor);
            return;
        }

        let unchanged = state.texts.get(&editor).is_some_and(|current| {
            current.len() == decorations.len()
                && current.iter().zip(&decorations).all(|(t, d)| &t.decoration == d)
        });
        if unchanged {
            return;
        }

        let mut texts = Vec::with_capacity(decorations.len());
        for decoration in decorations {
            let id = VirtualTextId(state.next_id);
            state.next_id += 1;
            texts.push(VirtualText { id, decoration });
        }
        tracing::debug!(
            "{}: {} annotations in {} (first id {:?})",
            DECORATION_NAMESPACE,
            texts.len(),
            editor,
            texts.first().map(|t| t.id)
        );
        state.texts.insert(editor, texts);
        *state.revisions.entry(editor).or_default() += 1;
    }

    fn clear(&self, editor: EditorId) {
        let mut state = self.state();
        if state.disposed {
            return;
        }
        let had_any = state
            .texts
            .remove(&editor)
            .is_some_and(|texts| !texts.is_empty());
        if had_any {
            *state.revisions.entry(editor).or_default() += 1;
        }
    }

    fn dispose(&self) {
        let mut state = self.state();
        state.texts.clear();
        state.disposed = true;
    }
}
