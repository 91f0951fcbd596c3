#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use jsdoc_deco::host::{EditorEvent, EditorId, InProcessHost, SimulatedEditor, TextEditor};
use jsdoc_deco::{DecoConfig, DecorationOptions, DecorationSink, Extension, VirtualTextSink};
use jsdoc_deco_core::lsp_types::{Position, Range};

pub const EDITOR: EditorId = EditorId(1);

/// Initialize the global tracing subscriber once (used by tests that run with `RUST_LOG`).
pub fn init_tracing_from_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stdout);
        let _ = subscriber.try_init();
    });
}

/// Sink that remembers every set it was handed, in order
#[derive(Default)]
pub struct RecordingSink {
    inner: VirtualTextSink,
    applied: Mutex<Vec<Vec<DecorationOptions>>>,
}

impl RecordingSink {
    pub fn applied_texts(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|d| d.after.content_text.clone())
            .collect()
    }

    pub fn decorations(&self, editor: EditorId) -> Vec<DecorationOptions> {
        self.inner.decorations(editor)
    }

    pub fn revision(&self, editor: EditorId) -> u64 {
        self.inner.revision(editor)
    }
}

impl DecorationSink for RecordingSink {
    fn apply(&self, editor: EditorId, decorations: Vec<DecorationOptions>) {
        self.applied.lock().unwrap().push(decorations.clone());
        self.inner.apply(editor, decorations);
    }

    fn clear(&self, editor: EditorId) {
        self.inner.clear(editor);
    }

    fn dispose(&self) {
        self.inner.dispose();
    }
}

/// One activated extension over one simulated editor
pub struct DecoHarness {
    pub host: Arc<InProcessHost>,
    pub sink: Arc<RecordingSink>,
    pub editor: Arc<SimulatedEditor>,
    pub extension: Extension,
}

impl DecoHarness {
    pub async fn open(file_name: &str, language_id: &str, text: &str) -> Self {
        Self::with_host(Arc::new(InProcessHost::semantic()), file_name, language_id, text, None)
            .await
    }

    pub async fn with_host(
        host: Arc<InProcessHost>,
        file_name: &str,
        language_id: &str,
        text: &str,
        visible_lines: Option<(u32, u32)>,
    ) -> Self {
        init_tracing_from_env();
        let sink = Arc::new(RecordingSink::default());
        let editor = SimulatedEditor::open(EDITOR, host.clone(), file_name, language_id, text);
        if let Some((start, end)) = visible_lines {
            editor.scroll_to_lines(start, end);
        }
        let active: Arc<dyn TextEditor> = editor.clone();
        let extension =
            Extension::activate(host.clone(), sink.clone(), DecoConfig::default(), Some(active))
                .await;
        extension.controller().settled().await;
        Self {
            host,
            sink,
            editor,
            extension,
        }
    }

    pub fn uri(&self) -> String {
        self.editor.document().uri
    }

    /// Replace the text and report the change the way the host would
    pub fn edit(&self, text: &str) {
        self.editor.set_text(text);
        self.extension
            .handle_event(EditorEvent::ContentChanged { uri: self.uri() });
    }

    pub fn scroll_to_lines(&self, start: u32, end: u32) {
        self.editor.scroll_to_lines(start, end);
        let editor: Arc<dyn TextEditor> = self.editor.clone();
        self.extension
            .handle_event(EditorEvent::VisibleRangesChanged(editor));
    }

    pub async fn settled(&self) {
        self.extension.controller().settled().await;
    }

    /// Decorations as `(source text of the range, annotation)`
    pub fn shown(&self) -> Vec<(String, String)> {
        let document = self.editor.document();
        let index = jsdoc_deco_core::LineIndex::new(&document.text);
        self.sink
            .decorations(EDITOR)
            .into_iter()
            .map(|d| {
                let start = index.offset_at(d.range.start);
                let end = index.offset_at(d.range.end);
                (document.text[start..end].to_string(), d.after.content_text)
            })
            .collect()
    }
}

/// Range of the first occurrence of `needle` on a single-line text
pub fn range_of(text: &str, needle: &str) -> Range {
    let start = text.find(needle).unwrap() as u32;
    Range::new(
        Position::new(0, start),
        Position::new(0, start + needle.len() as u32),
    )
}
