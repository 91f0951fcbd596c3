use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jsdoc_deco_core::lsp_types::{Position, Range};
use jsdoc_deco_core::LineIndex;

use super::{DocumentSnapshot, EditorId, InProcessHost, TextEditor};

struct EditorState {
    document: DocumentSnapshot,
    /// `None` shows the whole document
    visible: Option<Vec<Range>>,
}

/// An editor driven programmatically.
///
/// Every text change bumps the document version and is pushed into the
/// host's language service, the way a real editor keeps tsserver in sync.
pub struct SimulatedEditor {
    id: EditorId,
    host: Arc<InProcessHost>,
    state: Mutex<EditorState>,
}

impl SimulatedEditor {
    pub fn open(
        id: EditorId,
        host: Arc<InProcessHost>,
        file_name: &str,
        language_id: &str,
        text: &str,
    ) -> Arc<Self> {
        let document = DocumentSnapshot {
            uri: format!("file://{}", file_name),
            file_name: file_name.to_string(),
            language_id: language_id.to_string(),
            version: 1,
            text: Arc::from(text),
        };
        host.sync_document(&document, false);
        Arc::new(Self {
            id,
            host,
            state: Mutex::new(EditorState {
                document,
                visible: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole text
    pub fn set_text(&self, text: &str) {
        let document = {
            let mut state = self.state();
            state.document.version += 1;
            state.document.text = Arc::from(text);
            state.document.clone()
        };
        self.host.sync_document(&document, true);
    }

    /// Show only these lines (0-based, end exclusive)
    pub fn scroll_to_lines(&self, start: u32, end: u32) {
        self.set_visible_ranges(vec![Range::new(
            Position::new(start, 0),
            Position::new(end, 0),
        )]);
    }

    pub fn set_visible_ranges(&self, ranges: Vec<Range>) {
        self.state().visible = Some(ranges);
    }

    /// Tell the language service the document is gone
    pub fn close(&self) {
        let file_name = self.state().document.file_name.clone();
        self.host.close_document(&file_name);
    }
}

impl TextEditor for SimulatedEditor {
    fn id(&self) -> EditorId {
        self.id
    }

    fn document(&self) -> DocumentSnapshot {
        self.state().document.clone()
    }

    fn version(&self) -> i32 {
        self.state().document.version
    }

    fn visible_ranges(&self) -> Vec<Range> {
        let state = self.state();
        match &state.visible {
            Some(ranges) => ranges.clone(),
            None => {
                let text = &state.document.text;
                let index = LineIndex::new(text);
                vec![index.range_of(0, text.len())]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_bump_the_version() {
        let host = Arc::new(InProcessHost::semantic());
        let editor = SimulatedEditor::open(EditorId(1), host, "/src/a.ts", "typescript", "a");
        assert_eq!(editor.version(), 1);
        editor.set_text("ab");
        editor.set_text("abc");
        assert_eq!(editor.version(), 3);
        assert_eq!(&*editor.document().text, "abc");
        assert_eq!(editor.document().uri, "file:///src/a.ts");
    }

    #[test]
    fn whole_document_is_visible_until_scrolled() {
        let host = Arc::new(InProcessHost::semantic());
        let editor =
            SimulatedEditor::open(EditorId(1), host, "/src/a.ts", "typescript", "one\ntwo\nthree");
        assert_eq!(
            editor.visible_ranges(),
            vec![Range::new(Position::new(0, 0), Position::new(2, 5))]
        );

        editor.scroll_to_lines(1, 2);
        assert_eq!(
            editor.visible_ranges(),
            vec![Range::new(Position::new(1, 0), Position::new(2, 0))]
        );
    }

    #[test]
    fn text_is_synced_into_the_language_service() {
        let host = Arc::new(InProcessHost::semantic());
        let editor = SimulatedEditor::open(EditorId(1), host.clone(), "/src/a.ts", "typescript", "1");
        editor.set_text("const b = 2;");
        let program = host.session().project().program();
        assert_eq!(program.source_file("/src/a.ts").unwrap().text(), "const b = 2;");

        editor.close();
        assert!(host.session().project().program().source_file("/src/a.ts").is_none());
    }
}
