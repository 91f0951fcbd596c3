//! Core types shared between the editor-side pipeline and the language
//! service side of jsdoc-deco.

use lsp_types::Range;
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod text;

pub use lsp_types;
pub use text::LineIndex;

/// One occurrence of `<left>.<right>` in a document.
///
/// Recomputed on every scan; the `offset` is only stable within a single
/// document version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAccess {
    /// Text of the base expression (diagnostics only)
    pub left: String,
    /// The accessed member name
    pub right: String,
    /// Span of the whole access expression, where the decoration is placed
    pub range: Range,
    /// Span of the member-name token
    pub name_range: Range,
    /// Byte offset of the member-name token start; used as the cache key and
    /// as the quick-info query position
    pub offset: usize,
}

impl PropertyAccess {
    /// Whether the access intersects `other`. Touching ranges count.
    pub fn overlaps(&self, other: &Range) -> bool {
        ranges_overlap(&self.range, other)
    }
}

/// Whether two LSP ranges share at least one position.
pub fn ranges_overlap(a: &Range, b: &Range) -> bool {
    a.start <= b.end && b.start <= a.end
}
