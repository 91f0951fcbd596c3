use std::path::Path;

// Re-export tree-sitter crates for use by the editor-side crates
pub use tree_sitter;
pub use tree_sitter_typescript;

pub mod scanner;

pub use scanner::scan_property_accesses;

/// Script dialect a document is parsed as.
///
/// Only the two TypeScript flavours are supported; every other language id
/// is rejected before any work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Plain TypeScript (`typescript`)
    TypeScript,
    /// TypeScript with JSX markup (`typescriptreact`)
    Tsx,
}

impl Dialect {
    /// Map an editor language id to a dialect
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        match language_id {
            "typescript" => Some(Self::TypeScript),
            "typescriptreact" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Detect dialect from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// The editor language id for this dialect
    pub fn language_id(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "typescriptreact",
        }
    }

    /// Tree-sitter grammar for this dialect
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.language_id())
    }
}
