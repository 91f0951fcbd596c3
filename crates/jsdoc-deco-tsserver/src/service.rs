//! The language service and the project it serves.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsdoc_deco_core::codec::{DisplayPart, JsDocTagInfo};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::checker::TypeChecker;
use crate::lib_dts::{LIB_ES5_D_TS, LIB_FILE_NAME};
use crate::source_file::{SourceFile, SourceSpan, SyntaxDiagnostic};

static LIB_FILE: Lazy<Arc<SourceFile>> =
    Lazy::new(|| Arc::new(SourceFile::parse(LIB_FILE_NAME, LIB_ES5_D_TS)));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl From<SourceSpan> for TextSpan {
    fn from(span: SourceSpan) -> Self {
        Self {
            start: span.start,
            length: span.len(),
        }
    }
}

/// Hover information for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfo {
    pub kind: String,
    pub kind_modifiers: String,
    pub text_span: TextSpan,
    pub display_parts: Vec<DisplayPart>,
    pub documentation: Option<Vec<DisplayPart>>,
    pub tags: Vec<JsDocTagInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionInfo {
    pub file_name: String,
    pub text_span: TextSpan,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub start: usize,
    pub length: usize,
    pub message: String,
    pub category: String,
}

impl From<&SyntaxDiagnostic> for Diagnostic {
    fn from(diagnostic: &SyntaxDiagnostic) -> Self {
        Self {
            start: diagnostic.start,
            length: diagnostic.length,
            message: diagnostic.message.clone(),
            category: "error".to_string(),
        }
    }
}

/// Operations a language service exposes to its host.
///
/// Plugins wrap a service by implementing this trait and delegating the
/// operations they do not change.
pub trait LanguageService: Send + Sync {
    fn quick_info_at_position(&self, file_name: &str, position: usize) -> Option<QuickInfo>;

    fn definition_at_position(&self, file_name: &str, position: usize) -> Vec<DefinitionInfo>;

    fn syntactic_diagnostics(&self, file_name: &str) -> Vec<Diagnostic>;

    /// Snapshot of the current program, if one can be built
    fn program(&self) -> Option<Program>;
}

/// Immutable snapshot of the project's files plus the library.
#[derive(Debug, Clone)]
pub struct Program {
    files: Arc<HashMap<String, Arc<SourceFile>>>,
    lib: Arc<SourceFile>,
}

impl Program {
    pub fn source_file(&self, file_name: &str) -> Option<&SourceFile> {
        if file_name == self.lib.file_name() {
            return Some(&self.lib);
        }
        self.files.get(file_name).map(Arc::as_ref)
    }

    pub fn lib(&self) -> &SourceFile {
        &self.lib
    }

    pub fn root_file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn type_checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(self)
    }
}

/// The set of open files. Each update reparses the file and publishes a
/// new program snapshot.
#[derive(Debug, Default)]
pub struct Project {
    files: RwLock<Arc<HashMap<String, Arc<SourceFile>>>>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_file(&self, file_name: &str, text: &str) {
        self.set_file(file_name, text);
    }

    pub fn update_file(&self, file_name: &str, text: &str) {
        self.set_file(file_name, text);
    }

    pub fn close_file(&self, file_name: &str) -> bool {
        let mut files = match self.files.write() {
            Ok(files) => files,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !files.contains_key(file_name) {
            return false;
        }
        let mut next = files.as_ref().clone();
        next.remove(file_name);
        *files = Arc::new(next);
        true
    }

    pub fn program(&self) -> Program {
        let files = match self.files.read() {
            Ok(files) => Arc::clone(&files),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        };
        Program {
            files,
            lib: Arc::clone(&LIB_FILE),
        }
    }

    fn set_file(&self, file_name: &str, text: &str) {
        let parsed = Arc::new(SourceFile::parse(file_name, text));
        tracing::debug!(
            "Indexed {} ({} bytes, {} syntax errors)",
            file_name,
            text.len(),
            parsed.diagnostics().len()
        );
        let mut files = match self.files.write() {
            Ok(files) => files,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = files.as_ref().clone();
        next.insert(file_name.to_string(), parsed);
        *files = Arc::new(next);
    }
}

/// The plain language service, without plugins.
pub struct TsLanguageService {
    project: Arc<Project>,
}

impl TsLanguageService {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }
}

impl LanguageService for TsLanguageService {
    fn quick_info_at_position(&self, file_name: &str, position: usize) -> Option<QuickInfo> {
        let program = self.project.program();
        let file = program.source_file(file_name)?;
        let token = file.node_at_position(position)?;
        let symbol = program.type_checker().symbol_at_location(file, token)?;
        let declaration = symbol.declarations.first()?;

        Some(QuickInfo {
            kind: declaration.kind().to_string(),
            kind_modifiers: if declaration.is_from_library() {
                "declare".to_string()
            } else {
                String::new()
            },
            text_span: token.span.into(),
            display_parts: vec![DisplayPart::text(declaration.display.clone())],
            documentation: Some(symbol.documentation_comment()),
            tags: symbol.js_doc_tags(),
        })
    }

    fn definition_at_position(&self, file_name: &str, position: usize) -> Vec<DefinitionInfo> {
        let program = self.project.program();
        let Some(file) = program.source_file(file_name) else {
            return Vec::new();
        };
        let Some(token) = file.node_at_position(position) else {
            return Vec::new();
        };
        let Some(symbol) = program.type_checker().symbol_at_location(file, token) else {
            return Vec::new();
        };
        symbol
            .declarations
            .iter()
            .map(|declaration| DefinitionInfo {
                file_name: declaration.file_name.clone(),
                text_span: declaration.name_span.into(),
                kind: declaration.kind().to_string(),
                name: symbol.name.clone(),
            })
            .collect()
    }

    fn syntactic_diagnostics(&self, file_name: &str) -> Vec<Diagnostic> {
        let program = self.project.program();
        program
            .source_file(file_name)
            .map(|file| file.diagnostics().iter().map(Diagnostic::from).collect())
            .unwrap_or_default()
    }

    fn program(&self) -> Option<Program> {
        Some(self.project.program())
    }
}
