//! Language-service plugin that surfaces documentation of `const` object
//! literal properties through quick-info.
//!
//! The plugin wraps the project's language service. Every operation except
//! [`LanguageService::quick_info_at_position`] is forwarded untouched; quick
//! info for a qualifying member access has its documentation replaced by
//! the member's JSDoc text fenced with [`SENTINEL`] markers so the editor
//! side can tell it apart from ordinary documentation.
//!
//! [`SENTINEL`]: jsdoc_deco_core::codec::SENTINEL

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use jsdoc_deco_core::codec::{wrap_override, DisplayPart};
use jsdoc_deco_core::LineIndex;

use crate::lib_dts::is_library_path;
use crate::service::{DefinitionInfo, Diagnostic, LanguageService, Program, QuickInfo};

/// Handle to the host's TypeScript module, passed to [`init`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptModule;

impl TypeScriptModule {
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Whether a declaration file is part of the TypeScript library
    pub fn is_library_file(&self, file_name: &str) -> bool {
        is_library_path(file_name)
    }
}

/// Per-project information handed to [`PluginFactory::create`].
pub struct PluginCreateInfo {
    pub language_service: Arc<dyn LanguageService>,
    pub project_name: String,
}

pub struct PluginFactory {
    typescript: TypeScriptModule,
}

impl PluginFactory {
    /// Decorate the project's language service
    pub fn create(&self, info: PluginCreateInfo) -> Arc<dyn LanguageService> {
        tracing::info!(
            "Creating const-doc plugin for project {} (typescript {})",
            info.project_name,
            self.typescript.version()
        );
        Arc::new(ConstDocLanguageService {
            base: info.language_service,
            typescript: self.typescript,
        })
    }
}

/// Plugin entry point.
pub fn init(typescript: &TypeScriptModule) -> PluginFactory {
    PluginFactory {
        typescript: *typescript,
    }
}

/// Transparent proxy over a language service with quick-info intercepted.
pub struct ConstDocLanguageService {
    base: Arc<dyn LanguageService>,
    typescript: TypeScriptModule,
}

impl ConstDocLanguageService {
    /// Documentation text to put in place of the original, or `None` to
    /// leave the reply alone.
    fn documentation_override(&self, file_name: &str, position: usize) -> Option<String> {
        let program: Program = self.base.program()?;
        let file = program.source_file(file_name)?;
        let checker = program.type_checker();

        let node = file.node_at_position(position)?;
        let access = file.enclosing_property_access(node.span)?;
        if node.span != access.name_span {
            return None;
        }

        let symbol = checker.symbol_at_location(file, node)?;
        let declaration_files: Vec<&str> = symbol
            .declarations
            .iter()
            .map(|d| d.file_name.as_str())
            .collect();
        let at = LineIndex::new(file.text()).position_at(access.name_span.start);
        tracing::debug!(
            "quickinfo file={} pos={}:{} name={} decls={}",
            file_name,
            at.line + 1,
            at.character + 1,
            access.name,
            declaration_files.join(",")
        );

        let is_from_lib = declaration_files
            .iter()
            .any(|path| self.typescript.is_library_file(path));
        tracing::debug!("isFromLib={}", is_from_lib);
        if is_from_lib {
            return None;
        }

        let is_from_const_object = symbol
            .declarations
            .iter()
            .any(|d| d.is_const_object_literal_property());
        tracing::debug!("isFromConstObject={}", is_from_const_object);
        if !is_from_const_object {
            return None;
        }

        let text = symbol
            .documentation_comment()
            .iter()
            .map(|part| part.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.is_empty()).then_some(text)
    }
}

impl LanguageService for ConstDocLanguageService {
    fn quick_info_at_position(&self, file_name: &str, position: usize) -> Option<QuickInfo> {
        let mut quick_info = self.base.quick_info_at_position(file_name, position)?;

        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            self.documentation_override(file_name, position)
        }));
        match extracted {
            Ok(Some(text)) => {
                quick_info.documentation = Some(vec![DisplayPart::text(wrap_override(&text))]);
                Some(quick_info)
            }
            Ok(None) => Some(quick_info),
            Err(_) => {
                tracing::warn!(
                    "Documentation extraction panicked for {}@{}; suppressing reply",
                    file_name,
                    position
                );
                None
            }
        }
    }

    fn definition_at_position(&self, file_name: &str, position: usize) -> Vec<DefinitionInfo> {
        self.base.definition_at_position(file_name, position)
    }

    fn syntactic_diagnostics(&self, file_name: &str) -> Vec<Diagnostic> {
        self.base.syntactic_diagnostics(file_name)
    }

    fn program(&self) -> Option<Program> {
        self.base.program()
    }
}
