//! tsserver-style command session.
//!
//! Requests are `(command, arguments)` pairs; replies are JSON envelopes
//! `{ seq, type, command, request_seq, success, body | message }`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use jsdoc_deco_core::codec::{Documentation, QuickInfoBody};
use jsdoc_deco_core::lsp_types::Position;
use jsdoc_deco_core::LineIndex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::plugin::{init, PluginCreateInfo, TypeScriptModule};
use crate::service::{LanguageService, Project, TsLanguageService};

/// Which language service the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// Full project service with plugins loaded
    #[default]
    Semantic,
    /// Syntax-only service: no plugins, no type information
    Syntax,
}

impl ServerMode {
    /// Mode selected by the host's `useSyntaxServer` setting value
    pub fn from_setting(value: &str) -> Self {
        match value {
            "never" => Self::Semantic,
            _ => Self::Syntax,
        }
    }
}

#[derive(Deserialize)]
struct FileArgs {
    file: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenArgs {
    file: String,
    file_content: Option<String>,
}

/// Either a byte offset or a 1-based line/offset pair.
#[derive(Deserialize)]
struct LocationArgs {
    file: String,
    position: Option<usize>,
    line: Option<u32>,
    offset: Option<u32>,
}

pub struct TsServerSession {
    mode: ServerMode,
    project: Arc<Project>,
    service: Arc<dyn LanguageService>,
    seq: AtomicU64,
}

impl TsServerSession {
    pub fn new(mode: ServerMode) -> Self {
        let project = Arc::new(Project::new());
        let base: Arc<dyn LanguageService> = Arc::new(TsLanguageService::new(project.clone()));
        let service = match mode {
            ServerMode::Semantic => init(&TypeScriptModule).create(PluginCreateInfo {
                language_service: base,
                project_name: "/dev/null/inferredProject1*".to_string(),
            }),
            ServerMode::Syntax => base,
        };
        tracing::info!("Started language service session in {:?} mode", mode);
        Self {
            mode,
            project,
            service,
            seq: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> ServerMode {
        self.mode
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// Handle one request and wrap the outcome in a response envelope.
    pub fn handle_request(&self, command: &str, arguments: &Value) -> Value {
        let request_seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut reply = json!({
            "seq": 0,
            "type": "response",
            "command": command,
            "request_seq": request_seq,
        });

        match self.dispatch(command, arguments) {
            Ok(body) => {
                reply["success"] = Value::Bool(true);
                if let Some(body) = body {
                    reply["body"] = body;
                }
            }
            Err(e) => {
                tracing::debug!("Request {} failed: {:#}", command, e);
                reply["success"] = Value::Bool(false);
                reply["message"] = Value::String(format!("{:#}", e));
            }
        }
        reply
    }

    fn dispatch(&self, command: &str, arguments: &Value) -> Result<Option<Value>> {
        match command {
            "open" => {
                let args: OpenArgs = parse_args(command, arguments)?;
                let text = match args.file_content {
                    Some(text) => text,
                    None => std::fs::read_to_string(&args.file)
                        .with_context(|| format!("Failed to read {}", args.file))?,
                };
                self.project.open_file(&args.file, &text);
                Ok(None)
            }
            "change" => {
                let args: OpenArgs = parse_args(command, arguments)?;
                let text = args
                    .file_content
                    .ok_or_else(|| anyhow!("change requires the full fileContent"))?;
                self.project.update_file(&args.file, &text);
                Ok(None)
            }
            "close" => {
                let args: FileArgs = parse_args(command, arguments)?;
                self.project.close_file(&args.file);
                Ok(None)
            }
            "quickinfo" => {
                if self.mode == ServerMode::Syntax {
                    bail!("Request quickinfo not allowed in syntax-only mode");
                }
                let args: LocationArgs = parse_args(command, arguments)?;
                let position = self.resolve_position(&args)?;
                let info = self
                    .service
                    .quick_info_at_position(&args.file, position)
                    .ok_or_else(|| anyhow!("No content available."))?;

                let display_string: String =
                    info.display_parts.iter().map(|p| p.text.as_str()).collect();
                let documentation: String = info
                    .documentation
                    .unwrap_or_default()
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect();
                let body = QuickInfoBody {
                    kind: info.kind,
                    kind_modifiers: info.kind_modifiers,
                    display_string,
                    documentation: Some(Documentation::Text(documentation)),
                    tags: info.tags,
                };
                Ok(Some(serde_json::to_value(body)?))
            }
            "definition" => {
                let args: LocationArgs = parse_args(command, arguments)?;
                let position = self.resolve_position(&args)?;
                let definitions = self.service.definition_at_position(&args.file, position);
                Ok(Some(serde_json::to_value(definitions)?))
            }
            "syntacticDiagnosticsSync" => {
                let args: FileArgs = parse_args(command, arguments)?;
                let diagnostics = self.service.syntactic_diagnostics(&args.file);
                Ok(Some(serde_json::to_value(diagnostics)?))
            }
            other => bail!("Unrecognized JSON command: {}", other),
        }
    }

    fn resolve_position(&self, args: &LocationArgs) -> Result<usize> {
        if let Some(position) = args.position {
            return Ok(position);
        }
        let (Some(line), Some(offset)) = (args.line, args.offset) else {
            bail!("Expected either position or line and offset");
        };
        let program = self.project.program();
        let file = program
            .source_file(&args.file)
            .ok_or_else(|| anyhow!("No project for file {}", args.file))?;
        let index = LineIndex::new(file.text());
        Ok(index.offset_at(Position::new(
            line.saturating_sub(1),
            offset.saturating_sub(1),
        )))
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(command: &str, arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone())
        .with_context(|| format!("Invalid arguments for {}", command))
}
