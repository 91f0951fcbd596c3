//! Language-service side of jsdoc-deco.
//!
//! A small TypeScript project service built on oxc, the const-object
//! documentation plugin that wraps it, and a tsserver-style session that
//! editors talk to.

pub mod checker;
pub mod jsdoc;
pub mod lib_dts;
pub mod plugin;
pub mod service;
pub mod session;
pub mod source_file;

pub use plugin::{init, ConstDocLanguageService, PluginCreateInfo, PluginFactory, TypeScriptModule};
pub use service::{LanguageService, Program, Project, QuickInfo, TsLanguageService};
pub use session::{ServerMode, TsServerSession};
