//! Inline documentation for property accesses on const object literals.
//!
//! The editor side scans TypeScript documents for `a.b` accesses, asks the
//! language service (through [`jsdoc_deco_tsserver`]'s plugin) for the JSDoc
//! of each visible member, and renders the text after the access.

pub mod activation;
pub mod cache;
pub mod channel;
pub mod config;
pub mod decoration;
pub mod host;
pub mod refresh;
pub mod services;

pub use activation::{ensure_semantic_server, Extension};
pub use config::{DecoConfig, DecorationStyle};
pub use decoration::{DecorationOptions, DecorationSink, VirtualTextSink};
pub use refresh::{RefreshController, RefreshOutcome, RefreshToken};
