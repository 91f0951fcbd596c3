//! Tracing subscriber setup
//!
//! Shared between the CLI and tests.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber, logging to `log_file_path`.
///
/// Filtering follows RUST_LOG with DEBUG as the default level. Returns None
/// if the file cannot be created or a global subscriber is already set.
pub fn init_global(log_file_path: &Path) -> Option<()> {
    let log_file = File::create(log_file_path).ok()?;
    build_subscriber(log_file).try_init().ok()
}

/// Build a subscriber that writes formatted events to `log_file`.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into());

    let fmt_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn events_reach_the_log_file() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("Refresh 1 of file:///a.ts v1: 2 accesses");
            tracing::warn!("Semantic server not enforced");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("DEBUG"));
        assert!(contents.contains("2 accesses"));
        assert!(contents.contains("WARN"));
    }

    #[test]
    fn init_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_global(&dir.path().join("missing").join("deco.log")).is_none());
    }
}
