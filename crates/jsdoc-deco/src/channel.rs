//! Documentation channel: asks the language service for the override text
//! at one position.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jsdoc_deco_core::codec::{decode_override, QuickInfoRequest};

use crate::host::{EditorHost, TSSERVER_REQUEST_COMMAND};

#[async_trait]
pub trait DocumentationChannel: Send + Sync {
    /// Override documentation for the position in `request`.
    ///
    /// `Ok(None)` means the language service answered without override
    /// text. Transport failures are errors.
    async fn fetch(&self, request: QuickInfoRequest) -> Result<Option<String>>;
}

/// Channel that goes through the host's `typescript.tsserverRequest`
/// command.
pub struct TsServerChannel {
    host: Arc<dyn EditorHost>,
}

impl TsServerChannel {
    pub fn new(host: Arc<dyn EditorHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl DocumentationChannel for TsServerChannel {
    async fn fetch(&self, request: QuickInfoRequest) -> Result<Option<String>> {
        let reply = self
            .host
            .execute_command(TSSERVER_REQUEST_COMMAND, request.to_command_args())
            .await
            .with_context(|| {
                format!(
                    "quickinfo request for {}@{} failed",
                    request.file, request.position
                )
            })?;
        Ok(decode_override(&reply))
    }
}
