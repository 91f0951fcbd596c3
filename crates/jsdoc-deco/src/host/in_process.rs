//! Host backed by an in-process language service session.
//!
//! Plays the part of the editor process: it owns the language service,
//! forwards `typescript.tsserverRequest`, rebuilds the session when asked
//! to restart, and keeps configuration and warnings in memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use jsdoc_deco_core::codec::QUICKINFO_COMMAND;
use jsdoc_deco_tsserver::{ServerMode, TsServerSession};
use serde_json::{json, Value};

use super::{
    DocumentSnapshot, EditorHost, RESTART_TSSERVER_COMMAND, TSSERVER_REQUEST_COMMAND,
    USE_SYNTAX_SERVER_SETTING,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct InProcessHost {
    session: RwLock<Arc<TsServerSession>>,
    configuration: Mutex<HashMap<String, Value>>,
    /// Keys the host refuses to change
    locked_keys: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    /// Delay between answering a forwarded request and delivering the reply
    latency: Duration,
    quickinfo_requests: AtomicUsize,
    restarts: AtomicUsize,
}

impl Default for InProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessHost {
    /// A host in the editor's default state: `useSyntaxServer` is `auto`,
    /// so the language service starts without plugins.
    pub fn new() -> Self {
        let mut configuration = HashMap::new();
        configuration.insert(USE_SYNTAX_SERVER_SETTING.to_string(), json!("auto"));
        Self {
            session: RwLock::new(Arc::new(TsServerSession::new(ServerMode::from_setting(
                "auto",
            )))),
            configuration: Mutex::new(configuration),
            locked_keys: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            quickinfo_requests: AtomicUsize::new(0),
            restarts: AtomicUsize::new(0),
        }
    }

    /// A host whose language service already runs in semantic mode
    pub fn semantic() -> Self {
        let host = Self::new();
        lock(&host.configuration).insert(USE_SYNTAX_SERVER_SETTING.to_string(), json!("never"));
        host.replace_session(ServerMode::Semantic);
        host
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Refuse future updates of `key`, as a workspace with a policy-managed
    /// setting would
    pub fn lock_configuration(&self, key: &str) {
        lock(&self.locked_keys).push(key.to_string());
    }

    pub fn session(&self) -> Arc<TsServerSession> {
        match self.session.read() {
            Ok(session) => Arc::clone(&session),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    pub fn quickinfo_requests(&self) -> usize {
        self.quickinfo_requests.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Push a document's current text into the language service
    pub fn sync_document(&self, document: &DocumentSnapshot, opened: bool) {
        let command = if opened { "change" } else { "open" };
        let reply = self.session().handle_request(
            command,
            &json!({ "file": document.file_name, "fileContent": &*document.text }),
        );
        if reply["success"] != Value::Bool(true) {
            tracing::warn!("Failed to sync {}: {}", document.file_name, reply["message"]);
        }
    }

    pub fn close_document(&self, file_name: &str) {
        self.session()
            .handle_request("close", &json!({ "file": file_name }));
    }

    fn replace_session(&self, mode: ServerMode) {
        let next = Arc::new(TsServerSession::new(mode));
        let mut session = match self.session.write() {
            Ok(session) => session,
            Err(poisoned) => poisoned.into_inner(),
        };
        // reopen what the old session had open
        let program = session.project().program();
        for file_name in program.root_file_names() {
            if let Some(file) = program.source_file(file_name) {
                next.project().open_file(file_name, file.text());
            }
        }
        *session = next;
    }

    fn restart(&self) {
        let setting = self
            .get_configuration(USE_SYNTAX_SERVER_SETTING)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        let mode = ServerMode::from_setting(&setting);
        tracing::info!("Restarting language service in {:?} mode", mode);
        self.replace_session(mode);
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EditorHost for InProcessHost {
    async fn execute_command(&self, command: &str, args: Vec<Value>) -> Result<Value> {
        match command {
            TSSERVER_REQUEST_COMMAND => {
                let mut args = args.into_iter();
                let request = args
                    .next()
                    .and_then(|value| value.as_str().map(str::to_string))
                    .ok_or_else(|| anyhow!("{} needs a request name", command))?;
                let payload = args.next().unwrap_or(Value::Null);
                if request == QUICKINFO_COMMAND {
                    self.quickinfo_requests.fetch_add(1, Ordering::SeqCst);
                }
                // answered against the text as it is now, delivered later
                let reply = self.session().handle_request(&request, &payload);
                if !self.latency.is_zero() {
                    tokio::time::sleep(self.latency).await;
                }
                Ok(reply)
            }
            RESTART_TSSERVER_COMMAND => {
                self.restart();
                Ok(Value::Null)
            }
            other => bail!("command '{}' not found", other),
        }
    }

    fn get_configuration(&self, key: &str) -> Option<Value> {
        lock(&self.configuration).get(key).cloned()
    }

    async fn update_configuration(&self, key: &str, value: Value) -> Result<()> {
        if lock(&self.locked_keys).iter().any(|locked| locked == key) {
            bail!("Unable to write {}: setting is managed by policy", key);
        }
        lock(&self.configuration).insert(key.to_string(), value);
        Ok(())
    }

    fn show_warning_message(&self, message: &str) {
        tracing::warn!("{}", message);
        lock(&self.warnings).push(message.to_string());
    }
}
