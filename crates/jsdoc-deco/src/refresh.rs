//! Refresh pipeline
//!
//! A refresh scans the document, fetches documentation for visible accesses
//! with no entry from the current document version, prunes the cache and hands the complete
//! decoration set to the sink. Every refresh carries a [`RefreshToken`];
//! results from a refresh whose token is no longer current are dropped
//! without touching the cache or the sink.
//!
//! Refreshes are debounced: [`RefreshController::schedule`] replaces any
//! timer that has not fired yet. A refresh that has already started is never
//! aborted, it just goes stale.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use jsdoc_deco_core::codec::QuickInfoRequest;
use jsdoc_deco_core::PropertyAccess;
use jsdoc_deco_languages::scan_property_accesses;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::cache::CacheStore;
use crate::channel::DocumentationChannel;
use crate::config::DecoConfig;
use crate::decoration::{DecorationOptions, DecorationSink};
use crate::host::{DocumentSnapshot, TextEditor};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identifies one refresh and the document version it started from.
#[derive(Clone)]
pub struct RefreshToken {
    id: u64,
    version: i32,
    latest: Arc<AtomicU64>,
    editor: Arc<dyn TextEditor>,
}

impl RefreshToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// No newer refresh has started and the document is unchanged
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id && self.editor.version() == self.version
    }
}

/// How a refresh ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Language not enabled; decorations cleared
    Unsupported,
    /// No property accesses in the document
    Empty,
    /// Superseded before it could render
    Stale,
    /// This many decorations applied
    Rendered(usize),
    /// Accesses found but none documented; decorations cleared
    Cleared,
}

#[derive(Debug, Clone)]
struct FetchTask {
    offset: usize,
    name: String,
}

/// Keeps the activity count up while a scheduled refresh is pending or
/// running.
struct ActivityGuard {
    activity: Arc<watch::Sender<usize>>,
}

impl ActivityGuard {
    fn new(activity: Arc<watch::Sender<usize>>) -> Self {
        activity.send_modify(|count| *count += 1);
        Self { activity }
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

struct Inner {
    config: DecoConfig,
    channel: Arc<dyn DocumentationChannel>,
    sink: Arc<dyn DecorationSink>,
    caches: Mutex<CacheStore>,
    latest: Arc<AtomicU64>,
    /// Debounce timer that has not fired yet
    pending: Mutex<Option<JoinHandle<()>>>,
    activity: Arc<watch::Sender<usize>>,
}

impl Inner {
    /// Work through the shared queue until it is empty or the refresh
    /// goes stale
    async fn drain(
        &self,
        queue: &Mutex<VecDeque<FetchTask>>,
        token: &RefreshToken,
        document: &DocumentSnapshot,
    ) {
        loop {
            let next = lock(queue).pop_front();
            let Some(task) = next else {
                break;
            };
            if !token.is_current() {
                tracing::debug!("Refresh {} went stale, dropping queued fetches", token.id);
                break;
            }

            let request = QuickInfoRequest::new(&document.file_name, task.offset);
            let result = self.channel.fetch(request).await;

            if !token.is_current() {
                tracing::debug!(
                    "Discarding documentation for {}@{} from stale refresh {}",
                    task.name,
                    task.offset,
                    token.id
                );
                break;
            }
            self.record(document, task, result);
        }
    }

    fn record(&self, document: &DocumentSnapshot, task: FetchTask, result: Result<Option<String>>) {
        let mut caches = lock(&self.caches);
        let cache = caches.document_mut(&document.uri, document.version);
        match result {
            Ok(Some(text)) => {
                tracing::debug!("Cached documentation for {} at {}", task.name, task.offset);
                cache.insert(task.offset, task.name, text);
            }
            Ok(None) => {
                cache.remove(task.offset);
            }
            Err(err) => {
                tracing::debug!("No documentation for {}: {:#}", task.name, err);
                cache.remove(task.offset);
            }
        }
    }

    /// Drop entries for accesses that no longer exist and build the
    /// decorations for those that have documentation
    fn reconcile(
        &self,
        document: &DocumentSnapshot,
        accesses: &[PropertyAccess],
    ) -> Vec<DecorationOptions> {
        let live: HashSet<usize> = accesses.iter().map(|access| access.offset).collect();
        let mut caches = lock(&self.caches);
        let cache = caches.document_mut(&document.uri, document.version);
        cache.retain_offsets(|offset| live.contains(&offset));

        accesses
            .iter()
            .filter_map(|access| {
                cache.lookup(access.offset, &access.right).map(|text| {
                    DecorationOptions::after(access.range, text, &self.config.decoration)
                })
            })
            .collect()
    }
}

/// Owns the debounce timer, the request counter and the cache for one
/// activation.
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<Inner>,
}

impl RefreshController {
    pub fn new(
        config: DecoConfig,
        channel: Arc<dyn DocumentationChannel>,
        sink: Arc<dyn DecorationSink>,
    ) -> Self {
        let (activity, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                config,
                channel,
                sink,
                caches: Mutex::new(CacheStore::new()),
                latest: Arc::new(AtomicU64::new(0)),
                pending: Mutex::new(None),
                activity: Arc::new(activity),
            }),
        }
    }

    pub fn config(&self) -> &DecoConfig {
        &self.inner.config
    }

    /// Refresh `editor` once `delay` has passed without another call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, editor: Arc<dyn TextEditor>, delay: Duration) {
        let language_id = editor.document().language_id;
        if self.inner.config.dialect_for(&language_id).is_none() {
            self.inner.sink.clear(editor.id());
            return;
        }

        let guard = ActivityGuard::new(Arc::clone(&self.inner.activity));
        let controller = self.clone();
        let timer = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            // detach so that a later schedule cannot abort a running refresh
            tokio::spawn(async move {
                let _guard = guard;
                controller.refresh_now(editor).await;
            });
        });

        if let Some(previous) = lock(&self.inner.pending).replace(timer) {
            previous.abort();
        }
    }

    /// Run one refresh of `editor` to completion.
    pub async fn refresh_now(&self, editor: Arc<dyn TextEditor>) -> RefreshOutcome {
        let inner = &self.inner;
        let document = editor.document();
        let editor_id = editor.id();

        let Some(dialect) = inner.config.dialect_for(&document.language_id) else {
            inner.sink.clear(editor_id);
            return RefreshOutcome::Unsupported;
        };

        let id = inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let token = RefreshToken {
            id,
            version: document.version,
            latest: Arc::clone(&inner.latest),
            editor: Arc::clone(&editor),
        };

        let accesses = scan_property_accesses(&document.text, dialect);
        tracing::debug!(
            "Refresh {} of {} v{}: {} accesses",
            id,
            document.uri,
            document.version,
            accesses.len()
        );
        if accesses.is_empty() {
            if !token.is_current() {
                return RefreshOutcome::Stale;
            }
            inner.reconcile(&document, &accesses);
            inner.sink.clear(editor_id);
            return RefreshOutcome::Empty;
        }

        let visible = editor.visible_ranges();
        let tasks: VecDeque<FetchTask> = {
            let mut caches = lock(&inner.caches);
            let cache = caches.document_mut(&document.uri, document.version);
            accesses
                .iter()
                .filter(|access| visible.iter().any(|range| access.overlaps(range)))
                .filter(|access| !cache.is_fresh(access.offset, &access.right))
                .map(|access| FetchTask {
                    offset: access.offset,
                    name: access.right.clone(),
                })
                .collect()
        };

        if !tasks.is_empty() {
            let workers = inner.config.worker_count().min(tasks.len());
            tracing::debug!("Refresh {}: {} fetches on {} workers", id, tasks.len(), workers);

            let queue = Arc::new(Mutex::new(tasks));
            let document = Arc::new(document.clone());
            let mut set = JoinSet::new();
            for _ in 0..workers {
                let inner = Arc::clone(inner);
                let queue = Arc::clone(&queue);
                let token = token.clone();
                let document = Arc::clone(&document);
                set.spawn(async move { inner.drain(&queue, &token, &document).await });
            }
            while let Some(joined) = set.join_next().await {
                if let Err(err) = joined {
                    tracing::warn!("Documentation worker failed: {}", err);
                }
            }
        }

        if !token.is_current() {
            tracing::debug!("Refresh {} is stale, not rendering", id);
            return RefreshOutcome::Stale;
        }

        let decorations = inner.reconcile(&document, &accesses);
        if decorations.is_empty() {
            inner.sink.clear(editor_id);
            RefreshOutcome::Cleared
        } else {
            let count = decorations.len();
            inner.sink.apply(editor_id, decorations);
            RefreshOutcome::Rendered(count)
        }
    }

    /// Wait until no scheduled refresh is pending or running
    pub async fn settled(&self) {
        let mut activity = self.inner.activity.subscribe();
        let _ = activity.wait_for(|count| *count == 0).await;
    }

    /// Abort the debounce timer, if it has not fired
    pub fn cancel_pending(&self) {
        if let Some(pending) = lock(&self.inner.pending).take() {
            pending.abort();
        }
    }

    /// Forget the cache for a closed document
    pub fn release_document(&self, uri: &str) {
        if lock(&self.inner.caches).release(uri) {
            tracing::debug!("Released documentation cache for {}", uri);
        }
    }

    /// Offsets with a cached entry for `uri`, ascending
    pub fn cached_offsets(&self, uri: &str) -> Vec<usize> {
        lock(&self.inner.caches)
            .get(uri)
            .map(|cache| cache.offsets())
            .unwrap_or_default()
    }

    /// Id of the most recently started refresh, 0 before the first
    pub fn latest_request_id(&self) -> u64 {
        self.inner.latest.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::VirtualTextSink;
    use crate::host::EditorId;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use jsdoc_deco_core::lsp_types::{Position, Range};
    use jsdoc_deco_core::LineIndex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    struct StaticEditor {
        document: Mutex<DocumentSnapshot>,
    }

    impl StaticEditor {
        fn new(language_id: &str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                document: Mutex::new(DocumentSnapshot {
                    uri: "file:///src/a.ts".to_string(),
                    file_name: "/src/a.ts".to_string(),
                    language_id: language_id.to_string(),
                    version: 1,
                    text: Arc::from(text),
                }),
            })
        }

        fn bump(&self) {
            lock(&self.document).version += 1;
        }
    }

    impl TextEditor for StaticEditor {
        fn id(&self) -> EditorId {
            EditorId(1)
        }

        fn document(&self) -> DocumentSnapshot {
            lock(&self.document).clone()
        }

        fn visible_ranges(&self) -> Vec<Range> {
            let document = self.document();
            vec![LineIndex::new(&document.text).range_of(0, document.text.len())]
        }
    }

    /// Answers by member offset; unknown offsets fail
    #[derive(Default)]
    struct ScriptedChannel {
        answers: HashMap<usize, Option<String>>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DocumentationChannel for ScriptedChannel {
        async fn fetch(&self, request: QuickInfoRequest) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.answers
                .get(&(request.position as usize))
                .cloned()
                .ok_or_else(|| anyhow!("no route to language service"))
        }
    }

    fn controller(
        channel: Arc<ScriptedChannel>,
        sink: Arc<VirtualTextSink>,
        config: DecoConfig,
    ) -> RefreshController {
        RefreshController::new(config, channel, sink)
    }

    fn member_offset(text: &str, access: &str) -> usize {
        text.find(access).unwrap() + access.find('.').unwrap() + 1
    }

    #[tokio::test]
    async fn unsupported_language_clears_without_fetching() {
        let channel = Arc::new(ScriptedChannel::default());
        let sink = Arc::new(VirtualTextSink::new());
        let controller = controller(channel.clone(), sink.clone(), DecoConfig::default());

        let editor = StaticEditor::new("javascript", "a.x");
        let outcome = controller.refresh_now(editor).await;
        assert_eq!(outcome, RefreshOutcome::Unsupported);
        assert_eq!(channel.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.latest_request_id(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_entry() {
        let text = "a.x; a.y";
        let mut answers = HashMap::new();
        answers.insert(member_offset(text, "a.x"), Some("doc".to_string()));
        let channel = Arc::new(ScriptedChannel {
            answers,
            ..Default::default()
        });
        let sink = Arc::new(VirtualTextSink::new());
        let controller = controller(channel.clone(), sink.clone(), DecoConfig::default());

        let outcome = controller.refresh_now(StaticEditor::new("typescript", text)).await;
        assert_eq!(outcome, RefreshOutcome::Rendered(1));
        assert_eq!(
            controller.cached_offsets("file:///src/a.ts"),
            vec![member_offset(text, "a.x")]
        );
        let shown = sink.decorations(EditorId(1));
        assert_eq!(shown[0].after.content_text, "doc");
        assert_eq!(
            shown[0].range,
            Range::new(Position::new(0, 0), Position::new(0, 3))
        );
    }

    #[tokio::test]
    async fn nothing_documented_clears() {
        let channel = Arc::new(ScriptedChannel::default());
        let sink = Arc::new(VirtualTextSink::new());
        let controller = controller(channel.clone(), sink.clone(), DecoConfig::default());

        let outcome = controller.refresh_now(StaticEditor::new("typescript", "a.x")).await;
        assert_eq!(outcome, RefreshOutcome::Cleared);
        assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_pool_bounds_fetches_in_flight() {
        let text = "a.b; a.c; a.d; a.e; a.f; a.g";
        let channel = Arc::new(ScriptedChannel {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let sink = Arc::new(VirtualTextSink::new());
        let config = DecoConfig {
            max_concurrent_requests: 2,
            ..DecoConfig::default()
        };
        let controller = controller(channel.clone(), sink, config);

        controller.refresh_now(StaticEditor::new("typescript", text)).await;
        assert_eq!(channel.calls.load(Ordering::SeqCst), 6);
        assert_eq!(channel.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn version_change_mid_fetch_makes_the_refresh_stale() {
        let text = "a.x";
        let mut answers = HashMap::new();
        answers.insert(member_offset(text, "a.x"), Some("doc".to_string()));
        let channel = Arc::new(ScriptedChannel {
            answers,
            delay: Duration::from_millis(100),
            ..Default::default()
        });
        let sink = Arc::new(VirtualTextSink::new());
        let controller = controller(channel, sink.clone(), DecoConfig::default());

        let editor = StaticEditor::new("typescript", text);
        let refresh = tokio::spawn({
            let controller = controller.clone();
            let editor: Arc<dyn TextEditor> = editor.clone();
            async move { controller.refresh_now(editor).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        editor.bump();

        assert_eq!(refresh.await.unwrap(), RefreshOutcome::Stale);
        assert!(sink.decorations(EditorId(1)).is_empty());
        assert!(controller.cached_offsets("file:///src/a.ts").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_debounces_and_settles() {
        let channel = Arc::new(ScriptedChannel::default());
        let sink = Arc::new(VirtualTextSink::new());
        let controller = controller(channel, sink, DecoConfig::default());

        let editor: Arc<dyn TextEditor> = StaticEditor::new("typescript", "a.x");
        for _ in 0..5 {
            controller.schedule(Arc::clone(&editor), Duration::from_millis(150));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        controller.settled().await;
        assert_eq!(controller.latest_request_id(), 1);
    }

    #[tokio::test]
    async fn release_drops_the_document_cache() {
        let text = "a.x";
        let mut answers = HashMap::new();
        answers.insert(member_offset(text, "a.x"), Some("doc".to_string()));
        let channel = Arc::new(ScriptedChannel {
            answers,
            ..Default::default()
        });
        let controller = controller(channel, Arc::new(VirtualTextSink::new()), DecoConfig::default());

        controller.refresh_now(StaticEditor::new("typescript", text)).await;
        assert_eq!(controller.cached_offsets("file:///src/a.ts").len(), 1);
        controller.release_document("file:///src/a.ts");
        assert!(controller.cached_offsets("file:///src/a.ts").is_empty());
    }
}
