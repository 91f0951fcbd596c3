//! Per-document documentation cache
//!
//! Entries are keyed by the byte offset of the member-name token. Offsets
//! move when text is inserted above them, so each entry also remembers the
//! member name it was fetched for and a lookup under a different name is a
//! miss.
//!
//! Entries also remember the document version they were fetched at. After
//! an edit they stay renderable, but only an entry from the current version
//! is fresh; anything older is fetched again once it is visible.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedDoc {
    name: String,
    text: String,
    version: i32,
}

/// Documentation fetched for one document
#[derive(Debug, Clone, Default)]
pub struct DocumentCache {
    /// Latest document version seen
    version: i32,
    entries: HashMap<usize, CachedDoc>,
}

impl DocumentCache {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            entries: HashMap::new(),
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Cached text for the member `name` at `offset`
    pub fn lookup(&self, offset: usize, name: &str) -> Option<&str> {
        self.entries
            .get(&offset)
            .filter(|doc| doc.name == name)
            .map(|doc| doc.text.as_str())
    }

    /// An entry for `name` at `offset` fetched at the current version
    pub fn is_fresh(&self, offset: usize, name: &str) -> bool {
        self.entries
            .get(&offset)
            .is_some_and(|doc| doc.name == name && doc.version == self.version)
    }

    pub fn insert(&mut self, offset: usize, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(
            offset,
            CachedDoc {
                name: name.into(),
                text: text.into(),
                version: self.version,
            },
        );
    }

    pub fn remove(&mut self, offset: usize) -> bool {
        self.entries.remove(&offset).is_some()
    }

    /// Drop every entry whose offset `keep` rejects
    pub fn retain_offsets(&mut self, mut keep: impl FnMut(usize) -> bool) {
        self.entries.retain(|offset, _| keep(*offset));
    }

    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets: Vec<usize> = self.entries.keys().copied().collect();
        offsets.sort_unstable();
        offsets
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caches for every document seen, keyed by URI.
#[derive(Debug, Default)]
pub struct CacheStore {
    documents: HashMap<String, DocumentCache>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `uri`, created on first use. A newer version is
    /// recorded; existing entries survive until pruned but are no longer
    /// fresh.
    pub fn document_mut(&mut self, uri: &str, version: i32) -> &mut DocumentCache {
        let cache = self
            .documents
            .entry(uri.to_string())
            .or_insert_with(|| DocumentCache::new(version));
        if cache.version != version {
            tracing::debug!(
                "Cache for {} moves from version {} to {}",
                uri,
                cache.version,
                version
            );
            cache.version = version;
        }
        cache
    }

    pub fn get(&self, uri: &str) -> Option<&DocumentCache> {
        self.documents.get(uri)
    }

    /// Forget everything cached for `uri`
    pub fn release(&mut self, uri: &str) -> bool {
        self.documents.remove(uri).is_some()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_requires_the_same_member_name() {
        let mut cache = DocumentCache::new(1);
        cache.insert(34, "x", "hello");
        assert_eq!(cache.lookup(34, "x"), Some("hello"));
        assert_eq!(cache.lookup(34, "y"), None);
        assert_eq!(cache.lookup(35, "x"), None);
    }

    #[test]
    fn retain_prunes_offsets() {
        let mut cache = DocumentCache::new(1);
        cache.insert(1, "a", "A");
        cache.insert(5, "b", "B");
        cache.insert(9, "c", "C");
        cache.retain_offsets(|offset| offset != 5);
        assert_eq!(cache.offsets(), vec![1, 9]);
    }

    #[test]
    fn new_version_keeps_entries_but_not_their_freshness() {
        let mut store = CacheStore::new();
        store.document_mut("file:///a.ts", 1).insert(3, "x", "doc");
        assert!(store.document_mut("file:///a.ts", 1).is_fresh(3, "x"));

        let cache = store.document_mut("file:///a.ts", 2);
        assert_eq!(cache.version(), 2);
        assert_eq!(cache.lookup(3, "x"), Some("doc"));
        assert!(!cache.is_fresh(3, "x"));

        cache.insert(3, "x", "doc again");
        assert!(cache.is_fresh(3, "x"));
        assert!(!cache.is_fresh(3, "y"));
    }

    #[test]
    fn release_forgets_the_document() {
        let mut store = CacheStore::new();
        store.document_mut("file:///a.ts", 1).insert(3, "x", "doc");
        store.document_mut("file:///b.ts", 1);

        assert!(store.release("file:///a.ts"));
        assert!(!store.release("file:///a.ts"));
        assert!(store.get("file:///a.ts").is_none());
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn remove_reports_whether_an_entry_existed() {
        let mut cache = DocumentCache::new(1);
        cache.insert(3, "x", "doc");
        assert!(cache.remove(3));
        assert!(!cache.remove(3));
        assert!(cache.is_empty());
    }

    mod prop {
        use super::super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        proptest! {
            #[test]
            fn pruning_keeps_exactly_the_live_offsets(
                cached in proptest::collection::btree_set(0usize..500, 0..40),
                live in proptest::collection::btree_set(0usize..500, 0..40),
            ) {
                let mut cache = DocumentCache::new(1);
                for offset in &cached {
                    cache.insert(*offset, "m", "doc");
                }
                cache.retain_offsets(|offset| live.contains(&offset));

                let expected: Vec<usize> = cached.intersection(&live).copied().collect();
                prop_assert_eq!(cache.offsets(), expected);
                let kept: BTreeSet<usize> = cache.offsets().into_iter().collect();
                prop_assert!(kept.is_subset(&live));
            }
        }
    }
}
