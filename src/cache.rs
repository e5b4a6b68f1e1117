//! Stale-while-revalidate list backed by a snapshot store and a feed source.
//!
//! Mounting publishes any stored snapshot straight away and then always
//! refreshes from the feed in the background. A successful refresh replaces
//! both the published list and the snapshot. A failed one is only shown to
//! the viewer when there was nothing cached to fall back on.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::feed::FeedSource;
use crate::normalize::Normalizer;
use crate::store::{KeyValueStore, SnapshotRepository};

/// What a list view renders at any moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> ListState<T> {
    fn cold() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }

    fn warm(items: Vec<T>) -> Self {
        Self {
            items,
            loading: false,
            error: None,
        }
    }
}

/// Static description of one cached list.
#[derive(Debug, Clone)]
pub struct ListSpec {
    /// Snapshot key in the store.
    pub key: String,
    pub feed_url: String,
    /// Shown when the refresh fails and nothing was cached.
    pub error_message: String,
}

pub struct CachedList<T> {
    spec: ListSpec,
    source: Arc<dyn FeedSource>,
    snapshots: SnapshotRepository<T>,
    normalize: Normalizer<T>,
}

impl<T> CachedList<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        spec: ListSpec,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn FeedSource>,
        normalize: Normalizer<T>,
    ) -> Self {
        let snapshots = SnapshotRepository::new(store, spec.key.clone());
        Self {
            spec,
            source,
            snapshots,
            normalize,
        }
    }

    pub fn spec(&self) -> &ListSpec {
        &self.spec
    }

    /// Read the stored snapshot. A corrupt entry is deleted and reported as
    /// a miss; a store that cannot be read at all is also a miss.
    pub async fn load_snapshot(&self) -> Option<Vec<T>> {
        match self.snapshots.load().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_parse() => {
                warn!("Discarding corrupt snapshot '{}': {}", self.spec.key, e);
                if let Err(e) = self.snapshots.discard().await {
                    error!("Failed to remove snapshot '{}': {}", self.spec.key, e);
                }
                None
            }
            Err(e) => {
                error!("Failed to read snapshot '{}': {}", self.spec.key, e);
                None
            }
        }
    }

    /// Fetch, normalize and persist. Returns the fresh items.
    pub async fn fetch_fresh(&self) -> crate::error::Result<Vec<T>> {
        let raw = self.source.fetch(&self.spec.feed_url).await?;
        let items = (self.normalize)(&raw);
        Ok(items)
    }

    /// Apply the outcome of one refresh to the state that was shown before it.
    fn settle(&self, previous: &ListState<T>, had_snapshot: bool, outcome: crate::error::Result<Vec<T>>) -> ListState<T> {
        match outcome {
            Ok(items) => ListState::warm(items),
            Err(e) if had_snapshot => {
                warn!("Refresh of '{}' failed, keeping cached list: {}", self.spec.key, e);
                ListState {
                    items: previous.items.clone(),
                    loading: false,
                    error: None,
                }
            }
            Err(e) => {
                error!("Failed to load '{}': {}", self.spec.key, e);
                ListState {
                    items: Vec::new(),
                    loading: false,
                    error: Some(self.spec.error_message.clone()),
                }
            }
        }
    }

    /// Publish the cached snapshot (or a loading state) and start the
    /// background refresh. The refresh is abandoned once the returned
    /// handle is unmounted.
    pub async fn mount(self: Arc<Self>) -> MountedList<T> {
        let snapshot = self.load_snapshot().await;
        let had_snapshot = snapshot.is_some();
        let initial = match snapshot {
            Some(items) => {
                debug!("Serving {} cached items for '{}'", items.len(), self.spec.key);
                ListState::warm(items)
            }
            None => ListState::cold(),
        };

        let (tx, rx) = watch::channel(initial);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let list = Arc::clone(&self);

        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Refresh of '{}' cancelled before the feed answered", list.spec.key);
                    return;
                }
                outcome = list.fetch_fresh() => outcome,
            };

            if task_token.is_cancelled() {
                debug!("Dropping refresh result for unmounted '{}'", list.spec.key);
                return;
            }

            if let Ok(items) = &outcome {
                let saved = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!("Refresh of '{}' cancelled while storing the snapshot", list.spec.key);
                        return;
                    }
                    saved = list.snapshots.save(items) => saved,
                };
                match saved {
                    Ok(()) => info!("Stored {} items under '{}'", items.len(), list.spec.key),
                    Err(e) => error!("Failed to store snapshot '{}': {}", list.spec.key, e),
                }
            }

            if task_token.is_cancelled() {
                debug!("Dropping refresh result for unmounted '{}'", list.spec.key);
                return;
            }

            let next = list.settle(&tx.borrow(), had_snapshot, outcome);
            // Receivers may all be gone; nothing left to notify then.
            let _ = tx.send(next);
        });

        MountedList {
            state: rx,
            token,
            task,
        }
    }
}

/// A mounted view of a cached list.
pub struct MountedList<T> {
    state: watch::Receiver<ListState<T>>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl<T: Clone> MountedList<T> {
    /// The state as of now.
    pub fn current(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for the background refresh to finish and return the final state.
    pub async fn settled(self) -> ListState<T> {
        let MountedList { state, task, .. } = self;
        if let Err(e) = task.await {
            error!("Refresh task failed: {}", e);
        }
        let settled = state.borrow().clone();
        settled
    }

    /// Tear the view down. A refresh still in flight will not publish or
    /// write its result.
    pub fn unmount(self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FolioError;
    use crate::models::{Article, RawFeedItem};
    use crate::normalize;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    /// Feed that answers only once released, so tests can observe the state
    /// between mount and refresh.
    struct GatedFeed {
        gate: Notify,
        result: Result<Vec<RawFeedItem>, String>,
    }

    impl GatedFeed {
        fn ok(items: Vec<RawFeedItem>) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                result: Ok(items),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                result: Err("HTTP error! status: 503".into()),
            })
        }

        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl FeedSource for GatedFeed {
        async fn fetch(&self, _feed_url: &str) -> crate::error::Result<Vec<RawFeedItem>> {
            self.gate.notified().await;
            self.result.clone().map_err(FolioError::Network)
        }
    }

    fn spec() -> ListSpec {
        ListSpec {
            key: "folio.articles".into(),
            feed_url: "https://blog.example.com/feed".into(),
            error_message: "Could not load articles.".into(),
        }
    }

    fn raw(title: &str, link: &str) -> RawFeedItem {
        RawFeedItem {
            title: Some(title.into()),
            link: Some(link.into()),
            pub_date: Some("Mon, 01 Jan 2024 00:00:00 GMT".into()),
            ..Default::default()
        }
    }

    fn article(title: &str, link: &str) -> Article {
        Article {
            title: title.into(),
            link: link.into(),
            pub_date: "Mon, 01 Jan 2024 00:00:00 GMT".into(),
        }
    }

    async fn seeded_store(items: &[Article]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .set("folio.articles", &serde_json::to_string(items).unwrap())
            .await
            .unwrap();
        store
    }

    fn list(store: Arc<MemoryStore>, feed: Arc<GatedFeed>) -> Arc<CachedList<Article>> {
        Arc::new(CachedList::new(spec(), store, feed, normalize::articles))
    }

    #[tokio::test]
    async fn cached_items_render_before_fetch_resolves() {
        let cached = vec![article("Cached", "https://x/cached")];
        let store = seeded_store(&cached).await;
        let feed = GatedFeed::ok(vec![raw("Fresh", "https://x/fresh")]);

        let mounted = list(store.clone(), feed.clone()).mount().await;
        assert_eq!(
            mounted.current(),
            ListState {
                items: cached,
                loading: false,
                error: None
            }
        );
        assert!(mounted.is_refreshing());

        feed.release();
        let settled = mounted.settled().await;
        assert_eq!(settled.items, vec![article("Fresh", "https://x/fresh")]);

        let stored: Vec<Article> =
            serde_json::from_str(&store.get("folio.articles").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, settled.items);
    }

    #[tokio::test]
    async fn cold_cache_shows_loading_then_items() {
        let store = Arc::new(MemoryStore::new());
        let feed = GatedFeed::ok(vec![raw("Fresh", "https://x/fresh")]);

        let mounted = list(store.clone(), feed.clone()).mount().await;
        let initial = mounted.current();
        assert!(initial.loading);
        assert!(initial.items.is_empty());

        feed.release();
        let settled = mounted.settled().await;
        assert!(!settled.loading);
        assert_eq!(settled.error, None);
        assert_eq!(settled.items.len(), 1);
        assert!(store.contains("folio.articles"));
    }

    #[tokio::test]
    async fn failure_with_cache_keeps_list_and_hides_error() {
        let cached = vec![article("Cached", "https://x/cached")];
        let store = seeded_store(&cached).await;
        let feed = GatedFeed::failing();

        let mounted = list(store.clone(), feed.clone()).mount().await;
        feed.release();
        let settled = mounted.settled().await;

        assert_eq!(
            settled,
            ListState {
                items: cached.clone(),
                loading: false,
                error: None
            }
        );
        let stored: Vec<Article> =
            serde_json::from_str(&store.get("folio.articles").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, cached);
    }

    #[tokio::test]
    async fn failure_without_cache_surfaces_error() {
        let store = Arc::new(MemoryStore::new());
        let feed = GatedFeed::failing();

        let mounted = list(store.clone(), feed.clone()).mount().await;
        feed.release();
        let settled = mounted.settled().await;

        assert!(settled.items.is_empty());
        assert!(!settled.loading);
        assert_eq!(settled.error.as_deref(), Some("Could not load articles."));
        assert!(!store.contains("folio.articles"));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_removed_and_treated_as_cold() {
        let store = Arc::new(MemoryStore::new());
        store.set("folio.articles", "not json").await.unwrap();
        let feed = GatedFeed::failing();

        let mounted = list(store.clone(), feed.clone()).mount().await;
        assert!(!store.contains("folio.articles"));
        assert!(mounted.current().loading);

        feed.release();
        let settled = mounted.settled().await;
        assert!(settled.error.is_some());
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let store = Arc::new(MemoryStore::new());
        let failing = GatedFeed::failing();
        let first = list(store.clone(), failing.clone()).mount().await;
        failing.release();
        assert!(first.settled().await.error.is_some());

        let feed = GatedFeed::ok(vec![raw("Fresh", "https://x/fresh")]);
        let second = list(store, feed.clone()).mount().await;
        feed.release();
        let settled = second.settled().await;
        assert_eq!(settled.error, None);
        assert_eq!(settled.items.len(), 1);
    }

    #[tokio::test]
    async fn unmounted_view_ignores_late_result() {
        let cached = vec![article("Cached", "https://x/cached")];
        let store = seeded_store(&cached).await;
        let feed = GatedFeed::ok(vec![raw("Fresh", "https://x/fresh")]);

        let mounted = list(store.clone(), feed.clone()).mount().await;
        let mut rx = mounted.subscribe();
        rx.borrow_and_update();
        mounted.unmount();
        feed.release();

        // The sender is dropped once the task exits without publishing.
        assert!(rx.changed().await.is_err());
        assert_eq!(rx.borrow().items, cached);

        let stored: Vec<Article> =
            serde_json::from_str(&store.get("folio.articles").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, cached);
    }
    /// Store whose writes stall until released, reporting when one starts.
    struct StallingStore {
        inner: MemoryStore,
        entered: Notify,
        gate: Notify,
    }

    #[async_trait]
    impl KeyValueStore for StallingStore {
        async fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> crate::error::Result<()> {
            self.entered.notify_one();
            self.gate.notified().await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> crate::error::Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn unmount_during_snapshot_write_neither_writes_nor_publishes() {
        let cached = vec![article("Cached", "https://x/cached")];
        let inner = MemoryStore::new();
        inner
            .set("folio.articles", &serde_json::to_string(&cached).unwrap())
            .await
            .unwrap();
        let store = Arc::new(StallingStore {
            inner,
            entered: Notify::new(),
            gate: Notify::new(),
        });
        let feed = GatedFeed::ok(vec![raw("Fresh", "https://x/fresh")]);

        let list = Arc::new(CachedList::new(spec(), store.clone(), feed.clone(), normalize::articles));
        let mounted = list.mount().await;
        let mut rx = mounted.subscribe();
        rx.borrow_and_update();

        feed.release();
        store.entered.notified().await;
        mounted.unmount();
        store.gate.notify_one();

        assert!(rx.changed().await.is_err());
        assert_eq!(rx.borrow().items, cached);

        let stored: Vec<Article> =
            serde_json::from_str(&store.inner.get("folio.articles").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, cached);
    }
}
