use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::TagnoteError;
use crate::git_tags::model::{GitTag, ProjectRepo};
use crate::git_tags::source::GitTagSource;

struct Entry {
    tags: Arc<[GitTag]>,
    fetched_at: Instant,
}

/// Read-through cache of tag lists, one entry per `(project, repo)`.
///
/// Shared through `Arc` by every view that shows tags for the same repository.
/// Failed fetches are never cached and leave any previous entry in place.
pub struct GitTagListCache<S> {
    source: Arc<S>,
    ttl: Duration,
    entries: RwLock<HashMap<ProjectRepo, Entry>>,
}

impl<S: GitTagSource> GitTagListCache<S> {
    pub fn new(source: Arc<S>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached tags for `key`, fetching when missing or older than the TTL.
    pub async fn get(&self, key: &ProjectRepo) -> Result<Arc<[GitTag]>, TagnoteError> {
        if let Some(tags) = self.fresh(key).await {
            debug!(repo = %key, "git tag cache hit");
            return Ok(tags);
        }
        self.refresh(key).await
    }

    /// Fetch from the source unconditionally and replace the entry.
    pub async fn refresh(&self, key: &ProjectRepo) -> Result<Arc<[GitTag]>, TagnoteError> {
        let tags: Arc<[GitTag]> = self
            .source
            .list_git_tags(key)
            .await
            .inspect_err(|e| warn!(repo = %key, error = %e, "failed to fetch git tags"))?
            .into();

        self.entries.write().await.insert(
            key.clone(),
            Entry {
                tags: Arc::clone(&tags),
                fetched_at: Instant::now(),
            },
        );
        debug!(repo = %key, count = tags.len(), "git tag cache refreshed");
        Ok(tags)
    }

    /// Drop the entry for `key`. Returns whether one was cached.
    pub async fn invalidate(&self, key: &ProjectRepo) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn fresh(&self, key: &ProjectRepo) -> Option<Arc<[GitTag]>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GitTagSource for CountingSource {
        async fn list_git_tags(&self, key: &ProjectRepo) -> Result<Vec<GitTag>, TagnoteError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TagnoteError::UpstreamStatus(
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(vec![GitTag {
                object_id: format!("{}-{n}", key.repo),
                peeled_object_id: None,
                name: format!("v{n}"),
                created_by: None,
                link: String::new(),
                commit_link: None,
            }])
        }
    }

    fn cache(ttl: Duration) -> (Arc<CountingSource>, GitTagListCache<CountingSource>) {
        let source = Arc::new(CountingSource::default());
        (Arc::clone(&source), GitTagListCache::new(source, ttl))
    }

    #[tokio::test]
    async fn repeated_get_within_ttl_hits_source_once() {
        let (source, cache) = cache(Duration::from_secs(60));
        let key = ProjectRepo::new("p", "r");

        let first = cache.get(&key).await.expect("first get");
        let second = cache.get(&key).await.expect("second get");

        assert_eq!(source.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn keys_are_cached_separately() {
        let (source, cache) = cache(Duration::from_secs(60));

        let a = cache.get(&ProjectRepo::new("p", "a")).await.expect("a");
        let b = cache.get(&ProjectRepo::new("p", "b")).await.expect("b");

        assert_eq!(source.calls(), 2);
        assert_eq!(a[0].object_id, "a-0");
        assert_eq!(b[0].object_id, "b-1");
    }

    #[tokio::test]
    async fn refresh_and_invalidate_force_refetch() {
        let (source, cache) = cache(Duration::from_secs(60));
        let key = ProjectRepo::new("p", "r");

        cache.get(&key).await.expect("get");
        let refreshed = cache.refresh(&key).await.expect("refresh");
        assert_eq!(refreshed[0].name, "v1");

        assert!(cache.invalidate(&key).await);
        assert!(!cache.invalidate(&key).await);
        let refetched = cache.get(&key).await.expect("get after invalidate");
        assert_eq!(refetched[0].name, "v2");
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let (source, cache) = cache(Duration::ZERO);
        let key = ProjectRepo::new("p", "r");

        cache.get(&key).await.expect("get");
        cache.get(&key).await.expect("get");

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let (source, cache) = cache(Duration::from_secs(60));
        let key = ProjectRepo::new("p", "r");

        cache.get(&key).await.expect("get");
        source.fail.store(true, Ordering::SeqCst);

        let err = cache.refresh(&key).await.expect_err("refresh must fail");
        assert!(matches!(err, TagnoteError::UpstreamStatus(_)));

        let cached = cache.get(&key).await.expect("stale entry still served");
        assert_eq!(cached[0].name, "v0");
        assert_eq!(source.calls(), 2);
    }
}
