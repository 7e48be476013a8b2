//! Cached top-N trending query.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use radiant_core::clock::Clock;
use radiant_core::error::DomainError;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::store::{TrendingRecord, TrendingStore};

/// Largest number of posts a trending query returns.
pub const MAX_TRENDING_LIMIT: usize = 50;

/// Only posts viewed within this many days are considered.
const TRENDING_WINDOW_DAYS: i64 = 7;

/// Cache sizing for the trending query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendingConfig {
    /// How long a computed top-N stays valid.
    pub cache_ttl: Duration,
    /// Distinct limits cached at once.
    pub cache_max_entries: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 100,
        }
    }
}

/// One entry of the trending list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingPost {
    /// The post.
    pub post_id: Uuid,
    /// Views counted.
    pub view_count: u64,
    /// Score as of the last view.
    pub trend_score: f64,
    /// Time of the last view.
    pub last_viewed_at: DateTime<Utc>,
}

impl From<TrendingRecord> for TrendingPost {
    fn from(record: TrendingRecord) -> Self {
        Self {
            post_id: record.post_id,
            view_count: record.view_count,
            trend_score: record.trend_score,
            last_viewed_at: record.last_viewed_at,
        }
    }
}

/// Serves trending posts from a [`TrendingStore`] through a TTL cache.
pub struct TrendingQuery {
    store: Arc<dyn TrendingStore>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<usize, Vec<TrendingPost>>,
}

impl TrendingQuery {
    /// Creates the query.
    #[must_use]
    pub fn new(
        store: Arc<dyn TrendingStore>,
        clock: Arc<dyn Clock>,
        config: TrendingConfig,
    ) -> Self {
        Self {
            cache: TtlCache::new(config.cache_ttl, config.cache_max_entries, Arc::clone(&clock)),
            store,
            clock,
        }
    }

    /// Top `limit` live posts viewed in the last seven days, by score then
    /// most recent view. `limit` is clamped to `1..=50`. Results may be up
    /// to one cache TTL old.
    ///
    /// # Errors
    ///
    /// Returns the store's error on a cache miss.
    #[instrument(skip(self))]
    pub async fn find_trending_posts(
        &self,
        limit: usize,
    ) -> Result<Vec<TrendingPost>, DomainError> {
        let limit = limit.clamp(1, MAX_TRENDING_LIMIT);
        if let Some(cached) = self.cache.get(&limit) {
            debug!(limit, "trending cache hit");
            return Ok(cached);
        }

        let since = self.clock.now() - TimeDelta::days(TRENDING_WINDOW_DAYS);
        let posts: Vec<TrendingPost> = self
            .store
            .top_since(since, limit)
            .await?
            .into_iter()
            .map(TrendingPost::from)
            .collect();
        self.cache.insert(limit, posts.clone());
        Ok(posts)
    }

    /// Drops cached results, e.g. after a rebuild.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
