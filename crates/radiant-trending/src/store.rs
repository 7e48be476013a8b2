//! Trending records and their storage.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use radiant_core::clock::hours_between;
use radiant_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::score::trend_score;

/// View statistics for one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingRecord {
    /// The post.
    pub post_id: Uuid,
    /// Views folded so far. Never decreases.
    pub view_count: u64,
    /// Score as of the last view.
    pub trend_score: f64,
    /// Time of the last view.
    pub last_viewed_at: DateTime<Utc>,
    /// Time of the first view.
    pub created_at: DateTime<Utc>,
    /// Set once the post is deleted.
    pub deleted: bool,
    /// Last post-stream sequence folded into this record.
    #[serde(skip)]
    pub last_sequence: i64,
}

impl TrendingRecord {
    /// A record for a post that has not been viewed yet.
    #[must_use]
    pub fn new(post_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            post_id,
            view_count: 0,
            trend_score: 0.0,
            last_viewed_at: at,
            created_at: at,
            deleted: false,
            last_sequence: 0,
        }
    }

    /// Counts one view at `at` and recomputes the score from the record's
    /// age.
    pub fn record_view(&mut self, at: DateTime<Utc>) {
        self.view_count += 1;
        self.last_viewed_at = at;
        self.trend_score = trend_score(self.view_count, hours_between(self.created_at, at));
    }

    /// Ranking order: score desc, then most recently viewed first.
    #[must_use]
    pub fn rank(&self, other: &Self) -> Ordering {
        other
            .trend_score
            .total_cmp(&self.trend_score)
            .then_with(|| other.last_viewed_at.cmp(&self.last_viewed_at))
    }
}

/// Storage for trending records.
#[async_trait]
pub trait TrendingStore: Send + Sync {
    /// Loads the record of a post, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn find(&self, post_id: Uuid) -> Result<Option<TrendingRecord>, DomainError>;

    /// Inserts or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn save(&self, record: TrendingRecord) -> Result<(), DomainError>;

    /// Live records viewed at or after `since`, in ranking order, at most
    /// `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn top_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingRecord>, DomainError>;

    /// Drops every record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn clear(&self) -> Result<(), DomainError>;
}

/// Process-local trending store.
#[derive(Debug, Default)]
pub struct InMemoryTrendingStore {
    records: RwLock<HashMap<Uuid, TrendingRecord>>,
}

impl InMemoryTrendingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendingStore for InMemoryTrendingStore {
    async fn find(&self, post_id: Uuid) -> Result<Option<TrendingRecord>, DomainError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(&post_id).cloned())
    }

    async fn save(&self, record: TrendingRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.post_id, record);
        Ok(())
    }

    async fn top_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingRecord>, DomainError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut live: Vec<TrendingRecord> = records
            .values()
            .filter(|r| !r.deleted && r.last_viewed_at >= since)
            .cloned()
            .collect();
        live.sort_by(TrendingRecord::rank);
        live.truncate(limit);
        Ok(live)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn record(post_id: Uuid, views: u64, at: DateTime<Utc>) -> TrendingRecord {
        let mut record = TrendingRecord::new(post_id, at);
        for _ in 0..views {
            record.record_view(at);
        }
        record
    }

    #[test]
    fn test_record_view_recomputes_score_from_age() {
        // Arrange
        let mut record = TrendingRecord::new(Uuid::new_v4(), start());
        record.record_view(start());

        // Act
        record.record_view(start() + Duration::hours(3));

        // Assert
        assert_eq!(record.view_count, 2);
        assert_eq!(record.last_viewed_at, start() + Duration::hours(3));
        assert!((record.trend_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_view_past_horizon_scores_zero() {
        let mut record = TrendingRecord::new(Uuid::new_v4(), start());

        record.record_view(start() + Duration::hours(169));

        assert_eq!(record.view_count, 1);
        assert!(record.trend_score.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_top_since_ranks_and_filters() {
        // Arrange
        let store = InMemoryTrendingStore::new();
        let (hot, warm, tied, gone, stale) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        store.save(record(hot, 5, start())).await.unwrap();
        store.save(record(warm, 2, start())).await.unwrap();
        store
            .save(record(tied, 2, start() + Duration::minutes(1)))
            .await
            .unwrap();
        let mut deleted = record(gone, 9, start());
        deleted.deleted = true;
        store.save(deleted).await.unwrap();
        store
            .save(record(stale, 9, start() - Duration::days(8)))
            .await
            .unwrap();

        // Act
        let top = store
            .top_since(start() - Duration::days(7), 10)
            .await
            .unwrap();

        // Assert
        let ids: Vec<Uuid> = top.iter().map(|r| r.post_id).collect();
        assert_eq!(ids, vec![hot, tied, warm]);
    }

    #[tokio::test]
    async fn test_top_since_truncates_to_limit() {
        let store = InMemoryTrendingStore::new();
        for views in 1..=4 {
            store
                .save(record(Uuid::new_v4(), views, start()))
                .await
                .unwrap();
        }

        let top = store.top_since(start(), 2).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].view_count, 4);
    }

    #[tokio::test]
    async fn test_clear_drops_records() {
        let store = InMemoryTrendingStore::new();
        let post_id = Uuid::new_v4();
        store.save(record(post_id, 1, start())).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.find(post_id).await.unwrap(), None);
    }
}
