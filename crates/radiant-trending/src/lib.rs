//! Radiant — Trending score engine.
//!
//! Folds `post.viewed` and `post.deleted` into one [`TrendingRecord`] per
//! post and serves the top-N through a small TTL cache.

pub mod cache;
pub mod projection;
pub mod query;
pub mod score;
pub mod store;

pub use cache::TtlCache;
pub use projection::TrendingProjection;
pub use query::{MAX_TRENDING_LIMIT, TrendingConfig, TrendingPost, TrendingQuery};
pub use store::{InMemoryTrendingStore, TrendingRecord, TrendingStore};
