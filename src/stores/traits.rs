//! External boundary traits (spec §6).
//!
//! One trait per boundary the core consumes or produces. Each has a single
//! in-process reference implementation in `stores::memory`, so the crate
//! builds and runs with `default = ["local"]` and no real MongoDB/PostgreSQL/
//! Redis driver on the classpath.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub source_name: String,
    pub source_url: String,
    pub title: String,
    pub body: String,
    pub language: String,
    pub published_at: DateTime<Utc>,
    pub credibility_score: f64,
    pub word_count: u64,
}

/// Pull interface from a cleaned-articles store.
#[async_trait]
pub trait IngestionSource: Send + Sync {
    async fn fetch_unprocessed(
        &self,
        limit: usize,
        skip: usize,
        min_quality: f64,
    ) -> PipelineResult<Vec<Article>>;

    async fn fetch_since(&self, since: DateTime<Utc>, limit: usize) -> PipelineResult<Vec<Article>>;

    async fn fetch_by_ids(&self, ids: &[String]) -> PipelineResult<Vec<Article>>;

    async fn mark_processed(&self, article_id: &str, result_blob: serde_json::Value) -> PipelineResult<()>;

    async fn count_unprocessed(&self) -> PipelineResult<u64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub duplicate_id: String,
    pub similarity_score: f64,
}

/// Optional similarity provider. Absence or failure falls back to the
/// internal Jaccard scan in `corroboration`.
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    async fn find_duplicates(
        &self,
        article_id: &str,
        content: &str,
        title: &str,
        threshold: f64,
    ) -> PipelineResult<Vec<DuplicateMatch>>;
}

use crate::recommendations::Recommendation;
use crate::detectors::Insight;

/// Idempotent upserts keyed on (company_id, code, date).
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn upsert_insight(&self, insight: &Insight) -> PipelineResult<()>;
    async fn store_recommendations(&self, insight_id: &str, recs: &[Recommendation]) -> PipelineResult<()>;
    async fn mark_acknowledged(&self, insight_id: &str, user: &str, ts: DateTime<Utc>) -> PipelineResult<()>;
    async fn mark_resolved(
        &self,
        insight_id: &str,
        notes: &str,
        actual_impact: Option<f64>,
        ts: DateTime<Utc>,
    ) -> PipelineResult<()>;
    async fn list_active(&self, company_id: &str, limit: usize, offset: usize) -> PipelineResult<Vec<Insight>>;
    async fn record_score_history(&self, insight_id: &str, score_snapshot: f64) -> PipelineResult<()>;
}

/// article_id -> TrustScore (TTL 1h); company_id -> insight list (TTL 15m);
/// insight_id -> narrative (TTL 1h). Best-effort: callers must tolerate misses.
#[async_trait]
pub trait ResultsCache: Send + Sync {
    async fn get_trust_score(&self, article_id: &str) -> Option<serde_json::Value>;
    async fn put_trust_score(&self, article_id: &str, value: serde_json::Value);
    async fn get_insight_list(&self, company_id: &str) -> Option<serde_json::Value>;
    async fn put_insight_list(&self, company_id: &str, value: serde_json::Value);
    async fn get_narrative(&self, insight_id: &str) -> Option<String>;
    async fn put_narrative(&self, insight_id: &str, narrative: String);
}
