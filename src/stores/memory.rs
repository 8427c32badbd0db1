//! In-process reference implementations of the `stores::traits` boundaries,
//! backed by `DashMap`. These are what the `local` feature wires up by
//! default; real MongoDB/PostgreSQL/Redis backends are external
//! collaborators, not part of this crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;

use crate::detectors::Insight;
use crate::error::{PipelineError, PipelineResult};
use crate::recommendations::Recommendation;

use super::traits::{Article, DuplicateMatch, IngestionSource, InsightStore, ResultsCache, SimilarityProvider};

/// Fixed in-memory article feed. `mark_processed` just records the id so
/// `count_unprocessed` reflects it; there is no external store to write to.
#[derive(Default)]
pub struct InMemoryIngestionSource {
    articles: DashMap<String, Article>,
    processed: DashMap<String, serde_json::Value>,
}

impl InMemoryIngestionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, article: Article) {
        self.articles.insert(article.article_id.clone(), article);
    }
}

#[async_trait]
impl IngestionSource for InMemoryIngestionSource {
    async fn fetch_unprocessed(
        &self,
        limit: usize,
        skip: usize,
        min_quality: f64,
    ) -> PipelineResult<Vec<Article>> {
        let mut out: Vec<Article> = self
            .articles
            .iter()
            .filter(|entry| !self.processed.contains_key(entry.key()))
            .filter(|entry| entry.value().credibility_score >= min_quality)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.published_at.cmp(&b.published_at));
        Ok(out.into_iter().skip(skip).take(limit).collect())
    }

    async fn fetch_since(&self, since: DateTime<Utc>, limit: usize) -> PipelineResult<Vec<Article>> {
        let mut out: Vec<Article> = self
            .articles
            .iter()
            .filter(|entry| entry.value().published_at >= since)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.published_at.cmp(&b.published_at));
        Ok(out.into_iter().take(limit).collect())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> PipelineResult<Vec<Article>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.articles.get(id).map(|a| a.clone()))
            .collect())
    }

    async fn mark_processed(&self, article_id: &str, result_blob: serde_json::Value) -> PipelineResult<()> {
        if !self.articles.contains_key(article_id) {
            return Err(PipelineError::MalformedInput(format!(
                "unknown article id {article_id}"
            )));
        }
        self.processed.insert(article_id.to_string(), result_blob);
        Ok(())
    }

    async fn count_unprocessed(&self) -> PipelineResult<u64> {
        Ok(self
            .articles
            .iter()
            .filter(|entry| !self.processed.contains_key(entry.key()))
            .count() as u64)
    }
}

/// No-op similarity provider used when callers want the fallback path
/// exercised deterministically in tests (`find_duplicates` always fails).
pub struct NullSimilarityProvider;

#[async_trait]
impl SimilarityProvider for NullSimilarityProvider {
    async fn find_duplicates(
        &self,
        _article_id: &str,
        _content: &str,
        _title: &str,
        _threshold: f64,
    ) -> PipelineResult<Vec<DuplicateMatch>> {
        Err(PipelineError::TransientStore("no similarity provider configured".into()))
    }
}

#[derive(Default)]
pub struct InMemoryInsightStore {
    insights: DashMap<(String, String, String), Insight>,
    recommendations: DashMap<String, Vec<Recommendation>>,
}

impl InMemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn dedup_key(insight: &Insight) -> (String, String, String) {
        (
            insight.company_id.clone(),
            insight.code.clone(),
            insight.created_at.format("%Y-%m-%d").to_string(),
        )
    }
}

#[async_trait]
impl InsightStore for InMemoryInsightStore {
    async fn upsert_insight(&self, insight: &Insight) -> PipelineResult<()> {
        let key = Self::dedup_key(insight);
        match self.insights.get(&key) {
            Some(existing) if existing.confidence >= insight.confidence => {}
            _ => {
                self.insights.insert(key, insight.clone());
            }
        }
        Ok(())
    }

    async fn store_recommendations(&self, insight_id: &str, recs: &[Recommendation]) -> PipelineResult<()> {
        self.recommendations.insert(insight_id.to_string(), recs.to_vec());
        Ok(())
    }

    async fn mark_acknowledged(&self, insight_id: &str, _user: &str, _ts: DateTime<Utc>) -> PipelineResult<()> {
        for mut entry in self.insights.iter_mut() {
            if entry.value().id == insight_id {
                entry.value_mut().status = crate::detectors::InsightStatus::Acknowledged;
            }
        }
        Ok(())
    }

    async fn mark_resolved(
        &self,
        insight_id: &str,
        _notes: &str,
        _actual_impact: Option<f64>,
        _ts: DateTime<Utc>,
    ) -> PipelineResult<()> {
        for mut entry in self.insights.iter_mut() {
            if entry.value().id == insight_id {
                entry.value_mut().status = crate::detectors::InsightStatus::Resolved;
            }
        }
        Ok(())
    }

    async fn list_active(&self, company_id: &str, limit: usize, offset: usize) -> PipelineResult<Vec<Insight>> {
        let mut out: Vec<Insight> = self
            .insights
            .iter()
            .filter(|e| e.value().company_id == company_id)
            .filter(|e| e.value().status == crate::detectors::InsightStatus::Active)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap());
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    async fn record_score_history(&self, _insight_id: &str, _score_snapshot: f64) -> PipelineResult<()> {
        Ok(())
    }
}

struct TimedEntry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// TTL-keyed cache. Expiry is checked on read; there is no background
/// sweeper, matching "best-effort, callers must tolerate misses" (§6).
#[derive(Default)]
pub struct InMemoryResultsCache {
    trust_scores: DashMap<String, TimedEntry<serde_json::Value>>,
    insight_lists: DashMap<String, TimedEntry<serde_json::Value>>,
    narratives: DashMap<String, TimedEntry<String>>,
}

const TRUST_SCORE_TTL_SECS: i64 = 3600;
const INSIGHT_LIST_TTL_SECS: i64 = 900;
const NARRATIVE_TTL_SECS: i64 = 3600;

impl InMemoryResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get<T: Clone>(map: &DashMap<String, TimedEntry<T>>, key: &str) -> Option<T> {
        let now = Utc::now();
        match map.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl ResultsCache for InMemoryResultsCache {
    async fn get_trust_score(&self, article_id: &str) -> Option<serde_json::Value> {
        Self::get(&self.trust_scores, article_id)
    }

    async fn put_trust_score(&self, article_id: &str, value: serde_json::Value) {
        self.trust_scores.insert(
            article_id.to_string(),
            TimedEntry { value, expires_at: Utc::now() + ChronoDuration::seconds(TRUST_SCORE_TTL_SECS) },
        );
    }

    async fn get_insight_list(&self, company_id: &str) -> Option<serde_json::Value> {
        Self::get(&self.insight_lists, company_id)
    }

    async fn put_insight_list(&self, company_id: &str, value: serde_json::Value) {
        self.insight_lists.insert(
            company_id.to_string(),
            TimedEntry { value, expires_at: Utc::now() + ChronoDuration::seconds(INSIGHT_LIST_TTL_SECS) },
        );
    }

    async fn get_narrative(&self, insight_id: &str) -> Option<String> {
        Self::get(&self.narratives, insight_id)
    }

    async fn put_narrative(&self, insight_id: &str, narrative: String) {
        self.narratives.insert(
            insight_id.to_string(),
            TimedEntry { value: narrative, expires_at: Utc::now() + ChronoDuration::seconds(NARRATIVE_TTL_SECS) },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ingestion_source_filters_processed_and_low_quality() {
        let source = InMemoryIngestionSource::new();
        source.seed(Article {
            article_id: "a1".into(),
            source_name: "reuters".into(),
            source_url: String::new(),
            title: "t".into(),
            body: "b".into(),
            language: "en".into(),
            published_at: Utc::now(),
            credibility_score: 0.9,
            word_count: 100,
        });
        source.seed(Article {
            article_id: "a2".into(),
            source_name: "blog".into(),
            source_url: String::new(),
            title: "t2".into(),
            body: "b2".into(),
            language: "en".into(),
            published_at: Utc::now(),
            credibility_score: 0.1,
            word_count: 20,
        });

        let unprocessed = source.fetch_unprocessed(10, 0, 0.5).await.unwrap();
        assert_eq!(unprocessed.len(), 1);
        assert_eq!(unprocessed[0].article_id, "a1");

        source.mark_processed("a1", serde_json::json!({"ok": true})).await.unwrap();
        let unprocessed = source.fetch_unprocessed(10, 0, 0.0).await.unwrap();
        assert_eq!(unprocessed.len(), 1);
        assert_eq!(unprocessed[0].article_id, "a2");
    }

    #[tokio::test]
    async fn results_cache_returns_none_on_miss() {
        let cache = InMemoryResultsCache::new();
        assert!(cache.get_trust_score("missing").await.is_none());
    }

    #[tokio::test]
    async fn results_cache_roundtrips_written_value() {
        let cache = InMemoryResultsCache::new();
        cache.put_trust_score("a1", serde_json::json!({"total": 72.0})).await;
        let cached = cache.get_trust_score("a1").await;
        assert_eq!(cached, Some(serde_json::json!({"total": 72.0})));
    }
}
