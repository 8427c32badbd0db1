//! Worker-pool orchestration (spec §5).
//!
//! Each article enters a pipeline of bounded `tokio::sync::mpsc` channels;
//! workers cooperatively suspend only at the points named in §5: store
//! reads/writes, the similarity provider, and scheduled retries. A
//! `CancellationToken` is threaded through every stage so in-flight work can
//! be abandoned at the next suspension point with no partial writes.

use std::sync::Arc;
use std::time::Duration;

use log::{error, warn};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::detectors::RiskOpportunityDetector;
use crate::indicators::{CompanyProfile, IndicatorProjectionEngine, NationalIndicatorValue};
use crate::recommendations::RecommendationEngine;
use crate::reputation::ReputationTracker;
use crate::stores::traits::{Article, IngestionSource, InsightStore};
use crate::validator::{CrossSourceValidator, ValidationInput, ValidationOutput};

const ARTICLE_VALIDATION_DEADLINE_SECS: u64 = 30;
const STORE_WRITE_TIMEOUT_SECS: u64 = 10;
const STORE_WRITE_MAX_RETRIES: u32 = 5;
const STORE_WRITE_BASE_BACKOFF_MS: u64 = 500;

/// The async engine that owns the validator, projection/detection/
/// recommendation chain, and the store handles. Constructed once at
/// application startup and shared by reference through the worker pool
/// (spec §9: no process-wide mutable singleton).
pub struct PipelineEngine {
    pub validator: Arc<CrossSourceValidator>,
    pub reputation_tracker: Arc<ReputationTracker>,
    pub projection_engine: IndicatorProjectionEngine,
    pub detector: RiskOpportunityDetector,
    pub recommendation_engine: RecommendationEngine,
    pub insight_store: Arc<dyn InsightStore>,
    pub ingestion_source: Arc<dyn IngestionSource>,
    pub config: Config,
}

impl PipelineEngine {
    pub fn new(
        insight_store: Arc<dyn InsightStore>,
        ingestion_source: Arc<dyn IngestionSource>,
        config: Config,
    ) -> Self {
        let reputation_tracker = Arc::new(ReputationTracker::new(config.reputation_half_life_days));
        let validator =
            Arc::new(CrossSourceValidator::new(reputation_tracker.clone(), config.corroboration_window));
        Self {
            validator,
            reputation_tracker,
            projection_engine: IndicatorProjectionEngine::new(),
            detector: RiskOpportunityDetector::new(),
            recommendation_engine: RecommendationEngine::new(),
            insight_store,
            ingestion_source,
            config,
        }
    }

    /// One article through claim extraction, corroboration, trust scoring
    /// and reputation updates, with the §5 30s hard deadline. On timeout or
    /// internal failure, emits the degraded result from §4.5 rather than
    /// propagating an error to the worker loop.
    pub async fn validate_article(&self, article: &Article) -> ValidationOutput {
        let input = ValidationInput {
            article_id: article.article_id.clone(),
            content: article.body.clone(),
            title: article.title.clone(),
            source_name: article.source_name.clone(),
            published_at: article.published_at,
        };
        let source_name = article.source_name.clone();

        match timeout(Duration::from_secs(ARTICLE_VALIDATION_DEADLINE_SECS), self.validator.validate(input)).await {
            Ok(output) => output,
            Err(_elapsed) => {
                warn!(
                    "Degraded: validation_deadline_exceeded for article {} ({}s)",
                    article.article_id, ARTICLE_VALIDATION_DEADLINE_SECS
                );
                self.validator.degraded_output(&source_name, "validation_deadline_exceeded")
            }
        }
    }

    /// `company indicators -> project -> detect -> generate recommendations
    /// -> persist`, the periodic/on-demand half of the pipeline (spec §2).
    pub async fn run_company_insight_pass(
        &self,
        national: &[NationalIndicatorValue],
        profile: &CompanyProfile,
    ) -> Vec<crate::detectors::Insight> {
        let operational = self.projection_engine.project(national, profile);
        let insights = self.detector.detect(&profile.company_id, &operational);

        for insight in &insights {
            if let Err(e) = self.store_insight_with_retry(insight).await {
                error!("PermanentStoreError persisting insight {}: {e}", insight.id);
                continue;
            }
            let recs = self.recommendation_engine.generate_recommendations(insight);
            if let Err(e) = self.store_recommendations_with_retry(&insight.id, &recs).await {
                error!("PermanentStoreError persisting recommendations for {}: {e}", insight.id);
            }
        }

        insights
    }

    async fn store_insight_with_retry(&self, insight: &crate::detectors::Insight) -> Result<(), crate::error::PipelineError> {
        retry_with_backoff(|| self.insight_store.upsert_insight(insight)).await
    }

    async fn store_recommendations_with_retry(
        &self,
        insight_id: &str,
        recs: &[crate::recommendations::Recommendation],
    ) -> Result<(), crate::error::PipelineError> {
        retry_with_backoff(|| self.insight_store.store_recommendations(insight_id, recs)).await
    }

    /// Background sweep (spec §4.7 insight lifecycle): `active|acknowledged`
    /// insights whose `expected_impact_time + 7 days` has passed transition
    /// to `expired`. Operates on a caller-supplied snapshot since the
    /// `InsightStore` trait only exposes `list_active`/upsert, matching the
    /// "Insights are owned by the Insight Store" ownership rule in §3.
    pub async fn expire_overdue_insights(
        &self,
        company_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<crate::detectors::Insight> {
        let mut expired = Vec::new();
        let Ok(active) = self.insight_store.list_active(company_id, usize::MAX, 0).await else {
            return expired;
        };
        for mut insight in active {
            if insight.expire_if_overdue(now) {
                if self.insight_store.upsert_insight(&insight).await.is_ok() {
                    expired.push(insight);
                }
            }
        }
        expired
    }
}

/// Exponential backoff retry for store writes (spec §5: base 500ms, max 5
/// retries, 10s per-attempt timeout). Only `TransientStoreError` is retried;
/// any other error aborts immediately.
async fn retry_with_backoff<F, Fut>(mut op: F) -> Result<(), crate::error::PipelineError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = crate::error::PipelineResult<()>>,
{
    let mut attempt = 0u32;
    loop {
        let call = timeout(Duration::from_secs(STORE_WRITE_TIMEOUT_SECS), op()).await;
        match call {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(crate::error::PipelineError::TransientStore(msg))) => {
                attempt += 1;
                if attempt > STORE_WRITE_MAX_RETRIES {
                    return Err(crate::error::PipelineError::TransientStore(msg));
                }
                let backoff = STORE_WRITE_BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            Ok(Err(other)) => return Err(other),
            Err(_elapsed) => {
                attempt += 1;
                if attempt > STORE_WRITE_MAX_RETRIES {
                    return Err(crate::error::PipelineError::TransientStore("store write timed out".into()));
                }
                let backoff = STORE_WRITE_BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }
    }
}

/// Bounded-queue worker pool (spec §5): `MAX_PIPELINE_WORKERS` tasks pull
/// articles from a channel of capacity `2 * worker_count`, validate each,
/// mark it processed, and cache the result. Back-pressure is implicit in the
/// channel's bounded capacity — the feeder blocks once it's full.
pub struct WorkerPool {
    engine: Arc<PipelineEngine>,
    worker_count: usize,
}

pub struct WorkerPoolOutcome {
    pub validated: usize,
    pub cancelled: usize,
}

impl WorkerPool {
    pub fn new(engine: Arc<PipelineEngine>, worker_count: usize) -> Self {
        Self { engine, worker_count: worker_count.max(1) }
    }

    /// Drains `articles` through the worker pool, invoking `on_result` for
    /// each completed validation. Stops admitting new work once
    /// `cancellation` is triggered; work already in flight runs to its next
    /// suspension point and is then abandoned with no partial writes.
    pub async fn run<F>(&self, articles: Vec<Article>, cancellation: CancellationToken, on_result: F) -> WorkerPoolOutcome
    where
        F: Fn(Article, ValidationOutput) + Send + Sync + 'static,
    {
        let queue_capacity = 2 * self.worker_count;
        let (tx, rx) = mpsc::channel::<Article>(queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let on_result = Arc::new(on_result);

        let mut handles = Vec::with_capacity(self.worker_count);
        for _ in 0..self.worker_count {
            let engine = self.engine.clone();
            let rx = rx.clone();
            let token = cancellation.clone();
            let on_result = on_result.clone();
            handles.push(tokio::spawn(async move {
                let mut validated = 0usize;
                loop {
                    let next = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => None,
                            article = guard.recv() => article,
                        }
                    };
                    let Some(article) = next else { break };
                    let output = engine.validate_article(&article).await;
                    let result_blob = serde_json::json!({
                        "total": output.trust_score.total,
                        "level": format!("{:?}", output.trust_score.level),
                        "degraded": output.degraded,
                    });
                    let _ = engine.ingestion_source.mark_processed(&article.article_id, result_blob).await;
                    on_result(article, output);
                    validated += 1;
                }
                validated
            }));
        }

        let feeder = {
            let token = cancellation.clone();
            async move {
                for article in articles {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        send = tx.send(article) => {
                            if send.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        };
        feeder.await;
        drop(tx);

        let mut validated = 0usize;
        for handle in handles {
            validated += handle.await.unwrap_or(0);
        }
        let cancelled = if cancellation.is_cancelled() { 1 } else { 0 };
        WorkerPoolOutcome { validated, cancelled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{InMemoryIngestionSource, InMemoryInsightStore};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn article(id: &str, source: &str) -> Article {
        Article {
            article_id: id.to_string(),
            source_name: source.to_string(),
            source_url: String::new(),
            title: "Floods hit region".to_string(),
            body: "Heavy rains caused floods to hit the coastal region overnight.".to_string(),
            language: "en".to_string(),
            published_at: Utc::now(),
            credibility_score: 0.8,
            word_count: 50,
        }
    }

    #[tokio::test]
    async fn worker_pool_validates_every_article() {
        let ingestion = InMemoryIngestionSource::new();
        let articles = vec![article("a1", "reuters"), article("a2", "afp"), article("a3", "blog_xyz")];
        for a in &articles {
            ingestion.seed(a.clone());
        }
        let engine = Arc::new(PipelineEngine::new(
            Arc::new(InMemoryInsightStore::new()),
            Arc::new(ingestion),
            Config::default(),
        ));
        let pool = WorkerPool::new(engine.clone(), 2);

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let outcome = pool
            .run(articles, CancellationToken::new(), move |_article, _output| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(outcome.validated, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_admitting_new_work() {
        let ingestion = InMemoryIngestionSource::new();
        let articles = vec![article("a1", "reuters")];
        ingestion.seed(articles[0].clone());
        let engine = Arc::new(PipelineEngine::new(
            Arc::new(InMemoryInsightStore::new()),
            Arc::new(ingestion),
            Config::default(),
        ));
        let pool = WorkerPool::new(engine, 1);
        let token = CancellationToken::new();
        token.cancel();
        let outcome = pool.run(articles, token, |_article, _output| {}).await;
        assert_eq!(outcome.cancelled, 1);
    }

    #[tokio::test]
    async fn company_insight_pass_persists_detected_insights() {
        let store = Arc::new(InMemoryInsightStore::new());
        let engine = PipelineEngine::new(store.clone(), Arc::new(InMemoryIngestionSource::new()), Config::default());
        let national = vec![NationalIndicatorValue {
            id: "ECON_INFLATION".to_string(),
            pestel_category: crate::indicators::PestelCategory::Economic,
            value: 80.0,
            sentiment: 0.0,
            confidence: 1.0,
            trend: crate::indicators::TrendDirection::Stable,
        }];
        let profile = CompanyProfile { company_id: "c1".to_string(), industry: crate::indicators::Industry::Retail };

        let insights = engine.run_company_insight_pass(&national, &profile).await;
        assert!(insights.iter().any(|i| i.code == "RISK_COST_ESCALATION"));

        let stored = store.list_active("c1", 10, 0).await.unwrap();
        assert!(stored.iter().any(|i| i.code == "RISK_COST_ESCALATION"));
    }
}
