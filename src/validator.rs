//! Cross-Source Validator (spec §4.5) — the orchestrator.
//!
//! The only component that touches both the claim cache and the reputation
//! tracker in one call, matching the ownership rule in §3 ("the Cross-Source
//! Validator exclusively owns Article/Claim caches and the results cache").

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;

use crate::claims::{ClaimExtractor, ExtractedClaim};
use crate::corroboration::CorroborationEngine;
use crate::corroboration::CorroborationResult;
use crate::reputation::ReputationTracker;
use crate::trust::{TrustCalculator, TrustLevel, TrustScore};

#[derive(Debug, Clone)]
pub struct ValidationOutput {
    pub trust_score: TrustScore,
    pub claims: Vec<ExtractedClaim>,
    pub corroboration: CorroborationResult,
    pub reputation_snapshot: f64,
    pub degraded: bool,
    pub degraded_reason: Option<String>,
}

pub struct ValidationInput {
    pub article_id: String,
    pub content: String,
    pub title: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
}

const RESULT_CACHE_TTL_SECS: i64 = 3600;

pub struct CrossSourceValidator {
    reputation_tracker: Arc<ReputationTracker>,
    claim_extractor: ClaimExtractor,
    corroboration_engine: CorroborationEngine,
    trust_calculator: TrustCalculator,
    result_cache: DashMap<String, (ValidationOutput, DateTime<Utc>)>,
}

impl CrossSourceValidator {
    pub fn new(reputation_tracker: Arc<ReputationTracker>, corroboration_window: Duration) -> Self {
        let corroboration_engine = CorroborationEngine::new(reputation_tracker.clone(), corroboration_window);
        let trust_calculator = TrustCalculator::new(reputation_tracker.clone());
        Self {
            reputation_tracker,
            claim_extractor: ClaimExtractor::new(),
            corroboration_engine,
            trust_calculator,
            result_cache: DashMap::new(),
        }
    }

    pub fn set_similarity_provider(&mut self, provider: Arc<dyn crate::stores::traits::SimilarityProvider>) {
        self.corroboration_engine.set_similarity_provider(provider);
    }

    pub async fn validate(&self, input: ValidationInput) -> ValidationOutput {
        if let Some(cached) = self.result_cache.get(&input.article_id) {
            let (output, cached_at) = &*cached;
            if (Utc::now() - *cached_at).num_seconds() < RESULT_CACHE_TTL_SECS {
                return output.clone();
            }
        }

        self.reputation_tracker.record_article(&input.source_name);

        let claims = self.claim_extractor.extract_claims(
            &input.content,
            &input.title,
            &input.article_id,
            &input.source_name,
        );

        self.corroboration_engine.add_article_to_cache(
            &input.article_id,
            &input.content,
            &input.title,
            &input.source_name,
            input.published_at,
            claims.clone(),
        );

        let corroboration = self
            .corroboration_engine
            .find_corroboration(
                &input.article_id,
                &input.content,
                &input.title,
                &input.source_name,
                input.published_at,
                claims.clone(),
            )
            .await;

        let trust_score = self.trust_calculator.calculate_trust(
            &input.article_id,
            &input.source_name,
            Some(&corroboration),
            input.published_at,
        );

        if !corroboration.corroborating_articles.is_empty() {
            let confirming: Vec<String> =
                corroboration.corroborating_articles.iter().map(|a| a.source_name.clone()).collect();
            self.reputation_tracker.record_confirmation(
                &input.source_name,
                &confirming,
                corroboration.is_first_to_report,
            );
        }
        if !corroboration.conflicting_articles.is_empty() {
            let conflicting: Vec<String> =
                corroboration.conflicting_articles.iter().map(|a| a.source_name.clone()).collect();
            self.reputation_tracker.record_contradiction(&input.source_name, &conflicting);
        }

        let output = ValidationOutput {
            trust_score,
            claims,
            corroboration,
            reputation_snapshot: self.reputation_tracker.get_reputation_score(&input.source_name),
            degraded: false,
            degraded_reason: None,
        };

        self.result_cache.insert(input.article_id.clone(), (output.clone(), Utc::now()));
        output
    }

    /// Degraded fallback: `ts = reputation * 0.3`, Unverified level, confidence 0.3.
    pub fn degraded_output(&self, source_name: &str, reason: &str) -> ValidationOutput {
        let reputation = self.reputation_tracker.get_reputation_score(source_name);
        let degraded_total = reputation * 0.3;
        let now = Utc::now();
        let zero_factor = |name: &'static str| crate::trust::TrustFactor {
            name,
            score: 0.0,
            weight: 0.0,
            weighted: 0.0,
            details: "unavailable: degraded".to_string(),
        };
        ValidationOutput {
            trust_score: TrustScore {
                article_id: String::new(),
                source_name: source_name.to_string(),
                total: degraded_total.clamp(0.0, 100.0),
                level: TrustLevel::Unverified,
                source_reputation: zero_factor("source_reputation"),
                corroboration: zero_factor("corroboration"),
                source_diversity: zero_factor("source_diversity"),
                recency: zero_factor("recency"),
                has_official_confirmation: false,
                has_conflicts: false,
                conflict_severity: 0.0,
                confidence: 0.3,
                calculated_at: now,
            },
            claims: Vec::new(),
            corroboration: CorroborationResult {
                article_id: String::new(),
                source_name: source_name.to_string(),
                level: crate::corroboration::CorroborationLevel::None,
                score: 0.0,
                corroborating_articles: Vec::new(),
                conflicting_articles: Vec::new(),
                unique_sources: 0,
                tiers_represented: Vec::new(),
                earliest_report: now,
                is_first_to_report: true,
                analyzed_at: now,
            },
            reputation_snapshot: reputation,
            degraded: true,
            degraded_reason: Some(reason.to_string()),
        }
    }

    /// Two passes: first adds every article to the corroboration cache, then
    /// validates each — within-batch corroboration is symmetric this way.
    pub async fn validate_batch(&self, inputs: Vec<ValidationInput>) -> Vec<ValidationOutput> {
        let mut claims_by_article = std::collections::HashMap::new();
        for input in &inputs {
            self.reputation_tracker.record_article(&input.source_name);
            let claims = self.claim_extractor.extract_claims(
                &input.content,
                &input.title,
                &input.article_id,
                &input.source_name,
            );
            self.corroboration_engine.add_article_to_cache(
                &input.article_id,
                &input.content,
                &input.title,
                &input.source_name,
                input.published_at,
                claims.clone(),
            );
            claims_by_article.insert(input.article_id.clone(), claims);
        }

        // Every article is already in the corroboration cache, so the second
        // pass has no ordering dependency between articles; run it
        // concurrently instead of one `.await` at a time.
        let pending = inputs.into_iter().map(|input| {
            let claims = claims_by_article.remove(&input.article_id).unwrap_or_default();
            self.validate_one(input, claims)
        });
        join_all(pending).await
    }

    async fn validate_one(&self, input: ValidationInput, claims: Vec<ExtractedClaim>) -> ValidationOutput {
        let corroboration = self
            .corroboration_engine
            .find_corroboration(
                &input.article_id,
                &input.content,
                &input.title,
                &input.source_name,
                input.published_at,
                claims.clone(),
            )
            .await;

        let trust_score = self.trust_calculator.calculate_trust(
            &input.article_id,
            &input.source_name,
            Some(&corroboration),
            input.published_at,
        );

        if !corroboration.corroborating_articles.is_empty() {
            let confirming: Vec<String> =
                corroboration.corroborating_articles.iter().map(|a| a.source_name.clone()).collect();
            self.reputation_tracker.record_confirmation(
                &input.source_name,
                &confirming,
                corroboration.is_first_to_report,
            );
        }
        if !corroboration.conflicting_articles.is_empty() {
            let conflicting: Vec<String> =
                corroboration.conflicting_articles.iter().map(|a| a.source_name.clone()).collect();
            self.reputation_tracker.record_contradiction(&input.source_name, &conflicting);
        }

        let output = ValidationOutput {
            trust_score,
            claims,
            corroboration,
            reputation_snapshot: self.reputation_tracker.get_reputation_score(&input.source_name),
            degraded: false,
            degraded_reason: None,
        };
        self.result_cache.insert(input.article_id.clone(), (output.clone(), Utc::now()));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> CrossSourceValidator {
        CrossSourceValidator::new(Arc::new(ReputationTracker::default()), Duration::from_secs(72 * 3600))
    }

    #[tokio::test]
    async fn validate_single_article_produces_trust_score() {
        let v = validator();
        let output = v
            .validate(ValidationInput {
                article_id: "a1".into(),
                content: "Inflation increased by 12 percent nationwide.".into(),
                title: "Inflation surges".into(),
                source_name: "reuters".into(),
                published_at: Utc::now(),
            })
            .await;
        assert!(output.trust_score.total >= 0.0 && output.trust_score.total <= 100.0);
        assert!(!output.degraded);
    }

    #[tokio::test]
    async fn validate_batch_is_symmetric_within_batch() {
        let v = validator();
        let now = Utc::now();
        let inputs = vec![
            ValidationInput {
                article_id: "a1".into(),
                content: "Inflation increased by 12 percent nationwide.".into(),
                title: "Inflation surges".into(),
                source_name: "reuters".into(),
                published_at: now,
            },
            ValidationInput {
                article_id: "a2".into(),
                content: "Inflation increased by 12 percent nationwide.".into(),
                title: "Inflation surges".into(),
                source_name: "afp".into(),
                published_at: now,
            },
        ];
        let outputs = v.validate_batch(inputs).await;
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].corroboration.unique_sources, 1);
        assert_eq!(outputs[1].corroboration.unique_sources, 1);
    }

    #[test]
    fn degraded_output_uses_reputation_times_point_three() {
        let v = validator();
        let output = v.degraded_output("reuters", "similarity_provider_failed");
        assert!(output.degraded);
        assert_eq!(output.trust_score.confidence, 0.3);
        assert_eq!(output.trust_score.level, TrustLevel::Unverified);
    }

    #[tokio::test]
    async fn repeated_validate_within_ttl_returns_cached_result() {
        let v = validator();
        let input = ValidationInput {
            article_id: "a1".into(),
            content: "content".into(),
            title: "title".into(),
            source_name: "reuters".into(),
            published_at: Utc::now(),
        };
        let first = v
            .validate(ValidationInput {
                article_id: input.article_id.clone(),
                content: input.content.clone(),
                title: input.title.clone(),
                source_name: input.source_name.clone(),
                published_at: input.published_at,
            })
            .await;
        let second = v.validate(input).await;
        assert_eq!(first.trust_score.calculated_at, second.trust_score.calculated_at);
    }
}
