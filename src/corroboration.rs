//! Corroboration Engine (spec §4.3)
//!
//! The local article cache is a `DashMap<ArticleId, CachedArticle>`; pruning
//! runs opportunistically on insert, dropping entries older than
//! `2 * corroboration_window`, matching the teacher's cleanup-on-write style
//! rather than a background sweeper task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::claims::{jaccard_similarity, ExtractedClaim};
use crate::reputation::{ReputationTracker, SourceTier};
use crate::stores::traits::SimilarityProvider;

const STRONG_THRESHOLD: f64 = 0.85;
const MODERATE_THRESHOLD: f64 = 0.70;
const WEAK_THRESHOLD: f64 = 0.55;

const BASE_SCORE: f64 = 30.0;
const PER_SOURCE_BONUS: f64 = 15.0;
const TIER1_BONUS: f64 = 10.0;
const OFFICIAL_BONUS: f64 = 20.0;
const FIRST_TO_REPORT_BONUS: f64 = 5.0;
const CONFLICT_PENALTY: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorroborationLevel {
    Strong,
    Moderate,
    Weak,
    None,
    Conflicting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorroboratingArticle {
    pub article_id: String,
    pub source_name: String,
    pub title: String,
    pub similarity_score: f64,
    pub published_at: DateTime<Utc>,
    pub source_tier: SourceTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingArticle {
    pub article_id: String,
    pub source_name: String,
    pub title: String,
    pub conflict_type: String,
    pub conflict_details: String,
    pub source_tier: SourceTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorroborationResult {
    pub article_id: String,
    pub source_name: String,
    pub level: CorroborationLevel,
    pub score: f64,
    pub corroborating_articles: Vec<CorroboratingArticle>,
    pub conflicting_articles: Vec<ConflictingArticle>,
    pub unique_sources: usize,
    pub tiers_represented: Vec<SourceTier>,
    pub earliest_report: DateTime<Utc>,
    pub is_first_to_report: bool,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Clone)]
struct CachedArticle {
    title: String,
    body: String,
    source_name: String,
    published_at: DateTime<Utc>,
    claims: Vec<ExtractedClaim>,
    cached_at: DateTime<Utc>,
}

const RESULT_CACHE_TTL_SECS: i64 = 3600;

pub struct CorroborationEngine {
    article_cache: DashMap<String, CachedArticle>,
    results_cache: DashMap<String, CorroborationResult>,
    similarity_provider: Option<Arc<dyn SimilarityProvider>>,
    reputation_tracker: Arc<ReputationTracker>,
    window: Duration,
}

impl CorroborationEngine {
    pub fn new(reputation_tracker: Arc<ReputationTracker>, window: Duration) -> Self {
        Self {
            article_cache: DashMap::new(),
            results_cache: DashMap::new(),
            similarity_provider: None,
            reputation_tracker,
            window,
        }
    }

    pub fn set_similarity_provider(&mut self, provider: Arc<dyn SimilarityProvider>) {
        self.similarity_provider = Some(provider);
    }

    pub fn add_article_to_cache(
        &self,
        article_id: &str,
        content: &str,
        title: &str,
        source_name: &str,
        published_at: DateTime<Utc>,
        claims: Vec<ExtractedClaim>,
    ) {
        self.article_cache.insert(
            article_id.to_string(),
            CachedArticle {
                title: title.to_string(),
                body: content.to_string(),
                source_name: source_name.to_string(),
                published_at,
                claims,
                cached_at: Utc::now(),
            },
        );
        self.cleanup_cache();
    }

    fn cleanup_cache(&self) {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.window * 2).unwrap_or(chrono::Duration::hours(144));
        let stale: Vec<String> = self
            .article_cache
            .iter()
            .filter(|e| e.value().cached_at < cutoff)
            .map(|e| e.key().clone())
            .collect();
        for id in stale {
            self.article_cache.remove(&id);
            self.results_cache.remove(&id);
        }
    }

    pub async fn find_corroboration(
        &self,
        article_id: &str,
        content: &str,
        title: &str,
        source_name: &str,
        published_at: DateTime<Utc>,
        claims: Vec<ExtractedClaim>,
    ) -> CorroborationResult {
        if !self.article_cache.contains_key(article_id) {
            self.add_article_to_cache(article_id, content, title, source_name, published_at, claims.clone());
        }

        if let Some(cached) = self.results_cache.get(article_id) {
            let age = (Utc::now() - cached.analyzed_at).num_seconds();
            if age < RESULT_CACHE_TTL_SECS {
                return cached.clone();
            }
        }

        let similar = self.find_similar_articles(article_id, content, title).await;

        let mut corroborating = Vec::new();
        let mut conflicting = Vec::new();
        let mut sources_seen: HashSet<String> = HashSet::new();
        let mut tiers_seen: HashSet<SourceTier> = HashSet::new();
        let mut earliest_time = published_at;

        for similar_article in &similar {
            if similar_article.source_name.to_lowercase() == source_name.to_lowercase() {
                continue;
            }

            let tier = self.reputation_tracker.get_source_tier(&similar_article.source_name);
            let conflict = check_for_conflicts(&claims, &similar_article.claims);

            if let Some((conflict_type, details)) = conflict {
                conflicting.push(ConflictingArticle {
                    article_id: similar_article.article_id.clone(),
                    source_name: similar_article.source_name.clone(),
                    title: similar_article.title.clone(),
                    conflict_type,
                    conflict_details: details,
                    source_tier: tier,
                });
            } else {
                corroborating.push(CorroboratingArticle {
                    article_id: similar_article.article_id.clone(),
                    source_name: similar_article.source_name.clone(),
                    title: similar_article.title.clone(),
                    similarity_score: similar_article.similarity_score,
                    published_at: similar_article.published_at,
                    source_tier: tier,
                });
                sources_seen.insert(similar_article.source_name.clone());
                tiers_seen.insert(tier);
                if similar_article.published_at < earliest_time {
                    earliest_time = similar_article.published_at;
                }
            }
        }

        let level = determine_level(corroborating.len(), conflicting.len(), &tiers_seen);
        let is_first_to_report = published_at <= earliest_time;
        let score = calculate_score(&corroborating, &conflicting, is_first_to_report);

        let result = CorroborationResult {
            article_id: article_id.to_string(),
            source_name: source_name.to_string(),
            level,
            score,
            corroborating_articles: corroborating,
            conflicting_articles: conflicting,
            unique_sources: sources_seen.len(),
            tiers_represented: tiers_seen.into_iter().collect(),
            earliest_report: earliest_time,
            is_first_to_report,
            analyzed_at: Utc::now(),
        };

        self.results_cache.insert(article_id.to_string(), result.clone());
        result
    }

    async fn find_similar_articles(&self, article_id: &str, content: &str, title: &str) -> Vec<SimilarArticle> {
        if let Some(provider) = &self.similarity_provider {
            if let Ok(duplicates) = provider.find_duplicates(article_id, content, title, WEAK_THRESHOLD).await {
                if !duplicates.is_empty() {
                    return duplicates
                        .into_iter()
                        .filter_map(|d| {
                            self.article_cache.get(&d.duplicate_id).map(|cached| SimilarArticle {
                                article_id: d.duplicate_id.clone(),
                                source_name: cached.source_name.clone(),
                                title: cached.title.clone(),
                                similarity_score: d.similarity_score,
                                published_at: cached.published_at,
                                claims: cached.claims.clone(),
                            })
                        })
                        .collect();
                }
            }
        }

        self.find_similar_from_cache(article_id, content, title)
    }

    fn find_similar_from_cache(&self, article_id: &str, content: &str, title: &str) -> Vec<SimilarArticle> {
        let title_words: HashSet<String> = title.to_lowercase().split_whitespace().map(String::from).collect();
        let content_words: HashSet<String> = content
            .to_lowercase()
            .split_whitespace()
            .take(100)
            .map(String::from)
            .collect();

        let mut similar = Vec::new();
        for entry in self.article_cache.iter() {
            if entry.key() == article_id {
                continue;
            }
            let cached = entry.value();
            let cached_title_words: HashSet<String> =
                cached.title.to_lowercase().split_whitespace().map(String::from).collect();
            let cached_content_words: HashSet<String> = cached
                .body
                .to_lowercase()
                .split_whitespace()
                .take(100)
                .map(String::from)
                .collect();

            let title_sim = jaccard(&title_words, &cached_title_words);
            let content_sim = jaccard(&content_words, &cached_content_words);
            let similarity = 0.4 * title_sim + 0.6 * content_sim;

            if similarity >= WEAK_THRESHOLD {
                similar.push(SimilarArticle {
                    article_id: entry.key().clone(),
                    source_name: cached.source_name.clone(),
                    title: cached.title.clone(),
                    similarity_score: similarity,
                    published_at: cached.published_at,
                    claims: cached.claims.clone(),
                });
            }
        }

        similar.sort_by(|a, b| b.similarity_score.partial_cmp(&a.similarity_score).unwrap());
        similar.truncate(10);
        similar
    }
}

struct SimilarArticle {
    article_id: String,
    source_name: String,
    title: String,
    similarity_score: f64,
    published_at: DateTime<Utc>,
    claims: Vec<ExtractedClaim>,
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        a.intersection(b).count() as f64 / union as f64
    }
}

/// Only numeric claims sharing a unit are checked; >20% relative difference
/// is a `value_mismatch`. Qualitative conflicts are out of scope (spec §9
/// Open Question 2).
fn check_for_conflicts(claims1: &[ExtractedClaim], claims2: &[ExtractedClaim]) -> Option<(String, String)> {
    if claims1.is_empty() || claims2.is_empty() {
        return None;
    }
    for c1 in claims1 {
        if c1.kind != crate::claims::ClaimKind::Numeric {
            continue;
        }
        for c2 in claims2 {
            if c2.kind != crate::claims::ClaimKind::Numeric {
                continue;
            }
            if c1.numeric_unit != c2.numeric_unit {
                continue;
            }
            if let (Some(v1), Some(v2)) = (c1.numeric_value, c2.numeric_value) {
                let max_val = v1.abs().max(v2.abs());
                if max_val > 0.0 {
                    let diff = (v1 - v2).abs() / max_val;
                    if diff > 0.2 {
                        return Some((
                            "value_mismatch".to_string(),
                            format!("values differ: {v1} vs {v2}"),
                        ));
                    }
                }
            }
        }
    }
    None
}

fn determine_level(corroborating_count: usize, conflicting_count: usize, tiers: &HashSet<SourceTier>) -> CorroborationLevel {
    if conflicting_count > corroborating_count {
        return CorroborationLevel::Conflicting;
    }
    if corroborating_count >= 3 || tiers.contains(&SourceTier::Official) {
        return CorroborationLevel::Strong;
    }
    if corroborating_count >= 2 || tiers.contains(&SourceTier::Tier1) {
        return CorroborationLevel::Moderate;
    }
    if corroborating_count >= 1 {
        return CorroborationLevel::Weak;
    }
    CorroborationLevel::None
}

fn calculate_score(
    corroborating: &[CorroboratingArticle],
    conflicting: &[ConflictingArticle],
    is_first_to_report: bool,
) -> f64 {
    let mut score = BASE_SCORE;
    for article in corroborating {
        score += PER_SOURCE_BONUS;
        match article.source_tier {
            SourceTier::Official => score += OFFICIAL_BONUS,
            SourceTier::Tier1 => score += TIER1_BONUS,
            _ => {}
        }
    }
    if is_first_to_report && !corroborating.is_empty() {
        score += FIRST_TO_REPORT_BONUS;
    }
    score -= CONFLICT_PENALTY * conflicting.len() as f64;
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimExtractor;

    fn engine() -> CorroborationEngine {
        CorroborationEngine::new(Arc::new(ReputationTracker::default()), Duration::from_secs(72 * 3600))
    }

    #[tokio::test]
    async fn no_other_articles_yields_none_level() {
        let engine = engine();
        let result = engine
            .find_corroboration("a1", "Inflation rose.", "Title", "reuters", Utc::now(), vec![])
            .await;
        assert_eq!(result.level, CorroborationLevel::None);
        assert!((result.score - BASE_SCORE).abs() < 1e-9);
        assert!(result.is_first_to_report);
    }

    #[tokio::test]
    async fn two_corroborating_sources_yields_moderate_or_better() {
        let engine = engine();
        let extractor = ClaimExtractor::new();
        let now = Utc::now();

        let claims_a = extractor.extract_claims("Inflation increased by 12 percent nationwide.", "", "a1", "daily_mirror");
        engine.add_article_to_cache("a2", "Inflation increased by 12 percent nationwide.", "Inflation surges", "reuters", now, claims_a.clone());
        engine.add_article_to_cache("a3", "Inflation increased by 12 percent nationwide.", "Inflation surges", "afp", now, claims_a.clone());

        let result = engine
            .find_corroboration(
                "a1",
                "Inflation increased by 12 percent nationwide.",
                "Inflation surges",
                "daily_mirror",
                now,
                claims_a,
            )
            .await;

        assert!(matches!(result.level, CorroborationLevel::Moderate | CorroborationLevel::Strong));
        assert_eq!(result.unique_sources, 2);
    }

    #[tokio::test]
    async fn conflicting_numeric_claims_mark_conflict() {
        let engine = engine();
        let extractor = ClaimExtractor::new();
        let now = Utc::now();

        let claims_a = extractor.extract_claims("Inflation increased by 12 percent nationwide.", "", "a1", "daily_mirror");
        let claims_b = extractor.extract_claims("Inflation increased by 40 percent nationwide.", "", "a2", "reuters");

        engine.add_article_to_cache("a2", "Inflation increased by 40 percent nationwide.", "Inflation surges", "reuters", now, claims_b);

        let result = engine
            .find_corroboration(
                "a1",
                "Inflation increased by 12 percent nationwide.",
                "Inflation surges",
                "daily_mirror",
                now,
                claims_a,
            )
            .await;

        assert_eq!(result.conflicting_articles.len(), 1);
        assert_eq!(result.level, CorroborationLevel::Conflicting);
    }

    #[tokio::test]
    async fn cached_result_within_ttl_is_reused() {
        let engine = engine();
        let now = Utc::now();
        let first = engine.find_corroboration("a1", "content", "title", "reuters", now, vec![]).await;
        let second = engine.find_corroboration("a1", "content", "title", "reuters", now, vec![]).await;
        assert_eq!(first.analyzed_at, second.analyzed_at);
    }
}
