//! Trust Calculator (spec §4.4)
//!
//! Weighted composition of four factors into a single 0-100 trust score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corroboration::CorroborationResult;
use crate::reputation::{ReputationTracker, SourceTier};

const WEIGHT_SOURCE_REPUTATION: f64 = 0.30;
const WEIGHT_CORROBORATION: f64 = 0.35;
const WEIGHT_SOURCE_DIVERSITY: f64 = 0.20;
const WEIGHT_RECENCY: f64 = 0.15;

const THRESHOLD_VERIFIED: f64 = 85.0;
const THRESHOLD_HIGH_TRUST: f64 = 70.0;
const THRESHOLD_MODERATE: f64 = 50.0;
const THRESHOLD_LOW_TRUST: f64 = 30.0;

const MAX_DIVERSITY_SOURCES: f64 = 5.0;
const TIER_DIVERSITY_BONUS: f64 = 10.0;

const RECENCY_WINDOW_HOURS: f64 = 24.0;
const RECENCY_DECAY_HOURS: f64 = 72.0;

const CONFLICT_PENALTY_BASE: f64 = 15.0;
const OFFICIAL_CONFLICT_PENALTY: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustLevel {
    Verified,
    HighTrust,
    Moderate,
    LowTrust,
    Unverified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustFactor {
    pub name: &'static str,
    pub score: f64,
    pub weight: f64,
    pub weighted: f64,
    pub details: String,
}

impl TrustFactor {
    fn new(name: &'static str, score: f64, weight: f64, details: String) -> Self {
        Self { name, score, weight, weighted: score * weight, details }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScore {
    pub article_id: String,
    pub source_name: String,
    pub total: f64,
    pub level: TrustLevel,
    pub source_reputation: TrustFactor,
    pub corroboration: TrustFactor,
    pub source_diversity: TrustFactor,
    pub recency: TrustFactor,
    pub has_official_confirmation: bool,
    pub has_conflicts: bool,
    pub conflict_severity: f64,
    pub confidence: f64,
    pub calculated_at: DateTime<Utc>,
}

impl TrustScore {
    pub fn factors(&self) -> [&TrustFactor; 4] {
        [&self.source_reputation, &self.corroboration, &self.source_diversity, &self.recency]
    }
}

pub struct TrustCalculator {
    reputation_tracker: std::sync::Arc<ReputationTracker>,
}

impl TrustCalculator {
    pub fn new(reputation_tracker: std::sync::Arc<ReputationTracker>) -> Self {
        Self { reputation_tracker }
    }

    pub fn calculate_trust(
        &self,
        article_id: &str,
        source_name: &str,
        corroboration: Option<&CorroborationResult>,
        published_at: DateTime<Utc>,
    ) -> TrustScore {
        let reputation_factor = self.reputation_factor(source_name);
        let corroboration_factor = corroboration_factor(corroboration);
        let diversity_factor = diversity_factor(corroboration);
        let recency_factor = recency_factor(corroboration, published_at);

        let mut total = reputation_factor.weighted
            + corroboration_factor.weighted
            + diversity_factor.weighted
            + recency_factor.weighted;

        let mut has_conflicts = false;
        let mut conflict_severity = 0.0;
        if let Some(corr) = corroboration {
            has_conflicts = !corr.conflicting_articles.is_empty();
            if has_conflicts {
                conflict_severity = conflict_severity_of(corr);
                total -= conflict_severity;
            }
        }

        total = total.clamp(0.0, 100.0);
        let level = trust_level(total);

        let has_official = corroboration
            .map(|c| c.tiers_represented.contains(&SourceTier::Official))
            .unwrap_or(false);

        let confidence = confidence_of(corroboration);

        TrustScore {
            article_id: article_id.to_string(),
            source_name: source_name.to_string(),
            total,
            level,
            source_reputation: reputation_factor,
            corroboration: corroboration_factor,
            source_diversity: diversity_factor,
            recency: recency_factor,
            has_official_confirmation: has_official,
            has_conflicts,
            conflict_severity,
            confidence,
            calculated_at: Utc::now(),
        }
    }

    fn reputation_factor(&self, source_name: &str) -> TrustFactor {
        let rep = self.reputation_tracker.get_reputation(source_name);
        TrustFactor::new(
            "source_reputation",
            rep.current_reputation,
            WEIGHT_SOURCE_REPUTATION,
            format!("{source_name}: {:?} tier, {:.0} reputation", rep.tier, rep.current_reputation),
        )
    }
}

fn corroboration_factor(corroboration: Option<&CorroborationResult>) -> TrustFactor {
    match corroboration {
        None => TrustFactor::new(
            "corroboration",
            30.0,
            WEIGHT_CORROBORATION,
            "No corroboration data available".to_string(),
        ),
        Some(corr) => TrustFactor::new(
            "corroboration",
            corr.score,
            WEIGHT_CORROBORATION,
            format!("{} corroborating sources, level: {:?}", corr.corroborating_articles.len(), corr.level),
        ),
    }
}

fn diversity_factor(corroboration: Option<&CorroborationResult>) -> TrustFactor {
    let Some(corr) = corroboration else {
        return TrustFactor::new(
            "source_diversity",
            0.0,
            WEIGHT_SOURCE_DIVERSITY,
            "No diversity data available".to_string(),
        );
    };

    let source_score = ((corr.unique_sources as f64 / MAX_DIVERSITY_SOURCES) * 100.0).min(100.0);
    let tier_count = corr.tiers_represented.len();
    let mut tier_bonus = (tier_count as f64 * TIER_DIVERSITY_BONUS).min(30.0);
    if corr.tiers_represented.contains(&SourceTier::Official) {
        tier_bonus += 10.0;
    }
    let score = (source_score + tier_bonus).min(100.0);

    TrustFactor::new(
        "source_diversity",
        score,
        WEIGHT_SOURCE_DIVERSITY,
        format!("{} unique sources across {tier_count} tiers", corr.unique_sources),
    )
}

fn recency_factor(corroboration: Option<&CorroborationResult>, published_at: DateTime<Utc>) -> TrustFactor {
    let now = Utc::now();
    let age_hours = (now - published_at).num_seconds() as f64 / 3600.0;

    let mut base_score = if age_hours <= RECENCY_WINDOW_HOURS {
        100.0
    } else if age_hours <= RECENCY_DECAY_HOURS {
        let decay_factor = (age_hours - RECENCY_WINDOW_HOURS) / (RECENCY_DECAY_HOURS - RECENCY_WINDOW_HOURS);
        100.0 - decay_factor * 50.0
    } else {
        (50.0 - (age_hours - RECENCY_DECAY_HOURS) / 24.0 * 5.0).max(20.0)
    };

    if let Some(corr) = corroboration {
        if !corr.corroborating_articles.is_empty() {
            let corr_age = (now - corr.earliest_report).num_seconds() as f64 / 3600.0;
            if corr_age <= RECENCY_WINDOW_HOURS {
                base_score += 10.0;
            }
        }
    }

    let score = base_score.min(100.0);
    TrustFactor::new("recency", score, WEIGHT_RECENCY, format!("Article age: {age_hours:.1}h"))
}

fn conflict_severity_of(corr: &CorroborationResult) -> f64 {
    let severity: f64 = corr
        .conflicting_articles
        .iter()
        .map(|c| if c.source_tier == SourceTier::Official { OFFICIAL_CONFLICT_PENALTY } else { CONFLICT_PENALTY_BASE })
        .sum();
    severity.min(50.0)
}

fn trust_level(score: f64) -> TrustLevel {
    if score >= THRESHOLD_VERIFIED {
        TrustLevel::Verified
    } else if score >= THRESHOLD_HIGH_TRUST {
        TrustLevel::HighTrust
    } else if score >= THRESHOLD_MODERATE {
        TrustLevel::Moderate
    } else if score >= THRESHOLD_LOW_TRUST {
        TrustLevel::LowTrust
    } else {
        TrustLevel::Unverified
    }
}

fn confidence_of(corroboration: Option<&CorroborationResult>) -> f64 {
    let Some(corr) = corroboration else { return 0.5 };
    let mut source_confidence = (0.6 + corr.unique_sources as f64 * 0.1).min(1.0);
    if !corr.conflicting_articles.is_empty() {
        let conflict_factor = 1.0 - corr.conflicting_articles.len() as f64 * 0.1;
        source_confidence *= conflict_factor.max(0.5);
    }
    (source_confidence * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn weights_sum_to_one() {
        let sum = WEIGHT_SOURCE_REPUTATION + WEIGHT_CORROBORATION + WEIGHT_SOURCE_DIVERSITY + WEIGHT_RECENCY;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_corroboration_yields_unverified_or_low_trust() {
        let calc = TrustCalculator::new(Arc::new(ReputationTracker::default()));
        let score = calc.calculate_trust("a1", "blog_xyz", None, Utc::now());
        assert!(score.total <= 100.0 && score.total >= 0.0);
        assert!(!score.has_official_confirmation);
    }

    #[test]
    fn total_is_clamped_and_matches_weighted_sum_minus_conflict_penalty() {
        let calc = TrustCalculator::new(Arc::new(ReputationTracker::default()));
        let score = calc.calculate_trust("a1", "reuters", None, Utc::now());
        let expected_raw: f64 = score.factors().iter().map(|f| f.weighted).sum();
        assert!((score.total - expected_raw.clamp(0.0, 100.0)).abs() < 1e-6);
    }

    #[test]
    fn trust_level_thresholds_are_respected() {
        assert_eq!(trust_level(90.0), TrustLevel::Verified);
        assert_eq!(trust_level(75.0), TrustLevel::HighTrust);
        assert_eq!(trust_level(55.0), TrustLevel::Moderate);
        assert_eq!(trust_level(35.0), TrustLevel::LowTrust);
        assert_eq!(trust_level(10.0), TrustLevel::Unverified);
    }
}
