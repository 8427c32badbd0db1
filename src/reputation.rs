//! Source Reputation Tracker (spec §4.1)
//!
//! Tracks per-source reputation with a bounded, time-decayed event log. One
//! `DashMap` entry per normalized source id gives the "one lock per source
//! id" isolation the concurrency model (§5) calls for without a hand-rolled
//! striped lock table.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const MAX_EVENTS_PER_SOURCE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    Official,
    Tier1,
    Tier2,
    Tier3,
    Unknown,
}

impl SourceTier {
    pub fn base_reputation(self) -> f64 {
        match self {
            SourceTier::Official => 95.0,
            SourceTier::Tier1 => 80.0,
            SourceTier::Tier2 => 65.0,
            SourceTier::Tier3 => 40.0,
            SourceTier::Unknown => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceCategory {
    Government,
    Regulatory,
    MainstreamNews,
    RegionalNews,
    WireService,
    SocialMedia,
    Blog,
    Unknown,
}

/// Known source directory: canonical id -> (category, tier). Looked up by
/// exact match first, then substring match in either direction, else
/// `Unknown` — never an error (spec §4.1 "no error propagates").
fn known_sources() -> &'static [(&'static str, SourceCategory, SourceTier)] {
    use SourceCategory::*;
    use SourceTier::*;
    &[
        ("government", Government, Official),
        ("central_bank", Regulatory, Official),
        ("president", Government, Official),
        ("prime_minister", Government, Official),
        ("ministry", Government, Official),
        ("parliament", Government, Official),
        ("met_department", Government, Official),
        ("elections_commission", Government, Official),
        ("reuters", WireService, Tier1),
        ("afp", WireService, Tier1),
        ("ap", WireService, Tier1),
        ("daily_mirror", MainstreamNews, Tier1),
        ("daily_news", MainstreamNews, Tier1),
        ("sunday_times", MainstreamNews, Tier1),
        ("the_island", MainstreamNews, Tier1),
        ("ada_derana", MainstreamNews, Tier1),
        ("hiru_news", MainstreamNews, Tier1),
        ("newsfirst", MainstreamNews, Tier1),
        ("economynext", RegionalNews, Tier2),
        ("colombo_gazette", RegionalNews, Tier2),
        ("news_lk", RegionalNews, Tier2),
        ("ceylon_today", RegionalNews, Tier2),
        ("twitter", SocialMedia, Tier3),
        ("facebook", SocialMedia, Tier3),
    ]
}

/// Normalize a source name to its canonical id: lowercase, spaces/hyphens to
/// underscore.
pub fn normalize_source_id(source_name: &str) -> String {
    source_name
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('-', "_")
}

fn lookup(source_id: &str) -> (SourceCategory, SourceTier) {
    for (known_id, category, tier) in known_sources() {
        if *known_id == source_id {
            return (*category, *tier);
        }
    }
    for (known_id, category, tier) in known_sources() {
        if source_id.contains(known_id) || known_id.contains(source_id.as_str()) {
            return (*category, *tier);
        }
    }
    (SourceCategory::Unknown, SourceTier::Unknown)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReputationEventKind {
    Confirmation,
    Contradiction,
    Correction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationEvent {
    pub kind: ReputationEventKind,
    pub delta: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    pub source_id: String,
    pub source_name: String,
    pub category: SourceCategory,
    pub tier: SourceTier,
    pub base_reputation: f64,
    pub current_reputation: f64,
    pub total_articles: u64,
    #[serde(skip)]
    events: VecDeque<ReputationEvent>,
}

impl Reputation {
    fn new(source_id: String, source_name: String) -> Self {
        let (category, tier) = lookup(&source_id);
        let base = tier.base_reputation();
        Self {
            source_id,
            source_name,
            category,
            tier,
            base_reputation: base,
            current_reputation: base,
            total_articles: 0,
            events: VecDeque::new(),
        }
    }

    pub fn event_log_len(&self) -> usize {
        self.events.len()
    }

    fn push_event(&mut self, kind: ReputationEventKind, delta: f64, now: DateTime<Utc>) {
        self.events.push_back(ReputationEvent { kind, delta, timestamp: now });
        while self.events.len() > MAX_EVENTS_PER_SOURCE {
            self.events.pop_front();
        }
    }

    fn clamp_mutate(&mut self, delta: f64) {
        self.current_reputation = (self.current_reputation + delta).clamp(0.0, 100.0);
    }

    fn recalculate(&mut self, half_life_days: f64, now: DateTime<Utc>) -> f64 {
        if self.events.is_empty() {
            return self.current_reputation;
        }
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for event in &self.events {
            let age_days = (now - event.timestamp).num_seconds() as f64 / 86_400.0;
            let weight = (-std::f64::consts::LN_2 * age_days / half_life_days).exp();
            weighted_sum += event.delta * weight;
            weight_total += weight;
        }
        if weight_total > 0.0 {
            let avg_change = weighted_sum / weight_total;
            self.current_reputation = (self.base_reputation + 5.0 * avg_change).clamp(0.0, 100.0);
        }
        self.current_reputation
    }
}

pub struct ReputationTracker {
    reputations: DashMap<String, Reputation>,
    half_life_days: f64,
}

impl ReputationTracker {
    pub fn new(half_life_days: f64) -> Self {
        Self { reputations: DashMap::new(), half_life_days }
    }

    fn entry(&self, source_name: &str) -> dashmap::mapref::one::RefMut<'_, String, Reputation> {
        let source_id = normalize_source_id(source_name);
        self.reputations
            .entry(source_id.clone())
            .or_insert_with(|| Reputation::new(source_id, source_name.to_string()))
    }

    /// Lazily creates a record if unseen, returning a snapshot.
    pub fn get_reputation(&self, source_name: &str) -> Reputation {
        self.entry(source_name).clone()
    }

    pub fn get_reputation_score(&self, source_name: &str) -> f64 {
        self.entry(source_name).current_reputation
    }

    pub fn get_source_tier(&self, source_name: &str) -> SourceTier {
        self.entry(source_name).tier
    }

    pub fn record_article(&self, source_name: &str) {
        self.entry(source_name).total_articles += 1;
    }

    pub fn record_confirmation(&self, source_name: &str, confirming_sources: &[String], was_first_to_report: bool) {
        let official_confirmers = confirming_sources
            .iter()
            .filter(|s| self.get_source_tier(s) == SourceTier::Official)
            .count();
        let delta = 2.0 + 0.5 * official_confirmers as f64 + if was_first_to_report { 1.5 } else { 0.0 };
        let now = Utc::now();
        let mut rep = self.entry(source_name);
        rep.clamp_mutate(delta);
        rep.push_event(ReputationEventKind::Confirmation, delta, now);
    }

    pub fn record_contradiction(&self, source_name: &str, contradicting_sources: &[String]) {
        let official_contradictors = contradicting_sources
            .iter()
            .filter(|s| self.get_source_tier(s) == SourceTier::Official)
            .count();
        let delta = -(5.0 + 2.0 * official_contradictors as f64);
        let now = Utc::now();
        let mut rep = self.entry(source_name);
        rep.clamp_mutate(delta);
        rep.push_event(ReputationEventKind::Contradiction, delta, now);
    }

    pub fn record_correction(&self, source_name: &str) {
        let now = Utc::now();
        let mut rep = self.entry(source_name);
        rep.clamp_mutate(-1.0);
        rep.push_event(ReputationEventKind::Correction, -1.0, now);
    }

    pub fn recalculate(&self, source_name: &str) -> f64 {
        let now = Utc::now();
        self.entry(source_name).recalculate(self.half_life_days, now)
    }
}

impl Default for ReputationTracker {
    fn default() -> Self {
        Self::new(90.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_source_gets_unknown_base() {
        let tracker = ReputationTracker::default();
        assert_eq!(tracker.get_reputation_score("blog_xyz"), 30.0);
    }

    #[test]
    fn known_tier1_source_gets_80_base() {
        let tracker = ReputationTracker::default();
        assert_eq!(tracker.get_reputation_score("daily_mirror"), 80.0);
    }

    #[test]
    fn confirmation_boost_matches_formula() {
        let tracker = ReputationTracker::default();
        tracker.record_confirmation("daily_mirror", &["reuters".to_string()], true);
        // delta = 2.0 + 0 + 1.5 = 3.5 (reuters is tier_1, not official)
        let rep = tracker.get_reputation("daily_mirror");
        assert!((rep.current_reputation - 83.5).abs() < 1e-9);
        assert_eq!(rep.event_log_len(), 1);
    }

    #[test]
    fn contradiction_with_official_source_matches_formula() {
        let tracker = ReputationTracker::default();
        tracker.record_contradiction("blog_xyz", &["government".to_string()]);
        // delta = -(5 + 2*1) = -7
        let rep = tracker.get_reputation("blog_xyz");
        assert!((rep.current_reputation - 23.0).abs() < 1e-9);
    }

    #[test]
    fn reputation_stays_within_bounds_after_many_events() {
        let tracker = ReputationTracker::default();
        for _ in 0..50 {
            tracker.record_confirmation("reuters", &["government".to_string()], false);
        }
        let rep = tracker.get_reputation("reuters");
        assert!(rep.current_reputation <= 100.0);
        assert!(rep.event_log_len() <= 100);
    }

    #[test]
    fn event_log_capped_at_100() {
        let tracker = ReputationTracker::default();
        for _ in 0..150 {
            tracker.record_correction("island");
        }
        assert!(tracker.get_reputation("island").event_log_len() <= 100);
    }

    #[test]
    fn empty_confirming_sources_leaves_only_base_delta() {
        let tracker = ReputationTracker::default();
        tracker.record_confirmation("island", &[], false);
        let rep = tracker.get_reputation("island");
        assert!((rep.current_reputation - 82.0).abs() < 1e-9); // 80 base + 2.0
        assert_eq!(rep.event_log_len(), 1);
    }
}
