//! Risk/Opportunity Detectors (spec §4.7a)
//!
//! Rule-based scanning of `OperationalIndicators`. Each rule has fixed
//! probability/impact bases, an urgency 1-5, and a confidence; `final_score`
//! folds them into one 0-100 number the same way across every rule, so
//! adding a rule is a data change, not a new algorithm.
//!
//! A rule whose referenced indicator is absent from the operational
//! snapshot is a `RuleMisconfiguration` (spec §7): it is logged once and
//! skipped, the remaining rules still run.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::indicators::{OperationalIndicatorValue, OperationalIndicators, TrendDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightKind {
    Risk,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Severity::Critical
        } else if score >= 60.0 {
            Severity::High
        } else if score >= 40.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightStatus {
    Active,
    Acknowledged,
    Resolved,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub company_id: String,
    pub kind: InsightKind,
    pub code: String,
    pub title: String,
    pub description: String,
    pub probability: f64,
    pub impact: f64,
    pub urgency: u8,
    pub confidence: f64,
    pub final_score: f64,
    pub severity: Severity,
    pub status: InsightStatus,
    pub triggering_indicators: Vec<(String, f64)>,
    pub created_at: DateTime<Utc>,
    pub expected_impact_time: Option<DateTime<Utc>>,
    pub expected_duration_hours: Option<u32>,
}

impl Insight {
    pub fn acknowledge(&mut self) -> bool {
        if matches!(self.status, InsightStatus::Active) {
            self.status = InsightStatus::Acknowledged;
            true
        } else {
            false
        }
    }

    pub fn resolve(&mut self) -> bool {
        if matches!(self.status, InsightStatus::Active | InsightStatus::Acknowledged) {
            self.status = InsightStatus::Resolved;
            true
        } else {
            false
        }
    }

    /// Background sweep: `now > expected_by + 7 days`.
    pub fn expire_if_overdue(&mut self, now: DateTime<Utc>) -> bool {
        if !matches!(self.status, InsightStatus::Active | InsightStatus::Acknowledged) {
            return false;
        }
        let Some(expected_by) = self.expected_impact_time else { return false };
        if now > expected_by + chrono::Duration::days(7) {
            self.status = InsightStatus::Expired;
            true
        } else {
            false
        }
    }
}

struct Rule {
    code: &'static str,
    kind: InsightKind,
    indicator: &'static str,
    condition: fn(value: f64, trend: TrendDirection) -> bool,
    probability_base: f64,
    impact_base: f64,
    urgency: u8,
    confidence: f64,
    title: &'static str,
}

/// `final_score = (probability*0.4 + impact*0.4 + urgency_normalized*0.2) * confidence`,
/// identical across every rule (spec §4.7).
fn final_score(probability: f64, impact: f64, urgency: u8, confidence: f64) -> f64 {
    let urgency_normalized = urgency as f64 / 5.0 * 100.0;
    ((probability * 0.4 + impact * 0.4 + urgency_normalized * 0.2) * confidence).clamp(0.0, 100.0)
}

fn rules() -> &'static [Rule] {
    use InsightKind::*;
    use TrendDirection::Falling;
    &[
        Rule {
            code: "RISK_SUPPLY_CHAIN",
            kind: Risk,
            indicator: "OPS_SUPPLY_CHAIN",
            condition: |v, t| v < 45.0 && t == Falling,
            probability_base: 70.0,
            impact_base: 75.0,
            urgency: 4,
            confidence: 0.85,
            title: "Supply chain disruption risk",
        },
        Rule {
            code: "RISK_COST_ESCALATION",
            kind: Risk,
            indicator: "OPS_COST_PRESSURE",
            condition: |v, _| v > 75.0,
            probability_base: 75.0,
            impact_base: 70.0,
            urgency: 4,
            confidence: 0.85,
            title: "Cost escalation risk",
        },
        Rule {
            code: "OPP_DEMAND_SURGE",
            kind: Opportunity,
            indicator: "OPS_MARKET_CONDITIONS",
            condition: |v, _| v > 80.0,
            probability_base: 70.0,
            impact_base: 75.0,
            urgency: 3,
            confidence: 0.8,
            title: "Demand surge opportunity",
        },
        // Supplemental rules (SPEC_FULL.md §4.7), same structure and
        // scoring convention as the documented examples above.
        Rule {
            code: "RISK_WORKFORCE_SHORTAGE",
            kind: Risk,
            indicator: "OPS_WORKFORCE",
            condition: |v, t| v < 40.0 && t == Falling,
            probability_base: 65.0,
            impact_base: 70.0,
            urgency: 4,
            confidence: 0.8,
            title: "Workforce shortage risk",
        },
        Rule {
            code: "RISK_REGULATORY_PRESSURE",
            kind: Risk,
            indicator: "OPS_REGULATORY",
            condition: |v, _| v > 75.0,
            probability_base: 70.0,
            impact_base: 65.0,
            urgency: 3,
            confidence: 0.8,
            title: "Regulatory pressure risk",
        },
        Rule {
            code: "RISK_MARKET_CONTRACTION",
            kind: Risk,
            indicator: "OPS_MARKET_CONDITIONS",
            condition: |v, _| v < 35.0,
            probability_base: 65.0,
            impact_base: 70.0,
            urgency: 4,
            confidence: 0.8,
            title: "Market contraction risk",
        },
        Rule {
            code: "RISK_INFRASTRUCTURE_STRAIN",
            kind: Risk,
            indicator: "OPS_INFRASTRUCTURE",
            condition: |v, t| v < 40.0 && t == Falling,
            probability_base: 60.0,
            impact_base: 65.0,
            urgency: 3,
            confidence: 0.75,
            title: "Infrastructure strain risk",
        },
        Rule {
            code: "RISK_FINANCIAL_STRESS",
            kind: Risk,
            indicator: "OPS_FINANCIAL",
            condition: |v, _| v < 35.0,
            probability_base: 70.0,
            impact_base: 75.0,
            urgency: 5,
            confidence: 0.85,
            title: "Financial stress risk",
        },
        Rule {
            code: "OPP_COST_RELIEF",
            kind: Opportunity,
            indicator: "OPS_COST_PRESSURE",
            condition: |v, t| v < 30.0 && t == Falling,
            probability_base: 60.0,
            impact_base: 60.0,
            urgency: 2,
            confidence: 0.75,
            title: "Cost relief opportunity",
        },
        Rule {
            code: "OPP_REGULATORY_EASING",
            kind: Opportunity,
            indicator: "OPS_REGULATORY",
            condition: |v, _| v < 30.0,
            probability_base: 55.0,
            impact_base: 55.0,
            urgency: 2,
            confidence: 0.7,
            title: "Regulatory easing opportunity",
        },
        Rule {
            code: "OPP_SUPPLY_CHAIN_RESILIENCE",
            kind: Opportunity,
            indicator: "OPS_SUPPLY_CHAIN",
            condition: |v, _| v > 80.0,
            probability_base: 60.0,
            impact_base: 60.0,
            urgency: 2,
            confidence: 0.75,
            title: "Supply chain resilience opportunity",
        },
    ]
}

pub struct RiskOpportunityDetector;

impl RiskOpportunityDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, company_id: &str, operational: &OperationalIndicators) -> Vec<Insight> {
        let mut insights = Vec::new();
        let now = Utc::now();

        for rule in rules() {
            let Some(indicator) = operational.named_indicators.get(rule.indicator) else {
                warn!("RuleMisconfiguration: rule {} references missing indicator {}", rule.code, rule.indicator);
                continue;
            };

            if !(rule.condition)(indicator.value, indicator.trend) {
                continue;
            }

            insights.push(build_insight(company_id, rule, indicator, now));
        }

        insights
    }
}

impl Default for RiskOpportunityDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn build_insight(
    company_id: &str,
    rule: &Rule,
    indicator: &OperationalIndicatorValue,
    now: DateTime<Utc>,
) -> Insight {
    let score = final_score(rule.probability_base, rule.impact_base, rule.urgency, rule.confidence);
    Insight {
        id: Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        kind: rule.kind,
        code: rule.code.to_string(),
        title: rule.title.to_string(),
        description: format!("{} triggered by {} at {:.1}", rule.title, rule.indicator, indicator.value),
        probability: rule.probability_base,
        impact: rule.impact_base,
        urgency: rule.urgency,
        confidence: rule.confidence,
        final_score: score,
        severity: Severity::from_score(score),
        status: InsightStatus::Active,
        triggering_indicators: vec![(rule.indicator.to_string(), indicator.value)],
        created_at: now,
        expected_impact_time: None,
        expected_duration_hours: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{CompanyProfile, Industry, IndicatorProjectionEngine, NationalIndicatorValue, PestelCategory};

    #[test]
    fn s5_cost_escalation_fires_at_high_severity() {
        let projection = IndicatorProjectionEngine::new();
        let national = vec![NationalIndicatorValue {
            id: "ECON_INFLATION".to_string(),
            pestel_category: PestelCategory::Economic,
            value: 80.0,
            sentiment: 0.0,
            confidence: 1.0,
            trend: TrendDirection::Stable,
        }];
        let profile = CompanyProfile { company_id: "c1".to_string(), industry: Industry::Retail };
        let operational = projection.project(&national, &profile);

        let detector = RiskOpportunityDetector::new();
        let insights = detector.detect("c1", &operational);

        let cost_risk = insights.iter().find(|i| i.code == "RISK_COST_ESCALATION").unwrap();
        assert_eq!(cost_risk.severity, Severity::High);
        assert!(cost_risk.final_score >= 60.0 && cost_risk.final_score < 80.0);
    }

    #[test]
    fn no_trigger_conditions_yield_no_insights() {
        let projection = IndicatorProjectionEngine::new();
        let operational = projection.project(&[], &CompanyProfile { company_id: "c1".to_string(), industry: Industry::Other });
        let detector = RiskOpportunityDetector::new();
        let insights = detector.detect("c1", &operational);
        assert!(insights.is_empty());
    }

    #[test]
    fn insight_state_machine_rejects_transitions_out_of_terminal_states() {
        let mut insight = Insight {
            id: "i1".to_string(),
            company_id: "c1".to_string(),
            kind: InsightKind::Risk,
            code: "RISK_SUPPLY_CHAIN".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            probability: 70.0,
            impact: 75.0,
            urgency: 4,
            confidence: 0.85,
            final_score: 70.0,
            severity: Severity::High,
            status: InsightStatus::Active,
            triggering_indicators: vec![],
            created_at: Utc::now(),
            expected_impact_time: None,
            expected_duration_hours: None,
        };
        assert!(insight.resolve());
        assert_eq!(insight.status, InsightStatus::Resolved);
        assert!(!insight.acknowledge());
        assert!(!insight.resolve());
    }

    #[test]
    fn severity_buckets_match_documented_thresholds() {
        assert_eq!(Severity::from_score(85.0), Severity::Critical);
        assert_eq!(Severity::from_score(65.0), Severity::High);
        assert_eq!(Severity::from_score(45.0), Severity::Medium);
        assert_eq!(Severity::from_score(20.0), Severity::Low);
    }
}
