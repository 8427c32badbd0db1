//! Recommendation Engine (spec §4.7b)
//!
//! Template-based recommendation generation keyed by insight code, action
//! plan assembly, and narrative generation for executive consumption.
//! Grounded directly on the recommendation engine's template registry and
//! prefix-matching lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detectors::{Insight, InsightKind, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationCategory {
    Immediate,
    ShortTerm,
    MediumTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub insight_id: String,
    pub category: RecommendationCategory,
    pub priority: u32,
    pub action: String,
    pub responsible_role: String,
    pub estimated_effort: Effort,
    pub estimated_timeframe: String,
    pub expected_benefit: String,
    pub success_metrics: Vec<String>,
}

struct ActionTemplate {
    action: &'static str,
    responsible: &'static str,
    timeframe: &'static str,
    effort: Effort,
}

struct RecommendationTemplate {
    code: &'static str,
    applicable_to: &'static [&'static str],
    immediate: &'static [ActionTemplate],
    short_term: &'static [ActionTemplate],
    medium_term: &'static [ActionTemplate],
    success_metrics: &'static [&'static str],
}

fn templates() -> &'static [RecommendationTemplate] {
    &[
        RecommendationTemplate {
            code: "RISK_SUPPLY_CHAIN",
            applicable_to: &["RISK_SUPPLY_CHAIN", "RISK_IMPORT"],
            immediate: &[
                ActionTemplate { action: "Contact primary suppliers to assess delivery status", responsible: "Procurement Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Review current inventory levels and identify critical items", responsible: "Inventory Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Activate backup supplier list for critical materials", responsible: "Procurement Manager", timeframe: "24 hours", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Negotiate expedited shipping for critical items", responsible: "Procurement Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Review and adjust production schedule based on available materials", responsible: "Operations Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Communicate potential delays to key customers", responsible: "Sales Manager", timeframe: "48 hours", effort: Effort::Low },
            ],
            medium_term: &[
                ActionTemplate { action: "Diversify supplier base to reduce single-point dependencies", responsible: "Procurement Director", timeframe: "This month", effort: Effort::High },
                ActionTemplate { action: "Increase safety stock levels for critical items", responsible: "Inventory Manager", timeframe: "This month", effort: Effort::Medium },
            ],
            success_metrics: &["Delivery delays < 5%", "No production stoppages", "Customer satisfaction maintained"],
        },
        RecommendationTemplate {
            code: "RISK_REVENUE_DECLINE",
            applicable_to: &["RISK_REVENUE_DECLINE", "RISK_DEMAND", "RISK_MARKET_CONTRACTION"],
            immediate: &[
                ActionTemplate { action: "Analyze sales data to identify declining segments", responsible: "Sales Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Review pricing competitiveness versus market", responsible: "Marketing Manager", timeframe: "24 hours", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Launch targeted promotional campaign for underperforming products", responsible: "Marketing Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Re-engage dormant customers with special offers", responsible: "Sales Team", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Explore new market segments or distribution channels", responsible: "Business Development", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Revenue decline halted", "Customer retention > 90%", "Market share maintained"],
        },
        RecommendationTemplate {
            code: "RISK_COST_ESCALATION",
            applicable_to: &["RISK_COST_ESCALATION", "RISK_COST", "RISK_FINANCIAL_STRESS"],
            immediate: &[
                ActionTemplate { action: "Review all discretionary spending and defer non-essential purchases", responsible: "Finance Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Identify top 5 cost drivers and assess reduction options", responsible: "Operations Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Renegotiate contracts with major suppliers", responsible: "Procurement Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Implement energy-saving measures", responsible: "Facilities Manager", timeframe: "This week", effort: Effort::Low },
            ],
            medium_term: &[
                ActionTemplate { action: "Conduct comprehensive cost audit", responsible: "Finance Director", timeframe: "This month", effort: Effort::High },
                ActionTemplate { action: "Evaluate process automation opportunities", responsible: "Operations Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Cost reduction of 10%", "Margin improvement", "No quality impact"],
        },
        RecommendationTemplate {
            code: "RISK_WORKFORCE",
            applicable_to: &["RISK_WORKFORCE", "RISK_LABOR", "RISK_WORKFORCE_SHORTAGE"],
            immediate: &[
                ActionTemplate { action: "Identify critical roles and single points of failure", responsible: "HR Manager", timeframe: "Today", effort: Effort::Medium },
                ActionTemplate { action: "Assess overtime capacity for remaining staff", responsible: "Operations Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Offer competitive signing bonuses for key hires", responsible: "HR Director", timeframe: "This week", effort: Effort::Low },
                ActionTemplate { action: "Engage staffing agencies for temporary coverage", responsible: "HR Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Build employer brand and employee value proposition", responsible: "HR Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Key positions filled", "Time to hire < 30 days", "Quality of hire high"],
        },
        RecommendationTemplate {
            code: "RISK_POWER",
            applicable_to: &["RISK_POWER", "RISK_INFRASTRUCTURE", "RISK_INFRASTRUCTURE_STRAIN"],
            immediate: &[
                ActionTemplate { action: "Check backup power and failover systems", responsible: "Facilities Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Identify operations most exposed to outages", responsible: "Operations Manager", timeframe: "Today", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Schedule preventive maintenance for critical infrastructure", responsible: "Facilities Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Invest in redundant infrastructure for critical sites", responsible: "Operations Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Uptime maintained", "No unplanned stoppages"],
        },
        RecommendationTemplate {
            code: "RISK_REGULATORY_PRESSURE",
            applicable_to: &["RISK_REGULATORY", "RISK_REGULATORY_PRESSURE"],
            immediate: &[
                ActionTemplate { action: "Review upcoming regulatory changes with legal counsel", responsible: "Compliance Manager", timeframe: "Today", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Update internal policies to align with new requirements", responsible: "Compliance Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Conduct full compliance audit", responsible: "Compliance Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["No compliance violations", "Audit findings resolved"],
        },
        RecommendationTemplate {
            code: "OPP_MARKET_CAPTURE",
            applicable_to: &["OPP_MARKET_CAPTURE", "OPP_COMPETITIVE"],
            immediate: &[
                ActionTemplate { action: "Assess competitor weaknesses in the affected segment", responsible: "Marketing Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Launch targeted campaign to capture displaced demand", responsible: "Marketing Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Expand distribution capacity to sustain gains", responsible: "Operations Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Market share gained", "New customer acquisition up"],
        },
        RecommendationTemplate {
            code: "OPP_PRICING_POWER",
            applicable_to: &["OPP_PRICING_POWER", "OPP_PRICING"],
            immediate: &[
                ActionTemplate { action: "Review pricing elasticity for top products", responsible: "Pricing Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Pilot price adjustments on non-core product lines", responsible: "Pricing Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Roll out revised pricing strategy across the portfolio", responsible: "Pricing Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Margin improvement", "Volume retained"],
        },
        RecommendationTemplate {
            code: "OPP_DEMAND_SURGE",
            applicable_to: &["OPP_DEMAND_SURGE", "OPP_DEMAND"],
            immediate: &[
                ActionTemplate { action: "Confirm inventory and production capacity against surge", responsible: "Operations Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Scale up production or procurement to meet demand", responsible: "Operations Manager", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Expand marketing spend while demand is elevated", responsible: "Marketing Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Evaluate capacity expansion to sustain higher baseline demand", responsible: "Operations Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Demand fulfilled without stockouts", "Revenue growth captured"],
        },
        RecommendationTemplate {
            code: "OPP_DIGITAL_TRANSFORM",
            applicable_to: &["OPP_DIGITAL_TRANSFORM", "OPP_TECHNOLOGY"],
            immediate: &[
                ActionTemplate { action: "Identify manual processes with the highest automation payoff", responsible: "Operations Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Pilot a digital tool in one business unit", responsible: "IT Manager", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Scale successful pilots across the organization", responsible: "IT Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Process cycle time reduced", "Cost per transaction down"],
        },
        RecommendationTemplate {
            code: "OPP_TALENT_ACQUISITION",
            applicable_to: &["OPP_TALENT_ACQUISITION", "OPP_TALENT"],
            immediate: &[
                ActionTemplate { action: "Identify roles where relaxed labor market improves access to talent", responsible: "HR Manager", timeframe: "Today", effort: Effort::Low },
            ],
            short_term: &[
                ActionTemplate { action: "Launch targeted hiring campaign for key roles", responsible: "HR Director", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[
                ActionTemplate { action: "Build a pipeline program for hard-to-fill roles", responsible: "HR Director", timeframe: "This quarter", effort: Effort::High },
            ],
            success_metrics: &["Open roles filled", "Time to hire reduced"],
        },
    ]
}

fn find_template(code: &str) -> Option<&'static RecommendationTemplate> {
    let all = templates();
    if let Some(t) = all.iter().find(|t| t.code == code) {
        return Some(t);
    }
    if let Some(t) = all.iter().find(|t| t.applicable_to.contains(&code)) {
        return Some(t);
    }
    // Prefix match: strip the template code's last "_segment" and check the
    // insight code starts with what remains (e.g. RISK_SUPPLY matches
    // RISK_SUPPLY_CHAIN).
    all.iter().find(|t| {
        let prefix = t.code.rsplit_once('_').map(|(head, _)| head).unwrap_or(t.code);
        code.starts_with(prefix)
    })
}

fn generic_template(kind: InsightKind) -> RecommendationTemplate {
    match kind {
        InsightKind::Risk => RecommendationTemplate {
            code: "GENERIC_RISK",
            applicable_to: &[],
            immediate: &[
                ActionTemplate { action: "Assess the situation and gather more information", responsible: "Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Identify potential impacts on operations", responsible: "Operations", timeframe: "Today", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Develop mitigation plan", responsible: "Management", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Communicate with stakeholders", responsible: "Management", timeframe: "This week", effort: Effort::Low },
            ],
            medium_term: &[],
            success_metrics: &["Risk mitigated", "Operations stable"],
        },
        InsightKind::Opportunity => RecommendationTemplate {
            code: "GENERIC_OPPORTUNITY",
            applicable_to: &[],
            immediate: &[
                ActionTemplate { action: "Assess the opportunity and gather data", responsible: "Manager", timeframe: "Today", effort: Effort::Low },
                ActionTemplate { action: "Identify resources needed to capture opportunity", responsible: "Management", timeframe: "Today", effort: Effort::Medium },
            ],
            short_term: &[
                ActionTemplate { action: "Develop action plan to capture opportunity", responsible: "Management", timeframe: "This week", effort: Effort::Medium },
                ActionTemplate { action: "Allocate resources and begin execution", responsible: "Operations", timeframe: "This week", effort: Effort::Medium },
            ],
            medium_term: &[],
            success_metrics: &["Opportunity captured", "Value realized"],
        },
    }
}

fn expected_benefit(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Risk => "Risk mitigation and operational continuity",
        InsightKind::Opportunity => "Value capture and competitive advantage",
    }
}

pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_recommendations(&self, insight: &Insight) -> Vec<Recommendation> {
        let owned_template;
        let template = match find_template(&insight.code) {
            Some(t) => t,
            None => {
                owned_template = generic_template(insight.kind);
                &owned_template
            }
        };

        let mut recommendations = Vec::new();
        let mut priority = 1;
        let benefit = expected_benefit(insight.kind);
        let metrics: Vec<String> = template.success_metrics.iter().map(|s| s.to_string()).collect();

        for (category, actions) in [
            (RecommendationCategory::Immediate, template.immediate),
            (RecommendationCategory::ShortTerm, template.short_term),
            (RecommendationCategory::MediumTerm, template.medium_term),
        ] {
            for action in actions {
                recommendations.push(Recommendation {
                    insight_id: insight.id.clone(),
                    category,
                    priority,
                    action: action.action.to_string(),
                    responsible_role: action.responsible.to_string(),
                    estimated_effort: action.effort,
                    estimated_timeframe: action.timeframe.to_string(),
                    expected_benefit: benefit.to_string(),
                    success_metrics: metrics.clone(),
                });
                priority += 1;
            }
        }

        recommendations
    }

    pub fn create_action_plan(&self, insight: &Insight, recommendations: &[Recommendation]) -> ActionPlan {
        let mut action_items = Vec::with_capacity(recommendations.len());
        for (idx, rec) in recommendations.iter().enumerate() {
            let step_number = idx + 1;
            let dependencies = if step_number == 1 || rec.category == RecommendationCategory::Immediate {
                None
            } else {
                Some(vec![step_number - 1])
            };
            action_items.push(ActionPlanStep {
                step_number,
                action: rec.action.clone(),
                category: rec.category,
                timeframe: rec.estimated_timeframe.clone(),
                responsible: rec.responsible_role.clone(),
                success_metric: rec.success_metrics.first().cloned().unwrap_or_else(|| "Complete action".to_string()),
                dependencies,
            });
        }

        let plan_title = match insight.kind {
            InsightKind::Risk => format!("Risk Mitigation: {}", insight.title),
            InsightKind::Opportunity => format!("Opportunity Capture: {}", insight.title),
        };

        ActionPlan {
            insight_id: insight.id.clone(),
            insight_title: truncate(&insight.description, 200),
            plan_title: truncate(&plan_title, 200),
            action_items,
            risk_factors: vec!["Resource availability".to_string(), "Timeline constraints".to_string()],
            success_criteria: vec!["All actions completed".to_string(), "Outcome achieved".to_string()],
            created_at: Utc::now(),
        }
    }

    pub fn generate_narrative(&self, insight: &Insight, recommendations: &[Recommendation]) -> NarrativeContent {
        let (emoji, urgency, headline, why_it_matters) = match insight.kind {
            InsightKind::Risk => (
                risk_emoji(insight.severity),
                urgency_indicator(insight.severity),
                format!("Alert: {}", insight.title),
                format!(
                    "This {:?} severity risk has a confidence level of {:.0}%.",
                    insight.severity,
                    insight.confidence * 100.0
                ),
            ),
            InsightKind::Opportunity => {
                let high_priority = matches!(insight.severity, Severity::Critical | Severity::High);
                (
                    if high_priority { "\u{1F3AF}" } else { "\u{1F4A1}" },
                    if high_priority { "THIS WEEK" } else { "THIS MONTH" },
                    format!("Opportunity: {}", insight.title),
                    format!(
                        "This opportunity has a potential value score of {:.1}/10.",
                        insight.impact / 10.0
                    ),
                )
            }
        };

        let immediate_actions: Vec<&str> = recommendations
            .iter()
            .filter(|r| r.category == RecommendationCategory::Immediate)
            .take(2)
            .map(|r| r.action.as_str())
            .collect();
        let what_to_do = if immediate_actions.is_empty() {
            "Review and assess the situation.".to_string()
        } else {
            immediate_actions.join(". ")
        };

        NarrativeContent {
            insight_id: insight.id.clone(),
            emoji: emoji.to_string(),
            headline,
            summary: truncate(&insight.description, 200),
            why_it_matters,
            what_to_do,
            urgency_indicator: urgency.to_string(),
            confidence_statement: "Based on analysis of operational indicators".to_string(),
            generated_at: Utc::now(),
        }
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn risk_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "\u{1F534}",
        Severity::High => "\u{1F7E0}",
        Severity::Medium => "\u{1F7E1}",
        Severity::Low => "\u{1F7E2}",
    }
}

fn urgency_indicator(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "NOW",
        Severity::High => "TODAY",
        Severity::Medium => "THIS WEEK",
        Severity::Low => "THIS MONTH",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max { s.chars().take(max).collect() } else { s.to_string() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlanStep {
    pub step_number: usize,
    pub action: String,
    pub category: RecommendationCategory,
    pub timeframe: String,
    pub responsible: String,
    pub success_metric: String,
    pub dependencies: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub insight_id: String,
    pub insight_title: String,
    pub plan_title: String,
    pub action_items: Vec<ActionPlanStep>,
    pub risk_factors: Vec<String>,
    pub success_criteria: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeContent {
    pub insight_id: String,
    pub emoji: String,
    pub headline: String,
    pub summary: String,
    pub why_it_matters: String,
    pub what_to_do: String,
    pub urgency_indicator: String,
    pub confidence_statement: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::InsightStatus;

    fn sample_insight(code: &str, kind: InsightKind, severity: Severity) -> Insight {
        Insight {
            id: "i1".to_string(),
            company_id: "c1".to_string(),
            kind,
            code: code.to_string(),
            title: "Sample".to_string(),
            description: "Sample description".to_string(),
            probability: 70.0,
            impact: 75.0,
            urgency: 4,
            confidence: 0.85,
            final_score: 70.0,
            severity,
            status: InsightStatus::Active,
            triggering_indicators: vec![],
            created_at: Utc::now(),
            expected_impact_time: None,
            expected_duration_hours: None,
        }
    }

    #[test]
    fn direct_match_finds_supply_chain_template() {
        let insight = sample_insight("RISK_SUPPLY_CHAIN", InsightKind::Risk, Severity::High);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        assert!(!recs.is_empty());
        assert_eq!(recs[0].category, RecommendationCategory::Immediate);
        assert_eq!(recs[0].priority, 1);
    }

    #[test]
    fn s5_cost_escalation_template_yields_one_three_two_split() {
        let insight = sample_insight("RISK_COST_ESCALATION", InsightKind::Risk, Severity::High);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        let immediate = recs.iter().filter(|r| r.category == RecommendationCategory::Immediate).count();
        let short_term = recs.iter().filter(|r| r.category == RecommendationCategory::ShortTerm).count();
        let medium_term = recs.iter().filter(|r| r.category == RecommendationCategory::MediumTerm).count();
        assert_eq!((immediate, short_term, medium_term), (1, 3, 2));
    }

    #[test]
    fn prefix_match_resolves_supplemental_codes() {
        let insight = sample_insight("RISK_COST_ESCALATION", InsightKind::Risk, Severity::High);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        assert!(recs.iter().any(|r| r.action.contains("discretionary spending")));
    }

    #[test]
    fn unmatched_code_falls_back_to_generic_template() {
        let insight = sample_insight("RISK_TOTALLY_UNKNOWN_CODE", InsightKind::Risk, Severity::Medium);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        assert!(!recs.is_empty());
        assert!(recs.iter().any(|r| r.action.contains("Assess the situation")));
    }

    #[test]
    fn priorities_increase_monotonically() {
        let insight = sample_insight("RISK_SUPPLY_CHAIN", InsightKind::Risk, Severity::High);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        for (idx, rec) in recs.iter().enumerate() {
            assert_eq!(rec.priority, idx as u32 + 1);
        }
    }

    #[test]
    fn action_plan_first_step_has_no_dependency() {
        let insight = sample_insight("RISK_SUPPLY_CHAIN", InsightKind::Risk, Severity::High);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        let plan = engine.create_action_plan(&insight, &recs);
        assert!(plan.action_items[0].dependencies.is_none());
    }

    #[test]
    fn narrative_urgency_matches_severity() {
        let insight = sample_insight("RISK_COST_ESCALATION", InsightKind::Risk, Severity::Critical);
        let engine = RecommendationEngine::new();
        let recs = engine.generate_recommendations(&insight);
        let narrative = engine.generate_narrative(&insight, &recs);
        assert_eq!(narrative.urgency_indicator, "NOW");
    }
}
