//! Indicator Projection Engine (spec §4.6)
//!
//! Projects a Layer-2 (national) PESTEL snapshot into Layer-3 (company
//! operational) category health scores, using a fixed PESTEL→operational
//! impact matrix plus a legacy explicit-map override and per-industry
//! sensitivity vectors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PestelCategory {
    Political,
    Economic,
    Social,
    Technological,
    Environmental,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalCategory {
    SupplyChain,
    Workforce,
    Infrastructure,
    CostPressure,
    MarketConditions,
    Financial,
    Regulatory,
}

pub const ALL_OPERATIONAL_CATEGORIES: [OperationalCategory; 7] = [
    OperationalCategory::SupplyChain,
    OperationalCategory::Workforce,
    OperationalCategory::Infrastructure,
    OperationalCategory::CostPressure,
    OperationalCategory::MarketConditions,
    OperationalCategory::Financial,
    OperationalCategory::Regulatory,
];

impl OperationalCategory {
    /// Inverted categories: stored health is `100 - impact` — a high input
    /// burden means low health.
    pub fn is_inverted(self) -> bool {
        matches!(self, OperationalCategory::CostPressure | OperationalCategory::Regulatory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Retail,
    Manufacturing,
    Logistics,
    Hospitality,
    Technology,
    Healthcare,
    Finance,
    Other,
}

/// Fixed 6x7 PESTEL-to-operational impact matrix, verbatim from the
/// original national-to-operational adapter.
fn pestel_to_operational(category: PestelCategory) -> [(OperationalCategory, f64); 7] {
    use OperationalCategory::*;
    use PestelCategory::*;
    match category {
        Political => [
            (SupplyChain, 0.3),
            (Workforce, 0.2),
            (Infrastructure, 0.1),
            (CostPressure, 0.1),
            (MarketConditions, 0.2),
            (Financial, 0.1),
            (Regulatory, 0.5),
        ],
        Economic => [
            (SupplyChain, 0.4),
            (Workforce, 0.2),
            (Infrastructure, 0.1),
            (CostPressure, 0.5),
            (MarketConditions, 0.5),
            (Financial, 0.5),
            (Regulatory, 0.1),
        ],
        Social => [
            (SupplyChain, 0.1),
            (Workforce, 0.5),
            (Infrastructure, 0.1),
            (CostPressure, 0.2),
            (MarketConditions, 0.4),
            (Financial, 0.1),
            (Regulatory, 0.1),
        ],
        Technological => [
            (SupplyChain, 0.2),
            (Workforce, 0.3),
            (Infrastructure, 0.5),
            (CostPressure, 0.2),
            (MarketConditions, 0.3),
            (Financial, 0.2),
            (Regulatory, 0.2),
        ],
        Environmental => [
            (SupplyChain, 0.4),
            (Workforce, 0.2),
            (Infrastructure, 0.4),
            (CostPressure, 0.3),
            (MarketConditions, 0.2),
            (Financial, 0.1),
            (Regulatory, 0.3),
        ],
        Legal => [
            (SupplyChain, 0.2),
            (Workforce, 0.3),
            (Infrastructure, 0.1),
            (CostPressure, 0.4),
            (MarketConditions, 0.2),
            (Financial, 0.3),
            (Regulatory, 0.6),
        ],
    }
}

/// Legacy explicit indicator id -> operational categories override. When an
/// indicator id appears here it replaces the PESTEL matrix mapping entirely.
fn legacy_map(indicator_id: &str) -> Option<&'static [OperationalCategory]> {
    use OperationalCategory::*;
    Some(match indicator_id {
        "ECON_GDP_SENTIMENT" => &[SupplyChain, MarketConditions],
        "ECON_INFLATION" => &[CostPressure, Financial],
        "ECON_EMPLOYMENT" => &[Workforce, MarketConditions],
        "ECON_TRADE_BALANCE" => &[SupplyChain, CostPressure],
        "ECON_INTEREST_RATE" => &[Financial, CostPressure],
        "ECON_CONSUMER_CONFIDENCE" => &[MarketConditions],
        "ECON_BUSINESS_CONFIDENCE" => &[MarketConditions, Financial],
        "POL_STABILITY" => &[SupplyChain, Regulatory],
        "POL_POLICY_CHANGES" => &[Regulatory, CostPressure],
        "POL_CORRUPTION" => &[Regulatory, CostPressure],
        "POL_GOVERNMENT_SPENDING" => &[MarketConditions, Infrastructure],
        "SOC_EMPLOYMENT_TRENDS" => &[Workforce],
        "SOC_CONSUMER_BEHAVIOR" => &[MarketConditions],
        "SOC_EDUCATION" => &[Workforce],
        "SOC_HEALTH_INDEX" => &[Workforce, CostPressure],
        "SOC_MIGRATION" => &[Workforce, MarketConditions],
        "TECH_DIGITAL_ADOPTION" => &[Infrastructure],
        "TECH_INNOVATION" => &[MarketConditions, Infrastructure],
        "TECH_CONNECTIVITY" => &[Infrastructure],
        "TECH_AUTOMATION" => &[Workforce, CostPressure],
        "ENV_CLIMATE_EVENTS" => &[SupplyChain, Infrastructure],
        "ENV_RESOURCE_AVAILABILITY" => &[SupplyChain, CostPressure],
        "ENV_POLLUTION" => &[Regulatory, CostPressure],
        "ENV_SUSTAINABILITY" => &[Regulatory, MarketConditions],
        "LEG_COMPLIANCE" => &[Regulatory, CostPressure],
        "LEG_LABOR_LAWS" => &[Workforce, Regulatory],
        "LEG_TAX_POLICY" => &[Financial, CostPressure],
        "LEG_TRADE_REGULATIONS" => &[SupplyChain, Regulatory],
        _ => return None,
    })
}

/// Per-industry sensitivity vector across the seven operational categories,
/// defaulting to 1.0 everywhere.
fn industry_sensitivity(industry: Industry) -> HashMap<OperationalCategory, f64> {
    use OperationalCategory::*;
    let pairs: [(OperationalCategory, f64); 7] = match industry {
        Industry::Retail => [
            (SupplyChain, 1.2), (Workforce, 0.9), (Infrastructure, 0.8),
            (CostPressure, 1.1), (MarketConditions, 1.3), (Financial, 1.0), (Regulatory, 0.9),
        ],
        Industry::Manufacturing => [
            (SupplyChain, 1.4), (Workforce, 1.1), (Infrastructure, 1.3),
            (CostPressure, 1.2), (MarketConditions, 1.0), (Financial, 1.0), (Regulatory, 1.1),
        ],
        Industry::Logistics => [
            (SupplyChain, 1.5), (Workforce, 1.0), (Infrastructure, 1.4),
            (CostPressure, 1.3), (MarketConditions, 0.9), (Financial, 0.9), (Regulatory, 1.0),
        ],
        Industry::Hospitality => [
            (SupplyChain, 0.8), (Workforce, 1.4), (Infrastructure, 1.0),
            (CostPressure, 1.1), (MarketConditions, 1.4), (Financial, 1.1), (Regulatory, 1.0),
        ],
        Industry::Technology => [
            (SupplyChain, 0.7), (Workforce, 1.3), (Infrastructure, 1.5),
            (CostPressure, 0.9), (MarketConditions, 1.2), (Financial, 1.1), (Regulatory, 1.0),
        ],
        Industry::Healthcare => [
            (SupplyChain, 1.1), (Workforce, 1.4), (Infrastructure, 1.2),
            (CostPressure, 1.0), (MarketConditions, 0.8), (Financial, 1.0), (Regulatory, 1.5),
        ],
        Industry::Finance => [
            (SupplyChain, 0.5), (Workforce, 1.1), (Infrastructure, 1.3),
            (CostPressure, 0.8), (MarketConditions, 1.2), (Financial, 1.5), (Regulatory, 1.4),
        ],
        Industry::Other => [
            (SupplyChain, 1.0), (Workforce, 1.0), (Infrastructure, 1.0),
            (CostPressure, 1.0), (MarketConditions, 1.0), (Financial, 1.0), (Regulatory, 1.0),
        ],
    };
    pairs.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

/// Static description of a national indicator the catalogue knows about, as
/// distinct from a live `NationalIndicatorValue` reading of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub id: String,
    pub pestel_category: PestelCategory,
    pub display_name: String,
}

/// Seed catalogue of known indicator ids, covering at least two per PESTEL
/// category. This is a representative starting set, not the full production
/// catalogue (which is operational data, not code) — callers wire in a
/// larger one via `extend`.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCatalogue {
    definitions: Vec<IndicatorDefinition>,
}

impl IndicatorCatalogue {
    pub fn seed() -> Self {
        use PestelCategory::*;
        let rows = [
            ("ECON_GDP_SENTIMENT", Economic, "GDP growth sentiment"),
            ("ECON_INFLATION", Economic, "Inflation rate"),
            ("POL_STABILITY", Political, "Political stability index"),
            ("POL_POLICY_CHANGES", Political, "Policy change frequency"),
            ("SOC_EMPLOYMENT_TRENDS", Social, "Employment trend index"),
            ("SOC_CONSUMER_BEHAVIOR", Social, "Consumer behavior index"),
            ("TECH_DIGITAL_ADOPTION", Technological, "Digital adoption rate"),
            ("TECH_INNOVATION", Technological, "Innovation index"),
            ("ENV_CLIMATE_EVENTS", Environmental, "Climate event frequency"),
            ("ENV_RESOURCE_AVAILABILITY", Environmental, "Resource availability index"),
            ("LEG_COMPLIANCE", Legal, "Regulatory compliance burden"),
            ("LEG_TRADE_REGULATIONS", Legal, "Trade regulation intensity"),
        ];
        Self {
            definitions: rows
                .into_iter()
                .map(|(id, category, name)| IndicatorDefinition {
                    id: id.to_string(),
                    pestel_category: category,
                    display_name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn extend(&mut self, more: impl IntoIterator<Item = IndicatorDefinition>) {
        self.definitions.extend(more);
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    pub fn by_pestel_category(&self, category: PestelCategory) -> impl Iterator<Item = &IndicatorDefinition> {
        self.definitions.iter().filter(move |d| d.pestel_category == category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationalIndicatorValue {
    pub id: String,
    pub pestel_category: PestelCategory,
    pub value: f64,
    pub sentiment: f64,
    pub confidence: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_id: String,
    pub industry: Industry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalIndicatorValue {
    pub name: String,
    pub value: f64,
    pub trend: TrendDirection,
    pub contributing_indicator_ids: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalIndicators {
    pub health_by_category: HashMap<OperationalCategory, f64>,
    pub overall_health: f64,
    pub critical_issues: Vec<OperationalCategory>,
    pub named_indicators: HashMap<String, OperationalIndicatorValue>,
}

const CONFIDENCE_OPS_INDICATOR: f64 = 0.85;
const HEALTH_CRITICAL_CUTOFF: f64 = 30.0;
const BURDEN_CRITICAL_CUTOFF: f64 = 80.0;

fn ops_indicator_name(category: OperationalCategory) -> &'static str {
    match category {
        OperationalCategory::SupplyChain => "OPS_SUPPLY_CHAIN",
        OperationalCategory::Workforce => "OPS_WORKFORCE",
        OperationalCategory::Infrastructure => "OPS_INFRASTRUCTURE",
        OperationalCategory::CostPressure => "OPS_COST_PRESSURE",
        OperationalCategory::MarketConditions => "OPS_MARKET_CONDITIONS",
        OperationalCategory::Financial => "OPS_FINANCIAL",
        OperationalCategory::Regulatory => "OPS_REGULATORY",
    }
}

pub struct IndicatorProjectionEngine;

impl IndicatorProjectionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn project(&self, indicators: &[NationalIndicatorValue], profile: &CompanyProfile) -> OperationalIndicators {
        let sensitivity = industry_sensitivity(profile.industry);

        let mut buckets: HashMap<OperationalCategory, Vec<&NationalIndicatorValue>> =
            ALL_OPERATIONAL_CATEGORIES.iter().map(|c| (*c, Vec::new())).collect();

        for indicator in indicators {
            if let Some(categories) = legacy_map(&indicator.id) {
                for category in categories {
                    if sensitivity.get(category).copied().unwrap_or(1.0) > 0.5 {
                        buckets.get_mut(category).unwrap().push(indicator);
                    }
                }
            } else {
                for (category, weight) in pestel_to_operational(indicator.pestel_category) {
                    if weight >= 0.2 && sensitivity.get(&category).copied().unwrap_or(1.0) > 0.5 {
                        buckets.get_mut(&category).unwrap().push(indicator);
                    }
                }
            }
        }

        let mut health_by_category = HashMap::new();
        let mut named_indicators = HashMap::new();

        for category in ALL_OPERATIONAL_CATEGORIES {
            let members = &buckets[&category];
            let sens = sensitivity.get(&category).copied().unwrap_or(1.0);
            let impact = category_impact(members, sens);

            let health = if category.is_inverted() { 100.0 - impact } else { impact };
            health_by_category.insert(category, health);

            let trend = members.first().map(|m| m.trend).unwrap_or(TrendDirection::Stable);
            let contributing: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
            named_indicators.insert(
                ops_indicator_name(category).to_string(),
                OperationalIndicatorValue {
                    name: ops_indicator_name(category).to_string(),
                    value: if category.is_inverted() { impact } else { health },
                    trend,
                    contributing_indicator_ids: contributing,
                    confidence: CONFIDENCE_OPS_INDICATOR,
                },
            );
        }

        let overall_health = [
            OperationalCategory::SupplyChain,
            OperationalCategory::Workforce,
            OperationalCategory::Infrastructure,
            OperationalCategory::Financial,
            OperationalCategory::MarketConditions,
        ]
        .iter()
        .map(|c| health_by_category[c])
        .sum::<f64>()
            / 5.0;

        let critical_issues: Vec<OperationalCategory> = ALL_OPERATIONAL_CATEGORIES
            .into_iter()
            .filter(|c| {
                let health = health_by_category[c];
                if c.is_inverted() {
                    100.0 - health > BURDEN_CRITICAL_CUTOFF
                } else {
                    health < HEALTH_CRITICAL_CUTOFF
                }
            })
            .collect();

        OperationalIndicators { health_by_category, overall_health, critical_issues, named_indicators }
    }
}

impl Default for IndicatorProjectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn category_impact(members: &[&NationalIndicatorValue], sensitivity: f64) -> f64 {
    if members.is_empty() {
        return 50.0;
    }
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for ind in members {
        let weight = ind.confidence;
        let value = ind.value * sensitivity;
        weighted_sum += value * weight;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        return 50.0;
    }
    (weighted_sum / total_weight).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_retail_cost_pressure_and_financial_match_worked_example() {
        let engine = IndicatorProjectionEngine::new();
        let indicators = vec![NationalIndicatorValue {
            id: "ECON_INFLATION".to_string(),
            pestel_category: PestelCategory::Economic,
            value: 80.0,
            sentiment: 0.0,
            confidence: 1.0,
            trend: TrendDirection::Stable,
        }];
        let profile = CompanyProfile { company_id: "c1".to_string(), industry: Industry::Retail };

        let result = engine.project(&indicators, &profile);

        let cost_pressure_health = result.health_by_category[&OperationalCategory::CostPressure];
        assert!((cost_pressure_health - 12.0).abs() < 1e-9);

        let financial_health = result.health_by_category[&OperationalCategory::Financial];
        assert!((financial_health - 80.0).abs() < 1e-9);

        assert!((result.overall_health - 56.0).abs() < 1e-9);
    }

    #[test]
    fn empty_indicators_yield_neutral_health_everywhere() {
        let engine = IndicatorProjectionEngine::new();
        let result = engine.project(&[], &CompanyProfile { company_id: "c1".to_string(), industry: Industry::Other });
        for category in ALL_OPERATIONAL_CATEGORIES {
            assert!((result.health_by_category[&category] - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn inverted_categories_satisfy_health_plus_impact_invariant() {
        let engine = IndicatorProjectionEngine::new();
        let indicators = vec![NationalIndicatorValue {
            id: "LEG_COMPLIANCE".to_string(),
            pestel_category: PestelCategory::Legal,
            value: 70.0,
            sentiment: 0.0,
            confidence: 1.0,
            trend: TrendDirection::Rising,
        }];
        let profile = CompanyProfile { company_id: "c1".to_string(), industry: Industry::Other };
        let result = engine.project(&indicators, &profile);
        let health = result.health_by_category[&OperationalCategory::Regulatory];
        let impact = result.named_indicators["OPS_REGULATORY"].value;
        assert!((health + impact - 100.0).abs() < 1e-6);
    }

    #[test]
    fn seed_catalogue_covers_every_pestel_category() {
        let catalogue = IndicatorCatalogue::seed();
        for category in [
            PestelCategory::Political,
            PestelCategory::Economic,
            PestelCategory::Social,
            PestelCategory::Technological,
            PestelCategory::Environmental,
            PestelCategory::Legal,
        ] {
            assert!(catalogue.by_pestel_category(category).count() >= 2);
        }
    }

    #[test]
    fn emits_exactly_seven_operational_categories() {
        let engine = IndicatorProjectionEngine::new();
        let result = engine.project(&[], &CompanyProfile { company_id: "c1".to_string(), industry: Industry::Retail });
        assert_eq!(result.health_by_category.len(), 7);
        assert_eq!(result.named_indicators.len(), 7);
    }
}
