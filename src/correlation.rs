//! Correlation Analyzer (spec §4.8)
//!
//! Pearson correlation matrix, lead/lag scanning, Granger-style causal
//! inference, and hierarchical clustering over a company's operational
//! indicator time series. Grounded directly on the original correlation
//! analysis module's algorithms.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

const HISTORY_RETENTION_DAYS: i64 = 365;
const DEFAULT_MAX_LAG_DAYS: i32 = 30;
const DEFAULT_LAG_ORDER: usize = 5;
const CAUSALITY_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CorrelationType {
    StrongPositive,
    ModeratePositive,
    WeakPositive,
    None,
    WeakNegative,
    ModerateNegative,
    StrongNegative,
}

fn correlation_type(corr: f64) -> CorrelationType {
    if corr >= 0.7 {
        CorrelationType::StrongPositive
    } else if corr >= 0.4 {
        CorrelationType::ModeratePositive
    } else if corr >= 0.2 {
        CorrelationType::WeakPositive
    } else if corr > -0.2 {
        CorrelationType::None
    } else if corr > -0.4 {
        CorrelationType::WeakNegative
    } else if corr > -0.7 {
        CorrelationType::ModerateNegative
    } else {
        CorrelationType::StrongNegative
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub indicator_a: String,
    pub indicator_b: String,
    pub correlation: f64,
    pub correlation_type: CorrelationType,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub calculated_at: DateTime<Utc>,
    pub correlations: HashMap<String, HashMap<String, f64>>,
    pub pairs: Vec<CorrelationPair>,
    pub strongest_positive: Option<CorrelationPair>,
    pub strongest_negative: Option<CorrelationPair>,
    pub average_correlation: f64,
    pub indicators: Vec<String>,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadLagRelation {
    pub leading_indicator: String,
    pub lagging_indicator: String,
    pub lag_days: i32,
    pub correlation_at_lag: f64,
    pub correlation_type: CorrelationType,
    pub confidence: f64,
    pub predictive_power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CausalDirection {
    ACausesB,
    BCausesA,
    Bidirectional,
    NoCausation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CausalConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalLink {
    pub indicator_a: String,
    pub indicator_b: String,
    pub direction: CausalDirection,
    pub causal_strength: f64,
    pub granger_statistic: f64,
    pub explanation: String,
    pub confidence: CausalConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorCluster {
    pub cluster_id: String,
    pub indicators: Vec<String>,
    pub average_internal_correlation: f64,
    pub centroid_indicator: String,
}

#[derive(Debug, Clone)]
struct DataPoint {
    timestamp: DateTime<Utc>,
    values: HashMap<String, f64>,
}

pub struct CorrelationAnalyzer {
    history: DashMap<String, Vec<DataPoint>>,
}

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self { history: DashMap::new() }
    }

    pub fn add_data_point(&self, company_id: &str, timestamp: DateTime<Utc>, indicators: HashMap<String, f64>) {
        let mut entry = self.history.entry(company_id.to_string()).or_insert_with(Vec::new);
        entry.push(DataPoint { timestamp, values: indicators });
        entry.sort_by_key(|dp| dp.timestamp);
        let cutoff = Utc::now() - chrono::Duration::days(HISTORY_RETENTION_DAYS);
        entry.retain(|dp| dp.timestamp > cutoff);
    }

    pub fn calculate_correlation_matrix(&self, company_id: &str, indicators: Option<&[String]>) -> Option<CorrelationMatrix> {
        let data = self.history.get(company_id)?;
        if data.len() < 2 {
            return None;
        }

        let mut all_indicators: Vec<String> = data
            .iter()
            .flat_map(|dp| dp.values.keys().cloned())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();

        if let Some(wanted) = indicators {
            let wanted_set: std::collections::HashSet<&String> = wanted.iter().collect();
            all_indicators.retain(|i| wanted_set.contains(i));
        }
        all_indicators.sort();

        let mut time_series: HashMap<String, Vec<f64>> = all_indicators.iter().map(|i| (i.clone(), Vec::new())).collect();
        for dp in data.iter() {
            for ind in &all_indicators {
                time_series.get_mut(ind).unwrap().push(dp.values.get(ind).copied().unwrap_or(0.0));
            }
        }

        let mut correlations: HashMap<String, HashMap<String, f64>> = HashMap::new();
        let mut pairs = Vec::new();

        for (i, ind_a) in all_indicators.iter().enumerate() {
            let row = correlations.entry(ind_a.clone()).or_insert_with(HashMap::new);
            row.insert(ind_a.clone(), 1.0);
            for ind_b in all_indicators.iter().skip(i + 1) {
                let corr = pearson_correlation(&time_series[ind_a], &time_series[ind_b]);
                correlations.get_mut(ind_a).unwrap().insert(ind_b.clone(), corr);
                correlations.entry(ind_b.clone()).or_insert_with(HashMap::new).insert(ind_a.clone(), corr);
                pairs.push(CorrelationPair {
                    indicator_a: ind_a.clone(),
                    indicator_b: ind_b.clone(),
                    correlation: corr,
                    correlation_type: correlation_type(corr),
                    sample_size: data.len(),
                });
            }
        }

        let strongest_positive = pairs
            .iter()
            .filter(|p| p.correlation > 0.0)
            .max_by(|a, b| a.correlation.partial_cmp(&b.correlation).unwrap())
            .cloned();
        let strongest_negative = pairs
            .iter()
            .filter(|p| p.correlation < 0.0)
            .min_by(|a, b| a.correlation.partial_cmp(&b.correlation).unwrap())
            .cloned();
        let average_correlation =
            if pairs.is_empty() { 0.0 } else { pairs.iter().map(|p| p.correlation).sum::<f64>() / pairs.len() as f64 };

        Some(CorrelationMatrix {
            calculated_at: Utc::now(),
            correlations,
            pairs,
            strongest_positive,
            strongest_negative,
            average_correlation,
            indicators: all_indicators,
            sample_size: data.len(),
        })
    }

    pub fn detect_lead_lag(&self, company_id: &str, indicator_a: &str, indicator_b: &str, max_lag_days: i32) -> Option<LeadLagRelation> {
        let data = self.history.get(company_id)?;
        if (data.len() as i32) < max_lag_days + 5 {
            return None;
        }

        let series_a: Vec<f64> = data.iter().map(|d| d.values.get(indicator_a).copied().unwrap_or(0.0)).collect();
        let series_b: Vec<f64> = data.iter().map(|d| d.values.get(indicator_b).copied().unwrap_or(0.0)).collect();

        let mut best_lag = 0i32;
        let mut best_correlation = 0.0f64;

        for lag in -max_lag_days..=max_lag_days {
            let (lagged_a, lagged_b) = lagged_series(&series_a, &series_b, lag);
            if lagged_a.len() >= 2 {
                let corr = pearson_correlation(&lagged_a, &lagged_b).abs();
                if corr > best_correlation {
                    best_correlation = corr;
                    best_lag = lag;
                }
            }
        }

        let (leading, lagging, lag_days) = if best_lag > 0 {
            (indicator_a.to_string(), indicator_b.to_string(), best_lag)
        } else if best_lag < 0 {
            (indicator_b.to_string(), indicator_a.to_string(), best_lag.abs())
        } else {
            (indicator_a.to_string(), indicator_b.to_string(), 0)
        };

        let actual_corr = if lag_days > 0 {
            let (a, b) = lagged_series(&series_a, &series_b, best_lag);
            pearson_correlation(&a, &b)
        } else {
            pearson_correlation(&series_a, &series_b)
        };

        Some(LeadLagRelation {
            leading_indicator: leading,
            lagging_indicator: lagging,
            lag_days,
            correlation_at_lag: actual_corr,
            correlation_type: correlation_type(actual_corr),
            confidence: best_correlation,
            predictive_power: best_correlation * best_correlation,
        })
    }

    pub fn infer_causality(&self, company_id: &str, indicator_a: &str, indicator_b: &str, lag_order: usize) -> Option<CausalLink> {
        let data = self.history.get(company_id)?;
        if data.len() < lag_order + 10 {
            return None;
        }

        let series_a: Vec<f64> = data.iter().map(|d| d.values.get(indicator_a).copied().unwrap_or(0.0)).collect();
        let series_b: Vec<f64> = data.iter().map(|d| d.values.get(indicator_b).copied().unwrap_or(0.0)).collect();

        let a_predicts_b = test_predictive_power(&series_a, &series_b, lag_order);
        let b_predicts_a = test_predictive_power(&series_b, &series_a, lag_order);

        let (direction, strength) = if a_predicts_b > CAUSALITY_THRESHOLD && b_predicts_a > CAUSALITY_THRESHOLD {
            (CausalDirection::Bidirectional, (a_predicts_b + b_predicts_a) / 2.0)
        } else if a_predicts_b > CAUSALITY_THRESHOLD {
            (CausalDirection::ACausesB, a_predicts_b)
        } else if b_predicts_a > CAUSALITY_THRESHOLD {
            (CausalDirection::BCausesA, b_predicts_a)
        } else {
            (CausalDirection::NoCausation, 0.0)
        };

        let confidence = if strength >= 0.3 {
            CausalConfidence::High
        } else if strength >= 0.15 {
            CausalConfidence::Medium
        } else {
            CausalConfidence::Low
        };

        let explanation = match direction {
            CausalDirection::ACausesB => format!("Changes in {indicator_a} appear to predict changes in {indicator_b}"),
            CausalDirection::BCausesA => format!("Changes in {indicator_b} appear to predict changes in {indicator_a}"),
            CausalDirection::Bidirectional => format!("{indicator_a} and {indicator_b} appear to mutually influence each other"),
            CausalDirection::NoCausation => format!("No clear causal relationship detected between {indicator_a} and {indicator_b}"),
        };

        Some(CausalLink {
            indicator_a: indicator_a.to_string(),
            indicator_b: indicator_b.to_string(),
            direction,
            causal_strength: strength,
            granger_statistic: a_predicts_b.max(b_predicts_a),
            explanation,
            confidence,
        })
    }

    /// Hierarchical agglomerative clustering: repeatedly merge the two
    /// clusters with the highest average pairwise correlation until only
    /// `num_clusters` remain.
    pub fn cluster_indicators(&self, company_id: &str, num_clusters: usize) -> Vec<IndicatorCluster> {
        let Some(matrix) = self.calculate_correlation_matrix(company_id, None) else { return Vec::new() };
        if matrix.indicators.is_empty() {
            return Vec::new();
        }

        let mut clusters: Vec<Vec<String>> = matrix.indicators.iter().map(|i| vec![i.clone()]).collect();

        while clusters.len() > num_clusters.max(1) {
            let mut best_pair = (0usize, 1usize);
            let mut best_sim = f64::NEG_INFINITY;
            for i in 0..clusters.len() {
                for j in (i + 1)..clusters.len() {
                    let sim = cluster_similarity(&clusters[i], &clusters[j], &matrix);
                    if sim > best_sim {
                        best_sim = sim;
                        best_pair = (i, j);
                    }
                }
            }
            let (i, j) = best_pair;
            let merged = clusters[j].clone();
            clusters[i].extend(merged);
            clusters.remove(j);
        }

        clusters
            .into_iter()
            .enumerate()
            .map(|(idx, members)| {
                let mut internal_corrs = Vec::new();
                for a in 0..members.len() {
                    for b in (a + 1)..members.len() {
                        let corr = matrix.correlations.get(&members[a]).and_then(|row| row.get(&members[b])).copied().unwrap_or(0.0);
                        internal_corrs.push(corr);
                    }
                }
                let average_internal_correlation =
                    if internal_corrs.is_empty() { 0.0 } else { internal_corrs.iter().sum::<f64>() / internal_corrs.len() as f64 };

                let centroid_indicator = members
                    .iter()
                    .max_by(|a, b| {
                        let score_a: f64 = members.iter().filter(|o| *o != *a).map(|o| matrix.correlations.get(*a).and_then(|r| r.get(o)).copied().unwrap_or(0.0).abs()).sum();
                        let score_b: f64 = members.iter().filter(|o| *o != *b).map(|o| matrix.correlations.get(*b).and_then(|r| r.get(o)).copied().unwrap_or(0.0).abs()).sum();
                        score_a.partial_cmp(&score_b).unwrap()
                    })
                    .cloned()
                    .unwrap_or_default();

                IndicatorCluster {
                    cluster_id: format!("cluster_{}", idx + 1),
                    indicators: members,
                    average_internal_correlation,
                    centroid_indicator,
                }
            })
            .collect()
    }
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 {
        return 0.0;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let numerator: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();
    let sum_sq_x: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let sum_sq_y: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let denominator = (sum_sq_x * sum_sq_y).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn lagged_series(series_a: &[f64], series_b: &[f64], lag: i32) -> (Vec<f64>, Vec<f64>) {
    if lag == 0 {
        (series_a.to_vec(), series_b.to_vec())
    } else if lag > 0 {
        let lag = lag as usize;
        (series_a[..series_a.len() - lag].to_vec(), series_b[lag..].to_vec())
    } else {
        let lag = (-lag) as usize;
        (series_a[lag..].to_vec(), series_b[..series_b.len() - lag].to_vec())
    }
}

fn test_predictive_power(predictor: &[f64], target: &[f64], lag_order: usize) -> f64 {
    if predictor.len() != target.len() || predictor.len() < lag_order + 5 {
        return 0.0;
    }

    let mut baseline_predictions = Vec::new();
    for i in lag_order..target.len() {
        baseline_predictions.push(target[i - lag_order..i].iter().sum::<f64>() / lag_order as f64);
    }
    let actual = &target[lag_order..];

    let baseline_error: f64 =
        actual.iter().zip(&baseline_predictions).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / actual.len() as f64;

    let mut enhanced_predictions = Vec::new();
    for i in lag_order..target.len() {
        let own_avg = target[i - lag_order..i].iter().sum::<f64>() / lag_order as f64;
        let pred_avg = predictor[i - lag_order..i].iter().sum::<f64>() / lag_order as f64;
        enhanced_predictions.push((own_avg + pred_avg) / 2.0);
    }
    let enhanced_error: f64 =
        actual.iter().zip(&enhanced_predictions).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / actual.len() as f64;

    if baseline_error > 0.0 {
        ((baseline_error - enhanced_error) / baseline_error).max(0.0)
    } else {
        0.0
    }
}

fn cluster_similarity(cluster_a: &[String], cluster_b: &[String], matrix: &CorrelationMatrix) -> f64 {
    let mut correlations = Vec::new();
    for a in cluster_a {
        for b in cluster_b {
            correlations.push(matrix.correlations.get(a).and_then(|row| row.get(b)).copied().unwrap_or(0.0));
        }
    }
    if correlations.is_empty() {
        0.0
    } else {
        correlations.iter().sum::<f64>() / correlations.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(analyzer: &CorrelationAnalyzer, company: &str, n: usize) {
        let base = Utc::now() - chrono::Duration::days(n as i64);
        for i in 0..n {
            let mut values = HashMap::new();
            values.insert("a".to_string(), i as f64);
            values.insert("b".to_string(), i as f64 * 2.0);
            values.insert("c".to_string(), (n - i) as f64);
            analyzer.add_data_point(company, base + chrono::Duration::days(i as i64), values);
        }
    }

    #[test]
    fn matrix_is_symmetric_and_diagonal_is_one() {
        let analyzer = CorrelationAnalyzer::new();
        seed(&analyzer, "c1", 20);
        let matrix = analyzer.calculate_correlation_matrix("c1", None).unwrap();
        for ind_a in &matrix.indicators {
            assert!((matrix.correlations[ind_a][ind_a] - 1.0).abs() < 1e-9);
            for ind_b in &matrix.indicators {
                let ab = matrix.correlations[ind_a][ind_b];
                let ba = matrix.correlations[ind_b][ind_a];
                assert!((ab - ba).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn perfectly_correlated_series_yields_strong_positive() {
        let analyzer = CorrelationAnalyzer::new();
        seed(&analyzer, "c1", 20);
        let matrix = analyzer.calculate_correlation_matrix("c1", None).unwrap();
        let corr = matrix.correlations["a"]["b"];
        assert!((corr - 1.0).abs() < 1e-9);
        assert_eq!(correlation_type(corr), CorrelationType::StrongPositive);
    }

    #[test]
    fn inversely_correlated_series_yields_strong_negative() {
        let analyzer = CorrelationAnalyzer::new();
        seed(&analyzer, "c1", 20);
        let matrix = analyzer.calculate_correlation_matrix("c1", None).unwrap();
        let corr = matrix.correlations["a"]["c"];
        assert!(corr < -0.99);
    }

    #[test]
    fn insufficient_data_returns_none() {
        let analyzer = CorrelationAnalyzer::new();
        let mut values = HashMap::new();
        values.insert("a".to_string(), 1.0);
        analyzer.add_data_point("c1", Utc::now(), values);
        assert!(analyzer.calculate_correlation_matrix("c1", None).is_none());
    }

    #[test]
    fn clustering_respects_requested_cluster_count() {
        let analyzer = CorrelationAnalyzer::new();
        seed(&analyzer, "c1", 40);
        let clusters = analyzer.cluster_indicators("c1", 2);
        assert_eq!(clusters.len(), 2);
    }
}
