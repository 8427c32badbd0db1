//! Trend Forecaster (spec §4.9)
//!
//! Linear-regression trend detection and classification, weekly
//! seasonality, horizon forecasting with widening confidence intervals,
//! and anomaly/reversal detection over per-indicator time series.
//! Grounded directly on the original trend-forecasting module.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    StrongUp,
    Up,
    Stable,
    Down,
    StrongDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendType {
    Linear,
    Exponential,
    Cyclical,
    MeanReverting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub indicator: String,
    pub company_id: String,
    pub direction: TrendDirection,
    pub trend_type: TrendType,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub is_significant: bool,
    pub confidence: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub data_points: usize,
    pub acceleration: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPattern {
    pub indicator: String,
    pub period_days: u32,
    pub seasonal_factors: HashMap<i64, f64>,
    pub strength: f64,
    pub explained_variance: f64,
    pub peak_index: i64,
    pub trough_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub predicted_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
    pub trend_component: f64,
    pub seasonal_component: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub indicator: String,
    pub company_id: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: u32,
    pub forecasted_values: Vec<ForecastPoint>,
    pub underlying_trend: Trend,
    pub seasonal_pattern: Option<SeasonalPattern>,
    pub mape: f64,
    pub rmse: f64,
    pub expected_change: f64,
    pub change_direction: ChangeDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyType {
    Outlier,
    LevelShift,
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalySeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnomaly {
    pub indicator: String,
    pub company_id: String,
    pub detected_at: DateTime<Utc>,
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub expected_value: f64,
    pub actual_value: f64,
    pub deviation: f64,
    pub previous_trend: Option<TrendDirection>,
    pub new_trend: Option<TrendDirection>,
    pub explanation: String,
}

type SeriesPoint = (DateTime<Utc>, f64);

pub struct TrendForecaster {
    history: DashMap<(String, String), Vec<SeriesPoint>>,
}

impl TrendForecaster {
    pub fn new() -> Self {
        Self { history: DashMap::new() }
    }

    pub fn add_data_point(&self, company_id: &str, indicator: &str, timestamp: DateTime<Utc>, value: f64) {
        let mut series = self.history.entry((company_id.to_string(), indicator.to_string())).or_insert_with(Vec::new);
        series.push((timestamp, value));
        series.sort_by_key(|p| p.0);
    }

    fn series(&self, company_id: &str, indicator: &str) -> Vec<SeriesPoint> {
        self.history.get(&(company_id.to_string(), indicator.to_string())).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn detect_trend(&self, company_id: &str, indicator: &str) -> Option<Trend> {
        let data = self.series(company_id, indicator);
        if data.len() < 5 {
            return None;
        }

        let t0 = data[0].0;
        let timestamps: Vec<f64> = data.iter().map(|(t, _)| (*t - t0).num_seconds() as f64 / 86400.0).collect();
        let values: Vec<f64> = data.iter().map(|(_, v)| *v).collect();

        let (slope, intercept, r_squared) = linear_regression(&timestamps, &values);
        let direction = classify_direction(slope, &values);
        let trend_type = classify_trend_type(&timestamps, &values, slope);
        let volatility = calculate_volatility(&values);
        let acceleration = calculate_acceleration(&timestamps, &values);
        let confidence = (r_squared * 0.7 + (data.len() as f64 / 100.0) * 0.3).min(0.95);

        Some(Trend {
            indicator: indicator.to_string(),
            company_id: company_id.to_string(),
            direction,
            trend_type,
            slope,
            intercept,
            r_squared,
            is_significant: slope.abs() > 0.001 && r_squared > 0.1,
            confidence,
            period_start: data[0].0,
            period_end: data[data.len() - 1].0,
            data_points: data.len(),
            acceleration,
            volatility,
        })
    }

    /// Weekly seasonality only (period_days = 7, bucket by weekday).
    pub fn detect_seasonality(&self, company_id: &str, indicator: &str) -> Option<SeasonalPattern> {
        let data = self.series(company_id, indicator);
        if data.len() < 14 {
            return None;
        }

        let mut period_values: HashMap<i64, Vec<f64>> = HashMap::new();
        for (timestamp, value) in &data {
            let idx = timestamp.weekday().num_days_from_monday() as i64;
            period_values.entry(idx).or_default().push(*value);
        }

        let overall_mean = data.iter().map(|(_, v)| v).sum::<f64>() / data.len() as f64;

        let mut seasonal_factors = HashMap::new();
        for (idx, values) in &period_values {
            let period_mean = values.iter().sum::<f64>() / values.len() as f64;
            seasonal_factors.insert(*idx, if overall_mean != 0.0 { period_mean / overall_mean } else { 1.0 });
        }

        let factor_variance =
            seasonal_factors.values().map(|f| (f - 1.0).powi(2)).sum::<f64>() / seasonal_factors.len() as f64;
        let strength = (factor_variance.sqrt() * 5.0).min(1.0);

        let peak_index = *seasonal_factors.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap()).map(|(k, _)| k).unwrap_or(&0);
        let trough_index = *seasonal_factors.iter().min_by(|a, b| a.1.partial_cmp(b.1).unwrap()).map(|(k, _)| k).unwrap_or(&0);

        Some(SeasonalPattern {
            indicator: indicator.to_string(),
            period_days: 7,
            seasonal_factors,
            strength,
            explained_variance: strength * strength,
            peak_index,
            trough_index,
        })
    }

    pub fn generate_forecast(&self, company_id: &str, indicator: &str, horizon_days: u32) -> Option<Forecast> {
        let data = self.series(company_id, indicator);
        if data.len() < 10 {
            return None;
        }

        let trend = self.detect_trend(company_id, indicator)?;
        let seasonal_pattern = if data.len() >= 14 { self.detect_seasonality(company_id, indicator) } else { None };

        let t0 = data[0].0;
        let last_date = data[data.len() - 1].0;
        let last_value = data[data.len() - 1].1;
        let values: Vec<f64> = data.iter().map(|(_, v)| *v).collect();
        let recent = if values.len() > 30 { &values[values.len() - 30..] } else { &values[..] };
        let historical_error = calculate_volatility(recent);

        let mut forecasted_values = Vec::with_capacity(horizon_days as usize);
        for day in 1..=horizon_days {
            let forecast_date = last_date + chrono::Duration::days(day as i64);
            let days_ahead = (forecast_date - t0).num_seconds() as f64 / 86400.0;
            let trend_value = trend.intercept + trend.slope * days_ahead;

            let seasonal_factor = match &seasonal_pattern {
                Some(pattern) if pattern.strength > 0.1 => {
                    let idx = forecast_date.weekday().num_days_from_monday() as i64;
                    pattern.seasonal_factors.get(&idx).copied().unwrap_or(1.0)
                }
                _ => 1.0,
            };

            let predicted_value = trend_value * seasonal_factor;
            let z_score = 1.96;
            let interval_width = historical_error * z_score * (day as f64).sqrt();

            forecasted_values.push(ForecastPoint {
                date: forecast_date,
                predicted_value,
                lower_bound: predicted_value - interval_width * predicted_value,
                upper_bound: predicted_value + interval_width * predicted_value,
                confidence_level: 0.95,
                trend_component: trend_value,
                seasonal_component: seasonal_factor - 1.0,
            });
        }

        let (expected_change, change_direction) = match forecasted_values.last() {
            Some(last) if last_value != 0.0 => {
                let change = (last.predicted_value - last_value) / last_value;
                let direction = if change > 0.05 {
                    ChangeDirection::Increasing
                } else if change < -0.05 {
                    ChangeDirection::Decreasing
                } else {
                    ChangeDirection::Stable
                };
                (change, direction)
            }
            _ => (0.0, ChangeDirection::Stable),
        };

        let (mape, rmse) = backtest_forecast(&data, &trend);

        Some(Forecast {
            indicator: indicator.to_string(),
            company_id: company_id.to_string(),
            generated_at: Utc::now(),
            horizon_days,
            forecasted_values,
            underlying_trend: trend,
            seasonal_pattern,
            mape,
            rmse,
            expected_change,
            change_direction,
        })
    }

    pub fn detect_anomalies(&self, company_id: &str, indicator: &str, sensitivity: f64) -> Vec<TrendAnomaly> {
        let data = self.series(company_id, indicator);
        if data.len() < 20 {
            return Vec::new();
        }

        let values: Vec<f64> = data.iter().map(|(_, v)| *v).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let std_dev = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt();
        let threshold = sensitivity * std_dev;
        if std_dev == 0.0 {
            return Vec::new();
        }

        let mut anomalies = Vec::new();
        for i in 0..data.len() {
            let (timestamp, value) = data[i];
            let deviation = (value - mean).abs();
            if deviation <= threshold {
                continue;
            }

            let anomaly_type = if i > 0 && i < data.len() - 1 {
                let prev_value = data[i - 1].1;
                let next_value = data[i + 1].1;
                if (value - prev_value).abs() > threshold && (next_value - prev_value).abs() < std_dev {
                    AnomalyType::Outlier
                } else {
                    AnomalyType::LevelShift
                }
            } else {
                AnomalyType::Outlier
            };

            let severity = if deviation > 3.0 * std_dev {
                AnomalySeverity::High
            } else if deviation > 2.0 * std_dev {
                AnomalySeverity::Medium
            } else {
                AnomalySeverity::Low
            };

            let deviation_sigmas = deviation / std_dev;
            anomalies.push(TrendAnomaly {
                indicator: indicator.to_string(),
                company_id: company_id.to_string(),
                detected_at: timestamp,
                anomaly_type,
                severity,
                expected_value: mean,
                actual_value: value,
                deviation: deviation_sigmas,
                previous_trend: None,
                new_trend: None,
                explanation: format!("value is {deviation_sigmas:.1} standard deviations from mean"),
            });
        }

        anomalies
    }

    pub fn detect_trend_changes(&self, company_id: &str, indicator: &str, window_size: usize) -> Vec<TrendAnomaly> {
        let data = self.series(company_id, indicator);
        if data.len() < window_size * 3 {
            return Vec::new();
        }

        let values: Vec<f64> = data.iter().map(|(_, v)| *v).collect();
        let mut anomalies = Vec::new();
        let mut prev_direction: Option<TrendDirection> = None;

        for i in window_size..data.len() - window_size {
            let half = window_size / 2;
            let local_y = &values[i - half..i + half];
            if local_y.len() < window_size {
                continue;
            }
            let local_x: Vec<f64> = (0..local_y.len()).map(|v| v as f64).collect();
            let (slope, _, _) = linear_regression(&local_x, local_y);
            let direction = classify_direction(slope, local_y);

            if let Some(prev) = prev_direction {
                if direction != prev && is_significant_direction_change(prev, direction) {
                    anomalies.push(TrendAnomaly {
                        indicator: indicator.to_string(),
                        company_id: company_id.to_string(),
                        detected_at: data[i].0,
                        anomaly_type: AnomalyType::Reversal,
                        severity: AnomalySeverity::Medium,
                        expected_value: values[i - 1],
                        actual_value: values[i],
                        deviation: slope.abs() * 100.0,
                        previous_trend: Some(prev),
                        new_trend: Some(direction),
                        explanation: format!("Trend reversal from {prev:?} to {direction:?}"),
                    });
                }
            }
            prev_direction = Some(direction);
        }

        anomalies
    }
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self::new()
    }
}

fn linear_regression(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let n = x.len();
    if n < 2 {
        return (0.0, 0.0, 0.0);
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let numerator: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();
    let denominator: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();

    if denominator == 0.0 {
        return (0.0, mean_y, 0.0);
    }

    let slope = numerator / denominator;
    let intercept = mean_y - slope * mean_x;

    let predictions: Vec<f64> = x.iter().map(|xi| slope * xi + intercept).collect();
    let ss_res: f64 = y.iter().zip(&predictions).map(|(yi, pi)| (yi - pi).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();

    let r_squared = if ss_tot > 0.0 { (1.0 - ss_res / ss_tot).max(0.0) } else { 0.0 };
    (slope, intercept, r_squared)
}

fn classify_direction(slope: f64, values: &[f64]) -> TrendDirection {
    let mean_value = if values.is_empty() { 1.0 } else { values.iter().sum::<f64>() / values.len() as f64 };
    let mean_value = if mean_value == 0.0 { 1.0 } else { mean_value };
    let normalized_slope = slope / mean_value.abs();

    if normalized_slope > 0.02 {
        TrendDirection::StrongUp
    } else if normalized_slope > 0.005 {
        TrendDirection::Up
    } else if normalized_slope < -0.02 {
        TrendDirection::StrongDown
    } else if normalized_slope < -0.005 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

fn classify_trend_type(timestamps: &[f64], values: &[f64], linear_slope: f64) -> TrendType {
    if values.len() < 10 {
        return TrendType::Linear;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let crossings = (1..values.len()).filter(|&i| (values[i - 1] - mean) * (values[i] - mean) < 0.0).count();
    if crossings as f64 > values.len() as f64 * 0.3 {
        return TrendType::MeanReverting;
    }

    if values.iter().all(|v| *v > 0.0) {
        let log_values: Vec<f64> = values.iter().map(|v| v.ln()).collect();
        let (_, _, r_squared_log) = linear_regression(timestamps, &log_values);
        let (_, _, r_squared_linear) = linear_regression(timestamps, values);
        if r_squared_log > r_squared_linear + 0.1 {
            return TrendType::Exponential;
        }
    }

    let volatility = calculate_volatility(values);
    if volatility > 0.1 && linear_slope.abs() < 0.001 {
        return TrendType::Cyclical;
    }

    TrendType::Linear
}

fn calculate_volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std_dev = variance.sqrt();
    if mean != 0.0 { std_dev / mean.abs() } else { std_dev }
}

fn calculate_acceleration(timestamps: &[f64], values: &[f64]) -> f64 {
    if values.len() < 10 {
        return 0.0;
    }
    let mid = values.len() / 2;
    let (slope1, _, _) = linear_regression(&timestamps[..mid], &values[..mid]);
    let (slope2, _, _) = linear_regression(&timestamps[mid..], &values[mid..]);
    slope2 - slope1
}

fn backtest_forecast(data: &[SeriesPoint], trend: &Trend) -> (f64, f64) {
    const TEST_SIZE: usize = 10;
    if data.len() < TEST_SIZE + 10 {
        return (0.1, 0.1);
    }

    let t0 = data[0].0;
    let test_data = &data[data.len() - TEST_SIZE..];

    let mut errors = Vec::new();
    let mut squared_errors = Vec::new();

    for (test_date, actual) in test_data {
        let days_ahead = (*test_date - t0).num_seconds() as f64 / 86400.0;
        let predicted = trend.intercept + trend.slope * days_ahead;
        let error = if *actual != 0.0 { (actual - predicted).abs() / actual } else { 0.0 };
        errors.push(error);
        squared_errors.push((actual - predicted).powi(2));
    }

    let mape = errors.iter().sum::<f64>() / errors.len() as f64;
    let rmse = (squared_errors.iter().sum::<f64>() / squared_errors.len() as f64).sqrt();
    (mape, rmse)
}

fn is_significant_direction_change(prev: TrendDirection, current: TrendDirection) -> bool {
    let up = matches!(prev, TrendDirection::Up | TrendDirection::StrongUp);
    let down_now = matches!(current, TrendDirection::Down | TrendDirection::StrongDown);
    let down = matches!(prev, TrendDirection::Down | TrendDirection::StrongDown);
    let up_now = matches!(current, TrendDirection::Up | TrendDirection::StrongUp);
    (up && down_now) || (down && up_now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_identical_points_yield_zero_slope_and_stable_direction() {
        let x = vec![0.0, 1.0];
        let y = vec![50.0, 50.0];
        let (slope, _, r_squared) = linear_regression(&x, &y);
        assert_eq!(slope, 0.0);
        assert_eq!(r_squared, 0.0);
        assert_eq!(classify_direction(slope, &y), TrendDirection::Stable);
    }

    #[test]
    fn s6_weekly_seasonality_matches_worked_example() {
        let forecaster = TrendForecaster::new();
        let base = Utc::now() - chrono::Duration::weeks(14);
        for day in 0..(14 * 7) {
            let timestamp = base + chrono::Duration::days(day);
            let weekday = timestamp.weekday().num_days_from_monday() as f64;
            let value = 100.0 + 10.0 * (2.0 * std::f64::consts::PI * weekday / 7.0).sin();
            forecaster.add_data_point("c1", "demand", timestamp, value);
        }

        let pattern = forecaster.detect_seasonality("c1", "demand").unwrap();
        assert!(pattern.strength >= 0.3);
        assert!((pattern.explained_variance - pattern.strength * pattern.strength).abs() < 1e-9);
    }

    #[test]
    fn zero_horizon_forecast_returns_no_points() {
        let forecaster = TrendForecaster::new();
        let base = Utc::now() - chrono::Duration::days(20);
        for day in 0..20 {
            forecaster.add_data_point("c1", "demand", base + chrono::Duration::days(day), 100.0 + day as f64);
        }
        let forecast = forecaster.generate_forecast("c1", "demand", 0).unwrap();
        assert!(forecast.forecasted_values.is_empty());
        assert_eq!(forecast.expected_change, 0.0);
    }

    #[test]
    fn insufficient_data_yields_no_trend() {
        let forecaster = TrendForecaster::new();
        forecaster.add_data_point("c1", "demand", Utc::now(), 50.0);
        assert!(forecaster.detect_trend("c1", "demand").is_none());
    }

    #[test]
    fn rising_series_detects_up_direction() {
        let forecaster = TrendForecaster::new();
        let base = Utc::now() - chrono::Duration::days(30);
        for day in 0..30 {
            forecaster.add_data_point("c1", "demand", base + chrono::Duration::days(day), 50.0 + day as f64 * 3.0);
        }
        let trend = forecaster.detect_trend("c1", "demand").unwrap();
        assert!(matches!(trend.direction, TrendDirection::Up | TrendDirection::StrongUp));
    }
}
