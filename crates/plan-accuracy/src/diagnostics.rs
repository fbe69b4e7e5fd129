//! 預測偏差診斷
//!
//! 找出平均偏差超過門檻的產品，判斷可能原因並提供乘法校正係數。

use plan_core::quantity::{to_f64, DECIMAL_SCALE};
use plan_core::AccuracyRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 診斷門檻
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticThresholds {
    /// 平均偏差超過此比例視為持續偏差
    pub bias: Decimal,

    /// 平均偏差超過此比例視為極端偏差
    pub extreme: Decimal,

    /// 預測與實際的相關係數低於此值視為模型不適合
    pub min_correlation: f64,

    /// 相關係數與趨勢判斷至少需要的期數
    pub min_observations: usize,
}

impl Default for DiagnosticThresholds {
    fn default() -> Self {
        Self {
            bias: Decimal::new(2, 1),
            extreme: Decimal::new(5, 1),
            min_correlation: 0.5,
            min_observations: 3,
        }
    }
}

/// 偏差方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    /// 預測過高
    OverForecast,
    /// 預測過低
    UnderForecast,
}

/// 可能原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasReason {
    /// 偏差非常大，可能是異常訂單或市場變化
    ExtremeDeviation,
    /// 預測與實際相關性低，預測方法可能不適合
    LowCorrelation,
    /// 實際需求有趨勢，預測未及時跟進
    TrendLag,
}

/// 單一產品的偏差診斷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    pub product_id: String,
    pub observations: usize,
    pub mean_forecast: Decimal,
    pub mean_actual: Decimal,
    pub mean_bias: Decimal,
    pub direction: BiasDirection,

    /// 預測乘以此係數可抵銷平均偏差
    pub correction_factor: Option<Decimal>,

    pub reasons: Vec<BiasReason>,
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    let denominator = (var_x * var_y).sqrt();
    (denominator > 1e-12).then(|| covariance / denominator)
}

fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (mut numerator, mut denominator) = (0.0, 0.0);
    for (t, y) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        numerator += dt * (y - mean_y);
        denominator += dt * dt;
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn diagnose_product(
    product_id: &str,
    records: &[&AccuracyRecord],
    thresholds: &DiagnosticThresholds,
) -> Option<BiasFinding> {
    let biases: Vec<Decimal> = records.iter().filter_map(|r| r.bias).collect();
    if biases.is_empty() {
        return None;
    }
    let mean_bias =
        (biases.iter().sum::<Decimal>() / Decimal::from(biases.len())).round_dp(DECIMAL_SCALE);
    if mean_bias.abs() <= thresholds.bias {
        return None;
    }

    let direction = if mean_bias > Decimal::ZERO {
        BiasDirection::OverForecast
    } else {
        BiasDirection::UnderForecast
    };

    let count = Decimal::from(records.len());
    let mean_forecast = (records.iter().map(|r| r.forecast_qty).sum::<Decimal>() / count)
        .round_dp(DECIMAL_SCALE);
    let mean_actual =
        (records.iter().map(|r| r.actual_qty).sum::<Decimal>() / count).round_dp(DECIMAL_SCALE);

    let mut reasons = Vec::new();
    if mean_bias.abs() > thresholds.extreme {
        reasons.push(BiasReason::ExtremeDeviation);
    }

    if records.len() >= thresholds.min_observations {
        let forecasts: Vec<f64> = records.iter().map(|r| to_f64(r.forecast_qty)).collect();
        let actuals: Vec<f64> = records.iter().map(|r| to_f64(r.actual_qty)).collect();

        if let Some(correlation) = pearson(&forecasts, &actuals) {
            if correlation < thresholds.min_correlation {
                reasons.push(BiasReason::LowCorrelation);
            }
        }

        let trend = slope(&actuals);
        let lagging = match direction {
            BiasDirection::OverForecast => trend < 0.0,
            BiasDirection::UnderForecast => trend > 0.0,
        };
        if lagging {
            reasons.push(BiasReason::TrendLag);
        }
    }

    let denominator = Decimal::ONE + mean_bias;
    let correction_factor = (denominator > Decimal::ZERO)
        .then(|| (Decimal::ONE / denominator).round_dp(DECIMAL_SCALE));

    Some(BiasFinding {
        product_id: product_id.to_string(),
        observations: records.len(),
        mean_forecast,
        mean_actual,
        mean_bias,
        direction,
        correction_factor,
        reasons,
    })
}

/// 診斷所有產品，依偏差絕對值由大到小排序
pub fn diagnose(records: &[AccuracyRecord], thresholds: &DiagnosticThresholds) -> Vec<BiasFinding> {
    let mut groups: BTreeMap<&str, Vec<&AccuracyRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.product_id.as_str()).or_default().push(record);
    }

    let mut findings: Vec<BiasFinding> = groups
        .iter_mut()
        .filter_map(|(product, group)| {
            group.sort_by_key(|r| r.period);
            diagnose_product(product, group, thresholds)
        })
        .collect();

    findings.sort_by(|a, b| {
        b.mean_bias
            .abs()
            .cmp(&a.mean_bias.abs())
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    for finding in &findings {
        tracing::info!(
            "{} 持續{}：平均偏差 {}，原因 {:?}",
            finding.product_id,
            match finding.direction {
                BiasDirection::OverForecast => "高估",
                BiasDirection::UnderForecast => "低估",
            },
            finding.mean_bias,
            finding.reasons
        );
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::score_one;
    use chrono::NaiveDateTime;
    use plan_core::{Forecast, ForecastMethod, Period};

    fn records(product: &str, pairs: &[(i64, i64)]) -> Vec<AccuracyRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (predicted, actual))| {
                let forecast = Forecast::new(
                    product,
                    Period::new(2025, i as u32 + 1).unwrap(),
                    Decimal::from(*predicted),
                    ForecastMethod::moving_average(3),
                    NaiveDateTime::default(),
                );
                score_one(&forecast, Decimal::from(*actual))
            })
            .collect()
    }

    #[test]
    fn test_persistent_over_forecast() {
        let data = records("P", &[(130, 100), (130, 100), (130, 100)]);
        let findings = diagnose(&data, &DiagnosticThresholds::default());

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.direction, BiasDirection::OverForecast);
        assert_eq!(finding.mean_bias, Decimal::new(3, 1));
        assert_eq!(finding.correction_factor, Some(Decimal::new(7692, 4)));
        assert_eq!(finding.mean_forecast, Decimal::from(130));
        assert!(finding.reasons.is_empty());
    }

    #[test]
    fn test_under_forecast_with_rising_trend() {
        let data = records("Q", &[(100, 100), (100, 120), (100, 140), (100, 160)]);
        let findings = diagnose(&data, &DiagnosticThresholds::default());

        assert_eq!(findings[0].direction, BiasDirection::UnderForecast);
        assert!(findings[0].reasons.contains(&BiasReason::TrendLag));
    }

    #[test]
    fn test_extreme_and_uncorrelated() {
        let data = records("R", &[(300, 100), (100, 200), (300, 100)]);
        let findings = diagnose(&data, &DiagnosticThresholds::default());

        let reasons = &findings[0].reasons;
        assert!(reasons.contains(&BiasReason::ExtremeDeviation));
        assert!(reasons.contains(&BiasReason::LowCorrelation));
    }

    #[test]
    fn test_small_bias_not_reported() {
        let mut data = records("P", &[(105, 100), (95, 100)]);
        data.extend(records("Z", &[(10, 0)]));
        assert!(diagnose(&data, &DiagnosticThresholds::default()).is_empty());
    }
}
