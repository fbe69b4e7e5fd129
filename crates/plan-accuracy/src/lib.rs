//! # Plan Accuracy
//!
//! 預測準確度分析：評分、彙總、演算法排名、偏差診斷

pub mod diagnostics;
pub mod ranking;
pub mod scoring;
pub mod summary;

use plan_core::{AccuracyRecord, Forecast, ForecastMethod, Period, TimeSeriesStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Re-export 主要類型
pub use diagnostics::{BiasDirection, BiasFinding, BiasReason, DiagnosticThresholds};
pub use ranking::MethodScore;
pub use scoring::{score, score_one};
pub use summary::AccuracySummary;

/// 準確度分析報告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// 逐筆評分，依產品、期間排序
    pub records: Vec<AccuracyRecord>,

    pub overall: AccuracySummary,
    pub by_product: BTreeMap<String, AccuracySummary>,

    /// 各期間彙總（趨勢）
    pub by_period: BTreeMap<Period, AccuracySummary>,

    /// 各產品的演算法排名
    pub rankings: BTreeMap<String, Vec<MethodScore>>,

    /// 持續偏差的產品
    pub bias: Vec<BiasFinding>,
}

impl AccuracyReport {
    /// 比對預測與實際並產生報告
    pub fn analyze(forecasts: &[Forecast], actuals: &TimeSeriesStore) -> Self {
        Self::new(score(forecasts, actuals))
    }

    /// 由評分記錄產生報告
    pub fn new(records: Vec<AccuracyRecord>) -> Self {
        Self::with_thresholds(records, &DiagnosticThresholds::default())
    }

    /// 建構器模式：自訂診斷門檻
    pub fn with_thresholds(records: Vec<AccuracyRecord>, thresholds: &DiagnosticThresholds) -> Self {
        let overall = AccuracySummary::from_records(&records);
        let by_product = summary::by_product(&records);
        let by_period = summary::by_period(&records);
        let rankings = ranking::rank_methods(&records);
        let bias = diagnostics::diagnose(&records, thresholds);

        tracing::info!(
            "準確度分析完成：{} 筆記錄，{} 筆可評分，MAPE {:?}",
            overall.count,
            overall.scored,
            overall.mape
        );

        Self {
            records,
            overall,
            by_product,
            by_period,
            rankings,
            bias,
        }
    }

    /// 各產品表現最佳的方法，可作為預測引擎的偏好設定
    pub fn preferred_methods(&self) -> BTreeMap<String, ForecastMethod> {
        ranking::preferred_methods(&self.rankings)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use plan_core::TimeSeriesPoint;
    use rust_decimal::Decimal;

    fn period(month: u32) -> Period {
        Period::new(2025, month).unwrap()
    }

    fn forecast(product: &str, month: u32, qty: i64, method: ForecastMethod) -> Forecast {
        Forecast::new(
            product,
            period(month),
            Decimal::from(qty),
            method,
            NaiveDateTime::default(),
        )
    }

    #[test]
    fn test_analyze_end_to_end() {
        let actuals = TimeSeriesStore::from_points(vec![
            TimeSeriesPoint::new("A", period(1), Decimal::from(100)).unwrap(),
            TimeSeriesPoint::new("A", period(2), Decimal::from(100)).unwrap(),
            TimeSeriesPoint::new("B", period(1), Decimal::ZERO).unwrap(),
        ])
        .unwrap();

        let forecasts = vec![
            forecast("A", 1, 90, ForecastMethod::moving_average(3)),
            forecast("A", 2, 110, ForecastMethod::moving_average(3)),
            forecast("A", 1, 100, ForecastMethod::regression(1)),
            forecast("B", 1, 5, ForecastMethod::moving_average(3)),
            // 未來期間沒有實際值
            forecast("A", 3, 100, ForecastMethod::moving_average(3)),
        ];

        let report = AccuracyReport::analyze(&forecasts, &actuals);

        assert_eq!(report.records.len(), 4);
        assert_eq!(report.overall.count, 4);
        assert_eq!(report.overall.scored, 3);
        assert_eq!(report.by_product["B"].mape, None);
        assert_eq!(report.by_period.len(), 2);

        let preferred = report.preferred_methods();
        assert_eq!(preferred.get("A"), Some(&ForecastMethod::regression(1)));
        assert!(!preferred.contains_key("B"));
        assert!(report.bias.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = AccuracyReport::new(Vec::new());
        assert!(report.is_empty());
        assert!(report.preferred_methods().is_empty());
        assert_eq!(report.overall.mape, None);
    }
}
