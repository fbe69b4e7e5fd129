//! 月度出貨時間序列

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::quantity::{ensure_non_negative, to_f64};
use crate::{Period, PlanError, Result};

/// 時間序列資料點
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// 產品ID
    pub product_id: String,

    /// 期間
    pub period: Period,

    /// 出貨/需求數量
    pub quantity: Decimal,
}

impl TimeSeriesPoint {
    /// 創建新的資料點（數量必須非負）
    pub fn new(product_id: impl Into<String>, period: Period, quantity: Decimal) -> Result<Self> {
        let product_id = product_id.into();
        ensure_non_negative(&product_id, "quantity", quantity)?;
        Ok(Self {
            product_id,
            period,
            quantity,
        })
    }
}

/// 缺漏期間處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GapPolicy {
    /// 以 0 填補
    #[default]
    ZeroFill,
    /// 以前後觀測值線性內插
    Interpolate,
    /// 沿用前一期觀測值
    CarryForward,
    /// 拒絕有缺漏的序列
    Reject,
}

/// 單一產品的時間序列
///
/// 缺漏的月份保持缺漏，直到呼叫 [`TimeSeries::resolve`] 依策略補齊。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    product_id: String,
    observations: BTreeMap<Period, Decimal>,
}

impl TimeSeries {
    /// 創建空序列
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            observations: BTreeMap::new(),
        }
    }

    /// 由資料點建立序列（同月份數量加總）
    pub fn from_points(
        product_id: impl Into<String>,
        points: impl IntoIterator<Item = TimeSeriesPoint>,
    ) -> Result<Self> {
        let mut series = Self::new(product_id);
        for point in points {
            if point.product_id != series.product_id {
                return Err(PlanError::InvalidParameter(format!(
                    "資料點 {} 不屬於序列 {}",
                    point.product_id, series.product_id
                )));
            }
            series.push(point.period, point.quantity)?;
        }
        Ok(series)
    }

    /// 加入一筆觀測值；同月份重複時數量累加
    pub fn push(&mut self, period: Period, quantity: Decimal) -> Result<()> {
        ensure_non_negative(&self.product_id, "quantity", quantity)?;
        *self.observations.entry(period).or_insert(Decimal::ZERO) += quantity;
        Ok(())
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// 觀測值筆數（不含缺漏月份）
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_period(&self) -> Option<Period> {
        self.observations.keys().next().copied()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.observations.keys().next_back().copied()
    }

    pub fn get(&self, period: Period) -> Option<Decimal> {
        self.observations.get(&period).copied()
    }

    /// 依期間排序的觀測值
    pub fn points(&self) -> impl Iterator<Item = (Period, Decimal)> + '_ {
        self.observations.iter().map(|(p, q)| (*p, *q))
    }

    /// 首末期間之間缺少觀測值的月份
    pub fn gaps(&self) -> Vec<Period> {
        match (self.first_period(), self.last_period()) {
            (Some(first), Some(last)) => Period::span(first, last)
                .into_iter()
                .filter(|p| !self.observations.contains_key(p))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 依策略補齊缺漏月份，產生無缺漏的序列
    pub fn resolve(&self, policy: GapPolicy) -> Result<ResolvedSeries> {
        let (first, last) = match (self.first_period(), self.last_period()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(PlanError::InsufficientHistory {
                    algorithm: "time-series".to_string(),
                    required: 1,
                    actual: 0,
                })
            }
        };

        let gaps = self.gaps();
        if policy == GapPolicy::Reject && !gaps.is_empty() {
            let missing: Vec<String> = gaps.iter().map(Period::to_string).collect();
            return Err(PlanError::InvalidParameter(format!(
                "{} 的時間序列缺少期間: {}",
                self.product_id,
                missing.join(", ")
            )));
        }

        let mut values = Vec::with_capacity((first.months_until(last) + 1) as usize);
        let mut previous: Option<(Period, Decimal)> = None;

        for period in Period::span(first, last) {
            if let Some(quantity) = self.get(period) {
                values.push(quantity);
                previous = Some((period, quantity));
                continue;
            }

            let filled = match policy {
                GapPolicy::ZeroFill | GapPolicy::Reject => Decimal::ZERO,
                GapPolicy::CarryForward => previous.map(|(_, q)| q).unwrap_or(Decimal::ZERO),
                GapPolicy::Interpolate => {
                    let next = self.observations.range(period..).next().map(|(p, q)| (*p, *q));
                    match (previous, next) {
                        (Some((p0, q0)), Some((p1, q1))) => {
                            let span = Decimal::from(p0.months_until(p1));
                            let offset = Decimal::from(p0.months_until(period));
                            q0 + (q1 - q0) * offset / span
                        }
                        _ => Decimal::ZERO,
                    }
                }
            };
            values.push(filled);
        }

        if !gaps.is_empty() {
            tracing::debug!(
                "{} 補齊 {} 個缺漏月份（策略 {:?}）",
                self.product_id,
                gaps.len(),
                policy
            );
        }

        Ok(ResolvedSeries {
            product_id: self.product_id.clone(),
            start: first,
            values,
            filled: gaps,
        })
    }
}

/// 無缺漏的月度序列（預測演算法的輸入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSeries {
    pub product_id: String,

    /// 第一期
    pub start: Period,

    /// 各期數量（自 start 起連續）
    pub values: Vec<Decimal>,

    /// 由策略補齊的月份
    pub filled: Vec<Period>,
}

impl ResolvedSeries {
    /// 直接由連續數值建立（數值必須非負）
    pub fn from_values(
        product_id: impl Into<String>,
        start: Period,
        values: Vec<Decimal>,
    ) -> Result<Self> {
        let product_id = product_id.into();
        for value in &values {
            ensure_non_negative(&product_id, "quantity", *value)?;
        }
        Ok(Self {
            product_id,
            start,
            values,
            filled: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 最後一期
    pub fn end(&self) -> Period {
        self.start.add_months(self.values.len() as i64 - 1)
    }

    /// 預測起始期（最後一期的下一個月）
    pub fn next_period(&self) -> Period {
        self.start.add_months(self.values.len() as i64)
    }

    pub fn values_f64(&self) -> Vec<f64> {
        self.values.iter().map(|v| to_f64(*v)).collect()
    }

    /// 前 n 期構成的子序列（回測訓練集）
    pub fn head(&self, n: usize) -> ResolvedSeries {
        let n = n.min(self.values.len());
        ResolvedSeries {
            product_id: self.product_id.clone(),
            start: self.start,
            values: self.values[..n].to_vec(),
            filled: self
                .filled
                .iter()
                .copied()
                .filter(|p| self.start.months_until(*p) < n as i64)
                .collect(),
        }
    }
}

/// 時間序列庫：產品ID -> 時間序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesStore {
    series: BTreeMap<String, TimeSeries>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由已驗證的資料點建立
    pub fn from_points(points: impl IntoIterator<Item = TimeSeriesPoint>) -> Result<Self> {
        let mut store = Self::new();
        for point in points {
            store.insert(point)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, point: TimeSeriesPoint) -> Result<()> {
        self.series
            .entry(point.product_id.clone())
            .or_insert_with(|| TimeSeries::new(point.product_id.clone()))
            .push(point.period, point.quantity)
    }

    pub fn series(&self, product_id: &str) -> Option<&TimeSeries> {
        self.series.get(product_id)
    }

    /// 依產品ID排序
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSeries> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// 實際出貨量
    pub fn actual(&self, product_id: &str, period: Period) -> Option<Decimal> {
        self.series.get(product_id).and_then(|s| s.get(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn series_with_gap() -> TimeSeries {
        let mut series = TimeSeries::new("BIKE-001");
        series.push(p(2025, 1), Decimal::from(100)).unwrap();
        series.push(p(2025, 4), Decimal::from(160)).unwrap();
        series.push(p(2025, 5), Decimal::from(150)).unwrap();
        series
    }

    #[test]
    fn test_gaps_are_explicit() {
        let series = series_with_gap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.gaps(), vec![p(2025, 2), p(2025, 3)]);
    }

    #[rstest]
    #[case(GapPolicy::ZeroFill, [100, 0, 0, 160, 150])]
    #[case(GapPolicy::CarryForward, [100, 100, 100, 160, 150])]
    #[case(GapPolicy::Interpolate, [100, 120, 140, 160, 150])]
    fn test_resolve_policies(#[case] policy: GapPolicy, #[case] expected: [i64; 5]) {
        let resolved = series_with_gap().resolve(policy).unwrap();
        let expected: Vec<Decimal> = expected.iter().map(|v| Decimal::from(*v)).collect();
        assert_eq!(resolved.values, expected);
        assert_eq!(resolved.filled, vec![p(2025, 2), p(2025, 3)]);
        assert_eq!(resolved.end(), p(2025, 5));
        assert_eq!(resolved.next_period(), p(2025, 6));
    }

    #[test]
    fn test_reject_policy_names_missing_periods() {
        let err = series_with_gap().resolve(GapPolicy::Reject).unwrap_err();
        assert!(err.to_string().contains("2025-02"));
    }

    #[test]
    fn test_duplicate_periods_are_summed() {
        let points = vec![
            TimeSeriesPoint::new("P", p(2025, 1), Decimal::from(10)).unwrap(),
            TimeSeriesPoint::new("P", p(2025, 1), Decimal::from(15)).unwrap(),
        ];
        let series = TimeSeries::from_points("P", points).unwrap();
        assert_eq!(series.get(p(2025, 1)), Some(Decimal::from(25)));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        assert!(TimeSeriesPoint::new("P", p(2025, 1), Decimal::from(-1)).is_err());
        let mut series = TimeSeries::new("P");
        assert!(series.push(p(2025, 1), Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_empty_series_cannot_resolve() {
        let err = TimeSeries::new("P").resolve(GapPolicy::ZeroFill).unwrap_err();
        assert!(matches!(err, PlanError::InsufficientHistory { .. }));
    }

    #[test]
    fn test_store_groups_by_product() {
        let store = TimeSeriesStore::from_points(vec![
            TimeSeriesPoint::new("B", p(2025, 1), Decimal::from(5)).unwrap(),
            TimeSeriesPoint::new("A", p(2025, 1), Decimal::from(7)).unwrap(),
            TimeSeriesPoint::new("A", p(2025, 2), Decimal::from(8)).unwrap(),
        ])
        .unwrap();

        assert_eq!(store.products().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(store.actual("A", p(2025, 2)), Some(Decimal::from(8)));
        assert_eq!(store.actual("B", p(2025, 2)), None);
    }

    #[test]
    fn test_head_keeps_prefix() {
        let resolved = series_with_gap().resolve(GapPolicy::ZeroFill).unwrap();
        let head = resolved.head(2);
        assert_eq!(head.values, vec![Decimal::from(100), Decimal::ZERO]);
        assert_eq!(head.filled, vec![p(2025, 2)]);
    }
}
