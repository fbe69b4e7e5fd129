//! 準確度彙總：整體、各產品、各期間

use plan_core::quantity::DECIMAL_SCALE;
use plan_core::{AccuracyRecord, Period};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一組評分記錄的彙總
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    /// 記錄數
    pub count: usize,

    /// 可評分的記錄數（實際值不為 0）
    pub scored: usize,

    /// 平均絕對百分比誤差（比例）
    pub mape: Option<Decimal>,

    /// 絕對百分比誤差中位數
    pub median_ape: Option<Decimal>,

    /// 平均偏差，正值為高估
    pub mean_bias: Option<Decimal>,

    /// 平均準確率 max(0, 1 - APE)
    pub mean_accuracy: Option<Decimal>,
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().sum();
    Some((total / Decimal::from(values.len())).round_dp(DECIMAL_SCALE))
}

fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    } else {
        sorted[mid]
    };
    Some(value.round_dp(DECIMAL_SCALE))
}

impl AccuracySummary {
    pub fn from_records<'r>(records: impl IntoIterator<Item = &'r AccuracyRecord>) -> Self {
        let mut count = 0;
        let mut errors = Vec::new();
        let mut biases = Vec::new();

        for record in records {
            count += 1;
            if let Some(ape) = record.absolute_pct_error {
                errors.push(ape);
            }
            if let Some(bias) = record.bias {
                biases.push(bias);
            }
        }

        let accuracies: Vec<Decimal> = errors
            .iter()
            .map(|ape| (Decimal::ONE - *ape).max(Decimal::ZERO))
            .collect();

        Self {
            count,
            scored: errors.len(),
            mape: mean(&errors),
            median_ape: median(&errors),
            mean_bias: mean(&biases),
            mean_accuracy: mean(&accuracies),
        }
    }
}

/// 依產品彙總
pub fn by_product(records: &[AccuracyRecord]) -> BTreeMap<String, AccuracySummary> {
    let mut groups: BTreeMap<&str, Vec<&AccuracyRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.product_id.as_str()).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(product, group)| (product.to_string(), AccuracySummary::from_records(group)))
        .collect()
}

/// 依期間彙總（準確度趨勢）
pub fn by_period(records: &[AccuracyRecord]) -> BTreeMap<Period, AccuracySummary> {
    let mut groups: BTreeMap<Period, Vec<&AccuracyRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.period).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(period, group)| (period, AccuracySummary::from_records(group)))
        .collect()
}
