//! 計劃約束：人工指定量、平準化產率、最小批量

use plan_core::{ManualOverride, Period, Warning};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 人工指定量集合（產品 × 期間）
///
/// 同一 (產品, 期間) 重複指定時以最後一筆為準。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    pinned: BTreeMap<(String, Period), Decimal>,
}

impl OverrideSet {
    pub fn new(overrides: &[ManualOverride]) -> Self {
        let pinned = overrides
            .iter()
            .map(|o| ((o.product_id.clone(), o.period), o.planned_qty))
            .collect();
        Self { pinned }
    }

    pub fn get(&self, product_id: &str, period: Period) -> Option<Decimal> {
        self.pinned.get(&(product_id.to_string(), period)).copied()
    }

    pub fn len(&self) -> usize {
        self.pinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty()
    }

    /// 不在計劃範圍內（未知產品或期間超出範圍）的指定量，以警告回報
    pub fn unmatched(&self, horizons: &BTreeMap<String, Vec<Period>>) -> Vec<Warning> {
        self.pinned
            .keys()
            .filter(|(product, period)| {
                !horizons
                    .get(product)
                    .is_some_and(|horizon| horizon.contains(period))
            })
            .map(|(product, period)| {
                Warning::warning(
                    product.as_str(),
                    format!("{period} 的人工指定量不在計劃範圍內，已忽略"),
                )
            })
            .collect()
    }
}

/// 平準化產率
///
/// 能滿足每個期間累計需求（含目標庫存）的最小固定產率，向上取整到整數。
pub fn level_rate(
    forecasts: &[Decimal],
    targets: &[Decimal],
    opening: Decimal,
    incoming: &[Decimal],
) -> Decimal {
    let mut cumulative_demand = Decimal::ZERO;
    let mut cumulative_supply = opening;
    let mut rate = Decimal::ZERO;

    for (t, forecast) in forecasts.iter().enumerate() {
        cumulative_demand += *forecast;
        cumulative_supply += incoming.get(t).copied().unwrap_or(Decimal::ZERO);
        let target = targets.get(t).copied().unwrap_or(Decimal::ZERO);

        let requirement = cumulative_demand + target - cumulative_supply;
        if requirement > Decimal::ZERO {
            rate = rate.max(requirement / Decimal::from(t + 1));
        }
    }

    rate.ceil()
}

/// 套用最小生產批量：有生產時至少一批，並向上取整到批量倍數
pub fn apply_min_batch(quantity: Decimal, batch: Option<Decimal>) -> Decimal {
    match batch {
        Some(batch) if quantity > Decimal::ZERO && batch > Decimal::ZERO => {
            plan_core::quantity::ceil_to_multiple(quantity.max(batch), batch)
        }
        _ => quantity,
    }
}
