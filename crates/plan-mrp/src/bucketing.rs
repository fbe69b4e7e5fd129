//! 時間分桶
//!
//! 計劃期間由生產計劃決定，所有數量都整理成與期間對齊的陣列。

use plan_core::{Period, ProductionPlanEntry};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 時間分桶計算器
pub struct BucketingCalculator;

impl BucketingCalculator {
    /// 生產計劃涵蓋的連續期間（最早到最晚）
    pub fn horizon(plan: &[ProductionPlanEntry]) -> Vec<Period> {
        let start = plan.iter().map(|e| e.period).min();
        let end = plan.iter().map(|e| e.period).max();
        match (start, end) {
            (Some(start), Some(end)) => Period::span(start, end),
            _ => Vec::new(),
        }
    }

    /// 各產品每期的計劃生產量（獨立需求）
    pub fn independent_demand(plan: &[ProductionPlanEntry]) -> BTreeMap<String, BTreeMap<Period, Decimal>> {
        let mut demand: BTreeMap<String, BTreeMap<Period, Decimal>> = BTreeMap::new();
        for entry in plan {
            *demand
                .entry(entry.product_id.clone())
                .or_default()
                .entry(entry.period)
                .or_insert(Decimal::ZERO) += entry.planned_qty;
        }
        demand
    }

    /// 將期間數量對齊到計劃期間，沒有數量的期間為 0
    pub fn bucket(values: Option<&BTreeMap<Period, Decimal>>, horizon: &[Period]) -> Vec<Decimal> {
        horizon
            .iter()
            .map(|p| {
                values
                    .and_then(|v| v.get(p))
                    .copied()
                    .unwrap_or(Decimal::ZERO)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::PlanSource;

    fn entry(product: &str, month: u32, qty: i64) -> ProductionPlanEntry {
        ProductionPlanEntry {
            product_id: product.to_string(),
            period: Period::new(2025, month).unwrap(),
            planned_qty: Decimal::from(qty),
            source: PlanSource::ForecastDerived,
            forecast_qty: Decimal::from(qty),
            demand_qty: Decimal::from(qty),
            opening_inventory: Decimal::ZERO,
            incoming_qty: Decimal::ZERO,
            target_inventory: Decimal::ZERO,
            ending_inventory: Decimal::ZERO,
            shortfall: Decimal::ZERO,
            overtime_qty: Decimal::ZERO,
            overtime_cost: Decimal::ZERO,
            resource_id: None,
        }
    }

    #[test]
    fn test_horizon_is_gapless() {
        let plan = vec![entry("A", 3, 10), entry("B", 1, 5)];
        let horizon = BucketingCalculator::horizon(&plan);
        assert_eq!(horizon.len(), 3);
        assert_eq!(horizon[0], Period::new(2025, 1).unwrap());
        assert!(BucketingCalculator::horizon(&[]).is_empty());
    }

    #[test]
    fn test_bucket_fills_missing_periods() {
        let plan = vec![entry("A", 1, 10), entry("A", 3, 30), entry("B", 2, 5)];
        let horizon = BucketingCalculator::horizon(&plan);
        let demand = BucketingCalculator::independent_demand(&plan);

        let a = BucketingCalculator::bucket(demand.get("A"), &horizon);
        assert_eq!(a, vec![Decimal::from(10), Decimal::ZERO, Decimal::from(30)]);
        let missing = BucketingCalculator::bucket(demand.get("Z"), &horizon);
        assert_eq!(missing, vec![Decimal::ZERO; 3]);
    }
}
