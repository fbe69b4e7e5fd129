//! 逐期生產排程
//!
//! 以期間為外層迴圈、產品（依 ID 排序）為內層迴圈，讓共用資源的產品
//! 在同一期間依序佔用產能。每個產品只排入自己的計劃範圍，未滿足的需求結轉到下一期。

use plan_core::{
    CapacityTable, EntityError, Forecast, InventoryTable, ManualOverride, Period, PlanSource,
    PlannerPolicy, PlanningException, PlanningMode, ProductionPlanEntry, Result,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::capacity::{CapacityLedger, ResourceBinding};
use crate::constraint::{apply_min_batch, level_rate, OverrideSet};
use crate::ProductionPlan;

/// 生產計劃器
pub struct ProductionPlanner;

/// 單一產品的預測期間與每期預測量
struct ProductForecast {
    horizon: Vec<Period>,
    quantities: Vec<Decimal>,
}

/// 單一產品的排程狀態
struct ProductSchedule {
    product_id: String,
    horizon: Vec<Period>,
    forecasts: Vec<Decimal>,
    binding: ResourceBinding,
    level_rate: Decimal,
    on_hand: Decimal,
    backlog: Decimal,
    entries: Vec<ProductionPlanEntry>,
}

impl ProductSchedule {
    /// 期間在本產品計劃範圍中的位置
    fn index_of(&self, period: Period) -> Option<usize> {
        let start = *self.horizon.first()?;
        let t = usize::try_from(start.months_until(period)).ok()?;
        (t < self.horizon.len()).then_some(t)
    }
}

impl ProductionPlanner {
    /// 產生生產計劃
    ///
    /// `forecasts` 中同一 (產品, 期間) 有多筆時以最後一筆為準。每個產品的計劃範圍
    /// 從該產品最早的預測期間到最晚的預測期間，中間缺少預測的期間視為 0；
    /// `policy.horizon` 逐產品截短。
    pub fn plan(
        forecasts: &[Forecast],
        inventory: &InventoryTable,
        capacity: &CapacityTable,
        overrides: &[ManualOverride],
        policy: &PlannerPolicy,
    ) -> Result<ProductionPlan> {
        policy.validate()?;

        let grid = Self::forecast_grid(forecasts, policy.horizon);
        let periods: BTreeSet<Period> = grid
            .values()
            .flat_map(|f| f.horizon.iter().copied())
            .collect();
        let (Some(&first), Some(&last)) = (periods.first(), periods.last()) else {
            tracing::info!("沒有預測，生產計劃為空");
            return Ok(ProductionPlan::new(Vec::new(), Vec::new(), Vec::new(), Vec::new()));
        };

        tracing::info!(
            "開始生產計劃：{} 個產品，{} ~ {}，模式 {:?}",
            grid.len(),
            first,
            last,
            policy.mode
        );

        let pinned = OverrideSet::new(overrides);
        let horizons: BTreeMap<String, Vec<Period>> = grid
            .iter()
            .map(|(product_id, f)| (product_id.clone(), f.horizon.clone()))
            .collect();
        let mut warnings = pinned.unmatched(&horizons);
        let mut errors = Vec::new();
        let mut exceptions = Vec::new();

        // 步驟1: 綁定資源並計算平準化產率
        let mut schedules = Vec::with_capacity(grid.len());
        for (product_id, product) in grid {
            let binding =
                match ResourceBinding::resolve(&product_id, &product.horizon, capacity, policy) {
                    Ok((binding, warning)) => {
                        warnings.extend(warning);
                        binding
                    }
                    Err(err) => {
                        tracing::warn!("{} 無法排程: {}", product_id, err);
                        errors.push(EntityError::new(product_id.as_str(), &err));
                        continue;
                    }
                };

            let opening = match product.horizon.first() {
                Some(start) => inventory.opening_on_hand(&product_id, *start),
                None => continue,
            };
            let rate = match policy.mode {
                PlanningMode::MakeToForecast => Decimal::ZERO,
                PlanningMode::Level => {
                    let targets: Vec<Decimal> = product
                        .quantities
                        .iter()
                        .map(|f| policy.target_inventory.target_for(*f))
                        .collect();
                    let incoming: Vec<Decimal> = product
                        .horizon
                        .iter()
                        .map(|p| inventory.incoming(&product_id, *p))
                        .collect();
                    level_rate(&product.quantities, &targets, opening, &incoming)
                }
            };

            schedules.push(ProductSchedule {
                entries: Vec::with_capacity(product.horizon.len()),
                product_id,
                horizon: product.horizon,
                forecasts: product.quantities,
                binding,
                level_rate: rate,
                on_hand: opening,
                backlog: Decimal::ZERO,
            });
        }

        // 步驟2: 逐期排程（只排入各產品自己的計劃範圍）
        let mut ledger = CapacityLedger::new(capacity);
        for period in &periods {
            for schedule in schedules.iter_mut() {
                let Some(t) = schedule.index_of(*period) else {
                    continue;
                };
                let entry = Self::schedule_period(
                    schedule,
                    t,
                    *period,
                    inventory,
                    &pinned,
                    &mut ledger,
                    policy,
                    &mut exceptions,
                );
                schedule.entries.push(entry);
            }
        }

        let entries: Vec<ProductionPlanEntry> =
            schedules.into_iter().flat_map(|s| s.entries).collect();

        tracing::info!(
            "生產計劃完成：{} 筆明細，{} 個例外，{} 個失敗產品",
            entries.len(),
            exceptions.len(),
            errors.len()
        );

        Ok(ProductionPlan::new(entries, exceptions, warnings, errors))
    }

    /// 依產品整理預測：每個產品各自的連續計劃期間與每期預測量
    fn forecast_grid(
        forecasts: &[Forecast],
        limit: Option<usize>,
    ) -> BTreeMap<String, ProductForecast> {
        let mut latest: BTreeMap<&str, BTreeMap<Period, Decimal>> = BTreeMap::new();
        for forecast in forecasts {
            latest
                .entry(forecast.product_id.as_str())
                .or_default()
                .insert(forecast.period, forecast.predicted_quantity);
        }

        latest
            .into_iter()
            .filter_map(|(product_id, by_period)| {
                let start = *by_period.keys().next()?;
                let end = *by_period.keys().next_back()?;
                let mut horizon = Period::span(start, end);
                if let Some(limit) = limit {
                    horizon.truncate(limit);
                }
                let quantities = horizon
                    .iter()
                    .map(|p| by_period.get(p).copied().unwrap_or(Decimal::ZERO))
                    .collect();
                Some((
                    product_id.to_string(),
                    ProductForecast {
                        horizon,
                        quantities,
                    },
                ))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule_period(
        schedule: &mut ProductSchedule,
        t: usize,
        period: Period,
        inventory: &InventoryTable,
        pinned: &OverrideSet,
        ledger: &mut CapacityLedger<'_>,
        policy: &PlannerPolicy,
        exceptions: &mut Vec<PlanningException>,
    ) -> ProductionPlanEntry {
        let product_id = schedule.product_id.as_str();
        let forecast = schedule.forecasts[t];

        let opening = schedule.on_hand;
        let incoming = inventory.incoming(product_id, period);
        let available = opening + incoming;
        let demand = forecast + schedule.backlog;
        let target = policy.target_inventory.target_for(forecast);
        let required = (demand + target - available).max(Decimal::ZERO);

        let resource = schedule.binding.resource_id().map(str::to_string);
        let mut overtime_qty = Decimal::ZERO;

        let (planned, source) = match pinned.get(product_id, period) {
            Some(pinned_qty) => {
                // 人工指定量不受產能裁切，超出時回報
                if let Some(resource_id) = &resource {
                    if let Some(remaining) = ledger.force(resource_id, period, pinned_qty) {
                        if pinned_qty > remaining {
                            exceptions.push(PlanningException::CapacityExceeded {
                                product_id: product_id.to_string(),
                                resource_id: Some(resource_id.clone()),
                                period,
                                planned_qty: pinned_qty,
                                capacity: remaining,
                            });
                        }
                    }
                }
                (pinned_qty, PlanSource::ManualOverride)
            }
            None => {
                let desired = match policy.mode {
                    PlanningMode::MakeToForecast => required,
                    PlanningMode::Level => schedule.level_rate.max(required),
                };
                let desired = apply_min_batch(desired, policy.min_batch_size);

                let planned = match &resource {
                    Some(resource_id) => {
                        let allocation =
                            ledger.allocate(resource_id, period, desired, &policy.overtime);
                        overtime_qty = allocation.overtime;
                        allocation.total()
                    }
                    None => desired,
                };
                (planned, PlanSource::ForecastDerived)
            }
        };

        let overtime_cost = overtime_qty * policy.overtime.cost_per_unit;
        if overtime_qty > Decimal::ZERO {
            exceptions.push(PlanningException::Overtime {
                product_id: product_id.to_string(),
                resource_id: resource.clone().unwrap_or_default(),
                period,
                quantity: overtime_qty,
                cost: overtime_cost,
            });
        }

        let balance = available + planned - demand;
        let shortfall = (-balance).max(Decimal::ZERO);
        let ending = balance.max(Decimal::ZERO);

        if shortfall > Decimal::ZERO {
            tracing::debug!("{} 在 {} 缺貨 {}，結轉下期", product_id, period, shortfall);
            exceptions.push(PlanningException::Shortfall {
                product_id: product_id.to_string(),
                period,
                quantity: shortfall,
            });
        }

        schedule.on_hand = ending;
        schedule.backlog = shortfall;

        ProductionPlanEntry {
            product_id: product_id.to_string(),
            period,
            planned_qty: planned,
            source,
            forecast_qty: forecast,
            demand_qty: demand,
            opening_inventory: opening,
            incoming_qty: incoming,
            target_inventory: target,
            ending_inventory: ending,
            shortfall,
            overtime_qty,
            overtime_cost,
            resource_id: resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use plan_core::{
        CapacityRecord, ForecastMethod, InventoryRecord, MissingDataPolicy, OvertimePolicy,
        TargetInventory,
    };

    fn period(month: u32) -> Period {
        Period::new(2025, month).unwrap()
    }

    fn flat_forecasts(product: &str, values: &[i64]) -> Vec<Forecast> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Forecast::new(
                    product,
                    period(i as u32 + 1),
                    Decimal::from(*v),
                    ForecastMethod::moving_average(3),
                    NaiveDateTime::default(),
                )
            })
            .collect()
    }

    fn capacity(resource: &str, units: i64, months: u32) -> CapacityTable {
        CapacityTable::from_records(
            (1..=months)
                .map(|m| CapacityRecord::new(resource, period(m), Decimal::from(units)).unwrap()),
        )
    }

    fn planned(plan: &ProductionPlan, product: &str) -> Vec<Decimal> {
        plan.entries_for(product).map(|e| e.planned_qty).collect()
    }

    fn d(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_flat_demand_within_capacity() {
        let forecasts = flat_forecasts("BIKE", &[100; 12]);
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 150, 12),
            &[],
            &PlannerPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.entries.len(), 12);
        assert!(plan.feasible);
        assert!(plan.exceptions.is_empty());
        for entry in &plan.entries {
            assert_eq!(entry.planned_qty, Decimal::from(100));
            assert_eq!(entry.ending_inventory, Decimal::ZERO);
            assert_eq!(entry.resource_id.as_deref(), Some("BIKE"));
        }
    }

    #[test]
    fn test_shortfall_carried_forward() {
        let forecasts = flat_forecasts("BIKE", &[100, 100, 100]);
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 80, 3),
            &[],
            &PlannerPolicy::default(),
        )
        .unwrap();

        assert_eq!(planned(&plan, "BIKE"), d(&[80, 80, 80]));
        let demand: Vec<Decimal> = plan.entries.iter().map(|e| e.demand_qty).collect();
        assert_eq!(demand, d(&[100, 120, 140]));
        let shortfall: Vec<Decimal> = plan.entries.iter().map(|e| e.shortfall).collect();
        assert_eq!(shortfall, d(&[20, 40, 60]));
        assert!(!plan.feasible);
        assert_eq!(plan.exceptions.len(), 3);
    }

    #[test]
    fn test_overtime_reported_with_cost() {
        let forecasts = flat_forecasts("BIKE", &[100]);
        let policy = PlannerPolicy::default().with_overtime(
            OvertimePolicy::allowed(Decimal::from(5)).with_max_ratio(Decimal::new(1, 1)),
        );
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 80, 1),
            &[],
            &policy,
        )
        .unwrap();

        let entry = &plan.entries[0];
        assert_eq!(entry.planned_qty, Decimal::from(88));
        assert_eq!(entry.overtime_qty, Decimal::from(8));
        assert_eq!(entry.overtime_cost, Decimal::from(40));
        assert_eq!(entry.shortfall, Decimal::from(12));
        assert_eq!(plan.total_overtime_cost(), Decimal::from(40));
        assert!(plan
            .exceptions
            .iter()
            .any(|e| matches!(e, PlanningException::Overtime { .. })));
    }

    #[test]
    fn test_level_mode_builds_inventory() {
        let forecasts = flat_forecasts("BIKE", &[100, 200, 300]);
        let policy = PlannerPolicy::default().with_mode(PlanningMode::Level);
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 500, 3),
            &[],
            &policy,
        )
        .unwrap();

        assert_eq!(planned(&plan, "BIKE"), d(&[200, 200, 200]));
        let ending: Vec<Decimal> = plan.entries.iter().map(|e| e.ending_inventory).collect();
        assert_eq!(ending, d(&[100, 100, 0]));
        assert!(plan.feasible);
    }

    #[test]
    fn test_manual_override_propagates() {
        let forecasts = flat_forecasts("BIKE", &[100, 100, 100]);
        let overrides = vec![ManualOverride::new("BIKE", period(1), Decimal::from(150)).unwrap()];
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 150, 3),
            &overrides,
            &PlannerPolicy::default(),
        )
        .unwrap();

        assert_eq!(planned(&plan, "BIKE"), d(&[150, 50, 100]));
        assert!(plan.entries[0].is_manual());
        assert!(!plan.entries[1].is_manual());
        assert_eq!(plan.entries[0].ending_inventory, Decimal::from(50));
    }

    #[test]
    fn test_manual_override_above_capacity() {
        let forecasts = flat_forecasts("BIKE", &[100]);
        let overrides = vec![ManualOverride::new("BIKE", period(1), Decimal::from(200)).unwrap()];
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 150, 1),
            &overrides,
            &PlannerPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.entries[0].planned_qty, Decimal::from(200));
        assert!(matches!(
            plan.exceptions.as_slice(),
            [PlanningException::CapacityExceeded { capacity, .. }] if *capacity == Decimal::from(150)
        ));
    }

    #[test]
    fn test_shared_resource_served_in_product_order() {
        let mut forecasts = flat_forecasts("B-BIKE", &[100]);
        forecasts.extend(flat_forecasts("A-BIKE", &[100]));
        let policy = PlannerPolicy::default().with_default_resource("LINE");
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("LINE", 150, 1),
            &[],
            &policy,
        )
        .unwrap();

        assert_eq!(plan.products(), vec!["A-BIKE", "B-BIKE"]);
        assert_eq!(planned(&plan, "A-BIKE"), d(&[100]));
        assert_eq!(planned(&plan, "B-BIKE"), d(&[50]));
    }

    #[test]
    fn test_inventory_and_target() {
        let forecasts = flat_forecasts("BIKE", &[100, 100]);
        let inventory = InventoryTable::from_records(vec![
            InventoryRecord::new("BIKE", period(1), Decimal::from(30), Decimal::ZERO, Decimal::ZERO)
                .unwrap(),
            InventoryRecord::new("BIKE", period(2), Decimal::ZERO, Decimal::from(50), Decimal::ZERO)
                .unwrap(),
        ]);
        let policy = PlannerPolicy::default()
            .with_target_inventory(TargetInventory::RatioOfForecast(Decimal::new(2, 1)));
        let plan = ProductionPlanner::plan(
            &forecasts,
            &inventory,
            &capacity("BIKE", 500, 2),
            &[],
            &policy,
        )
        .unwrap();

        // 第一期：100 + 20 - 30 = 90；第二期：100 + 20 - (20 + 50) = 50
        assert_eq!(planned(&plan, "BIKE"), d(&[90, 50]));
        assert_eq!(plan.entries[1].opening_inventory, Decimal::from(20));
        assert_eq!(plan.entries[1].incoming_qty, Decimal::from(50));
        assert_eq!(plan.entries[1].ending_inventory, Decimal::from(20));
    }

    #[test]
    fn test_min_batch_rounds_up() {
        let forecasts = flat_forecasts("BIKE", &[30, 30, 30, 30]);
        let policy = PlannerPolicy::default().with_min_batch_size(Decimal::from(100));
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("BIKE", 500, 4),
            &[],
            &policy,
        )
        .unwrap();

        assert_eq!(planned(&plan, "BIKE"), d(&[100, 0, 0, 100]));
    }

    #[test]
    fn test_missing_capacity_policies() {
        let forecasts = flat_forecasts("BIKE", &[100, 100]);

        let lenient = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &CapacityTable::new(),
            &[],
            &PlannerPolicy::default(),
        )
        .unwrap();
        assert_eq!(planned(&lenient, "BIKE"), d(&[100, 100]));
        assert_eq!(lenient.warnings.len(), 1);
        assert!(lenient.entries[0].resource_id.is_none());

        let strict = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &CapacityTable::new(),
            &[],
            &PlannerPolicy::default().with_missing_capacity(MissingDataPolicy::Fail),
        )
        .unwrap();
        assert!(strict.entries.is_empty());
        assert_eq!(strict.errors.len(), 1);
        assert_eq!(strict.errors[0].entity_id, "BIKE");
        assert!(!strict.feasible);
    }

    #[test]
    fn test_horizon_limit_and_gapless_output() {
        let mut forecasts = flat_forecasts("BIKE", &[100, 100, 100, 100]);
        forecasts.retain(|f| f.period != period(2));
        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &CapacityTable::new(),
            &[],
            &PlannerPolicy::default().with_horizon(3),
        )
        .unwrap();

        assert_eq!(plan.horizon(), vec![period(1), period(2), period(3)]);
        assert_eq!(plan.entry("BIKE", period(2)).unwrap().forecast_qty, Decimal::ZERO);
    }

    #[test]
    fn test_each_product_keeps_its_own_horizon() {
        // A 的預測從 4 月開始，B 從 1 月開始
        let mut forecasts: Vec<Forecast> = flat_forecasts("A", &[0, 0, 0, 100, 100, 100])
            .into_iter()
            .filter(|f| f.period >= period(4))
            .collect();
        forecasts.extend(flat_forecasts("B", &[50, 50, 50]));

        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &CapacityTable::new(),
            &[],
            &PlannerPolicy::default().with_horizon(3),
        )
        .unwrap();

        let a_periods: Vec<Period> = plan.entries_for("A").map(|e| e.period).collect();
        assert_eq!(a_periods, vec![period(4), period(5), period(6)]);
        assert_eq!(planned(&plan, "A"), d(&[100, 100, 100]));
        let b_periods: Vec<Period> = plan.entries_for("B").map(|e| e.period).collect();
        assert_eq!(b_periods, vec![period(1), period(2), period(3)]);
        assert_eq!(planned(&plan, "B"), d(&[50, 50, 50]));
    }

    #[test]
    fn test_shared_resource_with_staggered_horizons() {
        // B 在 1 月先用掉產能，A 從 2 月才開始排
        let mut forecasts: Vec<Forecast> = flat_forecasts("A", &[0, 100])
            .into_iter()
            .filter(|f| f.period == period(2))
            .collect();
        forecasts.extend(flat_forecasts("B", &[100, 100]));
        let policy = PlannerPolicy::default().with_default_resource("LINE");

        let plan = ProductionPlanner::plan(
            &forecasts,
            &InventoryTable::new(),
            &capacity("LINE", 150, 2),
            &[],
            &policy,
        )
        .unwrap();

        assert_eq!(planned(&plan, "A"), d(&[100]));
        assert_eq!(planned(&plan, "B"), d(&[100, 50]));
        assert_eq!(plan.entry("B", period(2)).unwrap().shortfall, Decimal::from(50));
    }

    #[test]
    fn test_empty_forecasts() {
        let plan = ProductionPlanner::plan(
            &[],
            &InventoryTable::new(),
            &CapacityTable::new(),
            &[],
            &PlannerPolicy::default(),
        )
        .unwrap();
        assert!(plan.entries.is_empty());
        assert!(plan.feasible);
    }
}
