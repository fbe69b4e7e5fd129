//! MRP 主計算器

use plan_bom::BomGraph;
use plan_core::{
    EntityError, InventoryTable, MrpPolicy, MrpRequirement, Period, PlannedOrderType,
    PlanningException, ProductionPlanEntry, Result, SupplierTable, Warning,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::bucketing::BucketingCalculator;
use crate::lead_time::LeadTimeCalculator;
use crate::lot_sizing::OrderTerms;
use crate::netting::{NettingCalculator, NettingInput};
use crate::pegging::PeggingCalculator;
use crate::MrpResult;

/// MRP 計算器
pub struct MrpCalculator<'a> {
    /// BOM 圖
    bom: &'a BomGraph,

    /// 庫存
    inventory: &'a InventoryTable,

    /// 供應商
    suppliers: &'a SupplierTable,

    /// MRP 策略
    policy: &'a MrpPolicy,
}

/// 單一物料的計算結果
#[derive(Debug, Default)]
struct ItemOutcome {
    requirements: Vec<MrpRequirement>,
    exceptions: Vec<PlanningException>,
    warning: Option<Warning>,

    /// 展開給子件的訂單釋放（期間, 數量）
    releases: Vec<(Period, Decimal)>,
}

/// 計算共用的上下文
struct Context<'c> {
    horizon: &'c [Period],
    today: Period,
    independent: &'c BTreeMap<String, BTreeMap<Period, Decimal>>,
    pegging: &'c PeggingCalculator,
}

impl<'a> MrpCalculator<'a> {
    /// 創建新的 MRP 計算器
    pub fn new(
        bom: &'a BomGraph,
        inventory: &'a InventoryTable,
        suppliers: &'a SupplierTable,
        policy: &'a MrpPolicy,
    ) -> Self {
        Self {
            bom,
            inventory,
            suppliers,
            policy,
        }
    }

    /// 主 MRP 計算入口
    ///
    /// 計劃起點（today）為生產計劃的第一個期間。單一物料失敗不影響其他物料，
    /// 但失敗物料的子件不會收到它的相依需求。
    pub fn calculate(&self, plan: &[ProductionPlanEntry]) -> Result<MrpResult> {
        self.policy.validate()?;

        tracing::info!(
            "開始 MRP 計算：生產計劃 {} 筆，BOM 物料 {} 個",
            plan.len(),
            self.bom.len()
        );

        // Step 1: 時間分桶
        let horizon = BucketingCalculator::horizon(plan);
        let Some(&today) = horizon.first() else {
            tracing::info!("生產計劃為空，略過 MRP");
            return Ok(MrpResult::default());
        };
        let independent = BucketingCalculator::independent_demand(plan);
        tracing::debug!("時間桶數量: {}", horizon.len());

        // Step 2: 依低階碼分層
        let levels = self.levels(&independent);
        tracing::debug!("物料層數: {}", levels.len());

        // Step 3: 逐層計算，同層物料並行
        let mut pegging = PeggingCalculator::new();
        let mut result = MrpResult {
            horizon: horizon.clone(),
            ..MrpResult::default()
        };

        for (level, items) in &levels {
            tracing::debug!("計算第 {} 層：{} 個物料", level, items.len());

            let context = Context {
                horizon: &horizon,
                today,
                independent: &independent,
                pegging: &pegging,
            };
            let outcomes: Vec<(&String, Result<ItemOutcome>)> = items
                .par_iter()
                .map(|item| (item, self.calculate_item(item, &context)))
                .collect();

            for (item, outcome) in outcomes {
                match outcome {
                    Ok(outcome) => {
                        // Step 4: BOM 展開，為子件生成相依需求
                        if let Err(err) = pegging.perform(item, &outcome.releases, self.bom) {
                            tracing::warn!("物料 {} 展開相依需求失敗: {}", item, err);
                            result.errors.push(EntityError::new(item.as_str(), &err));
                            continue;
                        }
                        result.requirements.extend(outcome.requirements);
                        result.exceptions.extend(outcome.exceptions);
                        result.warnings.extend(outcome.warning);
                    }
                    Err(err) => {
                        tracing::warn!("物料 {} MRP 計算失敗: {}", item, err);
                        result.errors.push(EntityError::new(item.as_str(), &err));
                    }
                }
            }
        }

        result
            .requirements
            .sort_by(|a, b| a.item_id.cmp(&b.item_id).then(a.period.cmp(&b.period)));

        tracing::info!(
            "MRP 計算完成：{} 筆需求，{} 筆建議訂單，{} 個例外，{} 個失敗物料",
            result.requirements.len(),
            result.planned_orders().count(),
            result.exceptions.len(),
            result.errors.len()
        );

        Ok(result)
    }

    /// 生產計劃中的產品及其所有下階物料，依低階碼分層
    fn levels(
        &self,
        independent: &BTreeMap<String, BTreeMap<Period, Decimal>>,
    ) -> BTreeMap<u32, Vec<String>> {
        let mut reachable: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<String> = independent.keys().cloned().collect();

        while let Some(item) = stack.pop() {
            if !reachable.insert(item.clone()) {
                continue;
            }
            for (child, _) in self.bom.children(&item) {
                if !reachable.contains(child) {
                    stack.push(child.to_string());
                }
            }
        }

        let mut levels: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for item in reachable {
            let level = self.bom.low_level_code(&item).unwrap_or(0);
            levels.entry(level).or_default().push(item);
        }
        levels
    }

    fn calculate_item(&self, item_id: &str, context: &Context<'_>) -> Result<ItemOutcome> {
        let dependent = context.pegging.gross(item_id, context.horizon)?;

        if let Some(planned) = context.independent.get(item_id) {
            return Ok(self.planned_item(item_id, planned, &dependent, context));
        }

        let (terms, warning) =
            OrderTerms::resolve(item_id, self.bom.has_children(item_id), self.suppliers, self.policy)?;

        let input = NettingInput {
            opening: self.inventory.opening_on_hand(item_id, context.today),
            gross: dependent,
            incoming: context
                .horizon
                .iter()
                .map(|p| self.inventory.incoming(item_id, *p))
                .collect(),
            safety: context
                .horizon
                .iter()
                .map(|p| self.inventory.safety_stock(item_id, *p))
                .collect(),
        };

        let rows = NettingCalculator::calculate(
            context.horizon,
            &input,
            &terms,
            context.today,
            self.policy.expedite_late_orders,
        );

        let mut outcome = ItemOutcome {
            warning,
            ..ItemOutcome::default()
        };

        for row in rows {
            if row.late {
                outcome.exceptions.push(PlanningException::LateOrder {
                    item_id: item_id.to_string(),
                    period: row.period,
                    order_period: row.order_period,
                    quantity: row.order_qty,
                    periods_late: LeadTimeCalculator::periods_late(row.order_period, context.today),
                });
            }
            if row.deficit > Decimal::ZERO {
                outcome.exceptions.push(PlanningException::Stockout {
                    item_id: item_id.to_string(),
                    period: row.period,
                    quantity: row.deficit,
                });
            }

            let has_order = row.order_qty > Decimal::ZERO;
            if has_order && terms.order_type == PlannedOrderType::Production {
                outcome.releases.push((
                    LeadTimeCalculator::release_period(row.order_period, context.today),
                    row.order_qty,
                ));
            }

            outcome.requirements.push(MrpRequirement {
                item_id: item_id.to_string(),
                period: row.period,
                gross_requirement: row.gross_requirement,
                net_requirement: row.net_requirement,
                suggested_order_qty: row.order_qty,
                suggested_order_period: row.order_period,
                opening_balance: row.opening_balance,
                incoming_qty: row.incoming_qty,
                planned_receipt: row.planned_receipt,
                ending_balance: row.ending_balance,
                safety_stock: row.safety_stock,
                order_type: terms.order_type,
                supplier_id: terms.supplier_id.clone(),
                late: row.late,
                estimated_cost: if has_order {
                    terms.estimated_cost(row.order_qty)
                } else {
                    None
                },
                pegging: context.pegging.pegging(item_id, row.period),
            });
        }

        tracing::debug!(
            "物料 {} 完成：{} 期，{} 個例外",
            item_id,
            outcome.requirements.len(),
            outcome.exceptions.len()
        );
        Ok(outcome)
    }

    /// 生產計劃中的產品
    ///
    /// 成品庫存已在生產計劃中扣除，計劃生產量直接成為生產訂單，不再淨算。
    fn planned_item(
        &self,
        item_id: &str,
        planned: &BTreeMap<Period, Decimal>,
        dependent: &[Decimal],
        context: &Context<'_>,
    ) -> ItemOutcome {
        let lead_time = self.policy.production_lead_time_periods;
        let mut outcome = ItemOutcome::default();

        for (t, period) in context.horizon.iter().enumerate() {
            let gross = planned.get(period).copied().unwrap_or(Decimal::ZERO)
                + dependent.get(t).copied().unwrap_or(Decimal::ZERO);
            let order_period = LeadTimeCalculator::order_period(*period, lead_time);
            let late = gross > Decimal::ZERO && order_period < context.today;

            if late {
                outcome.exceptions.push(PlanningException::LateOrder {
                    item_id: item_id.to_string(),
                    period: *period,
                    order_period,
                    quantity: gross,
                    periods_late: LeadTimeCalculator::periods_late(order_period, context.today),
                });
            }
            if gross > Decimal::ZERO {
                outcome.releases.push((
                    LeadTimeCalculator::release_period(order_period, context.today),
                    gross,
                ));
            }

            outcome.requirements.push(MrpRequirement {
                item_id: item_id.to_string(),
                period: *period,
                gross_requirement: gross,
                net_requirement: gross,
                suggested_order_qty: gross,
                suggested_order_period: order_period,
                opening_balance: Decimal::ZERO,
                incoming_qty: Decimal::ZERO,
                planned_receipt: gross,
                ending_balance: Decimal::ZERO,
                safety_stock: Decimal::ZERO,
                order_type: PlannedOrderType::Production,
                supplier_id: None,
                late,
                estimated_cost: None,
                pegging: context.pegging.pegging(item_id, *period),
            });
        }

        outcome
    }
}
