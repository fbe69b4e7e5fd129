//! # Plan Optimizer
//!
//! 產能與庫存約束下的月度生產計劃（產能帳本、人工指定、逐期排程）

pub mod capacity;
pub mod constraint;
pub mod scheduling;

use plan_core::{EntityError, Period, PlanningException, ProductionPlanEntry, Warning};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use capacity::{Allocation, CapacityLedger, ResourceBinding};
pub use constraint::OverrideSet;
pub use scheduling::ProductionPlanner;

/// 生產計劃結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionPlan {
    /// 是否可行（沒有缺貨也沒有失敗的產品）
    pub feasible: bool,

    /// 計劃明細，依產品、期間排序
    pub entries: Vec<ProductionPlanEntry>,

    /// 計劃例外
    pub exceptions: Vec<PlanningException>,

    /// 警告
    pub warnings: Vec<Warning>,

    /// 失敗的產品
    pub errors: Vec<EntityError>,
}

impl ProductionPlan {
    pub fn new(
        entries: Vec<ProductionPlanEntry>,
        exceptions: Vec<PlanningException>,
        warnings: Vec<Warning>,
        errors: Vec<EntityError>,
    ) -> Self {
        let has_shortfall = exceptions
            .iter()
            .any(|e| matches!(e, PlanningException::Shortfall { .. }));
        Self {
            feasible: !has_shortfall && errors.is_empty(),
            entries,
            exceptions,
            warnings,
            errors,
        }
    }

    /// 計劃涵蓋的期間
    pub fn horizon(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self.entries.iter().map(|e| e.period).collect();
        periods.sort();
        periods.dedup();
        periods
    }

    /// 計劃中的產品
    pub fn products(&self) -> Vec<&str> {
        let mut products: Vec<&str> = self.entries.iter().map(|e| e.product_id.as_str()).collect();
        products.dedup();
        products
    }

    /// 產品的計劃明細（依期間排序）
    pub fn entries_for<'a>(
        &'a self,
        product_id: &'a str,
    ) -> impl Iterator<Item = &'a ProductionPlanEntry> + 'a {
        self.entries.iter().filter(move |e| e.product_id == product_id)
    }

    pub fn entry(&self, product_id: &str, period: Period) -> Option<&ProductionPlanEntry> {
        self.entries
            .iter()
            .find(|e| e.product_id == product_id && e.period == period)
    }

    /// 加班總成本
    pub fn total_overtime_cost(&self) -> Decimal {
        self.entries.iter().map(|e| e.overtime_cost).sum()
    }
}
