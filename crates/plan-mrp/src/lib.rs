//! # Plan MRP
//!
//! 物料需求計劃：時間分桶、淨需求、批量、提前期、需求追溯

pub mod bucketing;
pub mod calculator;
pub mod lead_time;
pub mod lot_sizing;
pub mod netting;
pub mod pegging;

use plan_core::{EntityError, MrpRequirement, Period, PlanningException, Warning};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use calculator::MrpCalculator;
pub use lot_sizing::OrderTerms;

/// MRP 計算結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MrpResult {
    /// 計劃期間
    pub horizon: Vec<Period>,

    /// 需求明細，依物料、期間排序
    pub requirements: Vec<MrpRequirement>,

    /// 計劃例外（延遲訂單、庫存不足）
    pub exceptions: Vec<PlanningException>,

    /// 警告信息
    pub warnings: Vec<Warning>,

    /// 失敗的物料
    pub errors: Vec<EntityError>,
}

impl MrpResult {
    /// 物料的需求明細（依期間排序）
    pub fn requirements_for<'a>(
        &'a self,
        item_id: &'a str,
    ) -> impl Iterator<Item = &'a MrpRequirement> + 'a {
        self.requirements.iter().filter(move |r| r.item_id == item_id)
    }

    pub fn requirement(&self, item_id: &str, period: Period) -> Option<&MrpRequirement> {
        self.requirements
            .iter()
            .find(|r| r.item_id == item_id && r.period == period)
    }

    /// 有建議訂單的明細
    pub fn planned_orders(&self) -> impl Iterator<Item = &MrpRequirement> {
        self.requirements.iter().filter(|r| r.has_order())
    }

    /// 建議採購單
    pub fn purchase_orders(&self) -> impl Iterator<Item = &MrpRequirement> {
        self.planned_orders().filter(|r| r.is_purchase())
    }

    /// 估計採購總金額（沒有單價的物料不計）
    pub fn total_estimated_cost(&self) -> Decimal {
        self.requirements
            .iter()
            .filter_map(|r| r.estimated_cost)
            .sum()
    }

    /// 是否有延遲訂單
    pub fn has_late_orders(&self) -> bool {
        self.requirements.iter().any(|r| r.late)
    }
}
