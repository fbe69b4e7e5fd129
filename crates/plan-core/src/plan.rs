//! 計劃結果模型（生產計劃與 MRP 需求）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quantity::ensure_non_negative;
use crate::{Period, Result};

/// 每月天數（計算庫存可用天數）
pub const DAYS_PER_MONTH: u32 = 30;

/// 生產計劃來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSource {
    /// 由預測推導
    ForecastDerived,
    /// 人工指定
    ManualOverride,
}

/// 人工指定的生產量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub product_id: String,
    pub period: Period,
    pub planned_qty: Decimal,
}

impl ManualOverride {
    pub fn new(product_id: impl Into<String>, period: Period, planned_qty: Decimal) -> Result<Self> {
        let product_id = product_id.into();
        ensure_non_negative(&product_id, "planned_qty", planned_qty)?;
        Ok(Self {
            product_id,
            period,
            planned_qty,
        })
    }
}

/// 生產計劃明細（產品 × 期間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionPlanEntry {
    /// 產品ID
    pub product_id: String,

    /// 期間
    pub period: Period,

    /// 計劃生產量
    pub planned_qty: Decimal,

    /// 來源
    pub source: PlanSource,

    /// 本期預測
    pub forecast_qty: Decimal,

    /// 本期需求（預測 + 前期未滿足）
    pub demand_qty: Decimal,

    /// 期初庫存
    pub opening_inventory: Decimal,

    /// 本期到貨
    pub incoming_qty: Decimal,

    /// 目標期末庫存
    pub target_inventory: Decimal,

    /// 期末庫存
    pub ending_inventory: Decimal,

    /// 未滿足需求（結轉至下期）
    pub shortfall: Decimal,

    /// 超出產能的加班量
    pub overtime_qty: Decimal,

    /// 加班成本
    pub overtime_cost: Decimal,

    /// 使用的資源
    pub resource_id: Option<String>,
}

impl ProductionPlanEntry {
    /// 期末庫存可支應的天數（本期需求為 0 時無法計算）
    pub fn coverage_days(&self) -> Option<Decimal> {
        if self.demand_qty <= Decimal::ZERO {
            return None;
        }
        let daily = self.demand_qty / Decimal::from(DAYS_PER_MONTH);
        Some((self.ending_inventory / daily).round_dp(1))
    }

    pub fn is_manual(&self) -> bool {
        self.source == PlanSource::ManualOverride
    }
}

/// 計劃訂單類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannedOrderType {
    /// 採購
    Purchase,
    /// 生產
    Production,
}

/// 需求追溯記錄（毛需求來自哪個上階物料）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeggingRecord {
    /// 上階物料ID
    pub parent_id: String,

    /// 追溯數量
    pub quantity: Decimal,
}

impl PeggingRecord {
    pub fn new(parent_id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            parent_id: parent_id.into(),
            quantity,
        }
    }
}

/// MRP 需求明細（物料 × 期間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrpRequirement {
    /// 物料ID
    pub item_id: String,

    /// 需求期間
    pub period: Period,

    /// 毛需求
    pub gross_requirement: Decimal,

    /// 淨需求
    pub net_requirement: Decimal,

    /// 建議訂購量
    pub suggested_order_qty: Decimal,

    /// 建議下單期間（需求期間 - 提前期）
    pub suggested_order_period: Period,

    /// 期初庫存
    pub opening_balance: Decimal,

    /// 預計到貨
    pub incoming_qty: Decimal,

    /// 計劃收料（本期到貨的建議訂單）
    pub planned_receipt: Decimal,

    /// 期末庫存
    pub ending_balance: Decimal,

    /// 安全庫存
    pub safety_stock: Decimal,

    /// 訂單類型
    pub order_type: PlannedOrderType,

    /// 供應商
    pub supplier_id: Option<String>,

    /// 下單期間早於計劃起點
    pub late: bool,

    /// 估計採購金額
    pub estimated_cost: Option<Decimal>,

    /// 毛需求追溯
    pub pegging: Vec<PeggingRecord>,
}

impl MrpRequirement {
    pub fn has_order(&self) -> bool {
        self.suggested_order_qty > Decimal::ZERO
    }

    pub fn is_purchase(&self) -> bool {
        self.order_type == PlannedOrderType::Purchase
    }
}
