//! 批量規則與訂購條件

use plan_core::quantity::ceil_to_multiple;
use plan_core::{
    MasterDataKind, MissingDataPolicy, MrpPolicy, PlanError, PlannedOrderType, Result,
    SupplierRecord, SupplierTable, Warning,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 物料的訂購條件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerms {
    /// 訂單類型
    pub order_type: PlannedOrderType,

    /// 供應商（自製或使用預設條件時為 None）
    pub supplier_id: Option<String>,

    /// 提前期（期數）
    pub lead_time_periods: u32,

    /// 最小訂購量
    pub min_order_qty: Decimal,

    /// 訂購倍數
    pub lot_size_multiple: Decimal,

    /// 單價
    pub unit_price: Option<Decimal>,
}

impl OrderTerms {
    /// 首選供應商的採購條件
    pub fn from_supplier(record: &SupplierRecord) -> Self {
        Self {
            order_type: PlannedOrderType::Purchase,
            supplier_id: Some(record.supplier_id.clone()),
            lead_time_periods: record.lead_time_periods,
            min_order_qty: record.min_order_qty,
            lot_size_multiple: record.lot_size_multiple,
            unit_price: record.unit_price,
        }
    }

    /// 自製條件（批對批）
    pub fn production(lead_time_periods: u32) -> Self {
        Self {
            order_type: PlannedOrderType::Production,
            supplier_id: None,
            lead_time_periods,
            min_order_qty: Decimal::ZERO,
            lot_size_multiple: Decimal::ONE,
            unit_price: None,
        }
    }

    /// 缺少供應商資料時的預設採購條件
    pub fn default_purchase(policy: &MrpPolicy) -> Self {
        Self {
            order_type: PlannedOrderType::Purchase,
            supplier_id: None,
            lead_time_periods: policy.default_lead_time_periods,
            min_order_qty: policy.default_min_order_qty,
            lot_size_multiple: policy.default_lot_size_multiple,
            unit_price: None,
        }
    }

    /// 決定物料的訂購條件
    ///
    /// 有供應商記錄 -> 採購；有子件 -> 自製；沒有子件也沒有供應商 -> 依缺漏策略。
    pub fn resolve(
        item_id: &str,
        has_children: bool,
        suppliers: &SupplierTable,
        policy: &MrpPolicy,
    ) -> Result<(Self, Option<Warning>)> {
        if let Some(record) = suppliers.preferred(item_id) {
            return Ok((Self::from_supplier(record), None));
        }
        if has_children {
            return Ok((Self::production(policy.production_lead_time_periods), None));
        }

        match policy.missing_supplier {
            MissingDataPolicy::Fail => Err(PlanError::MissingMasterData {
                item_id: item_id.to_string(),
                kind: MasterDataKind::Supplier,
            }),
            MissingDataPolicy::DefaultWithWarning => {
                let terms = Self::default_purchase(policy);
                let message = format!(
                    "缺少供應商資料，使用預設條件（提前期 {} 期，最小訂購量 {}，倍數 {}）",
                    terms.lead_time_periods, terms.min_order_qty, terms.lot_size_multiple
                );
                tracing::warn!("{}: {}", item_id, message);
                Ok((terms, Some(Warning::warning(item_id, message))))
            }
        }
    }

    /// 估計金額
    pub fn estimated_cost(&self, quantity: Decimal) -> Option<Decimal> {
        self.unit_price.map(|price| price * quantity)
    }
}

/// 批量規則計算器
pub struct LotSizingCalculator;

impl LotSizingCalculator {
    /// 批對批，套用最小訂購量與訂購倍數
    pub fn apply(net_requirement: Decimal, terms: &OrderTerms) -> Decimal {
        if net_requirement <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let quantity = net_requirement.max(terms.min_order_qty);
        ceil_to_multiple(quantity, terms.lot_size_multiple)
    }
}
