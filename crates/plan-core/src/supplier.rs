//! 供應商模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::quantity::{ceil_to_multiple, ensure_non_negative};
use crate::{PlanError, Result};

/// 供應商記錄（零件的採購條件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    /// 零件ID
    pub component_id: String,

    /// 供應商ID
    pub supplier_id: String,

    /// 提前期（期數）
    pub lead_time_periods: u32,

    /// 最小訂購量
    pub min_order_qty: Decimal,

    /// 訂購倍數（至少為 1）
    pub lot_size_multiple: Decimal,

    /// 單價
    pub unit_price: Option<Decimal>,
}

impl SupplierRecord {
    /// 創建新的供應商記錄
    pub fn new(
        component_id: impl Into<String>,
        supplier_id: impl Into<String>,
        lead_time_periods: u32,
        min_order_qty: Decimal,
        lot_size_multiple: Decimal,
    ) -> Result<Self> {
        let component_id = component_id.into();
        ensure_non_negative(&component_id, "min_order_qty", min_order_qty)?;
        if lot_size_multiple < Decimal::ONE {
            return Err(PlanError::InvalidParameter(format!(
                "{component_id} 的訂購倍數必須至少為 1，實際為 {lot_size_multiple}"
            )));
        }
        Ok(Self {
            component_id,
            supplier_id: supplier_id.into(),
            lead_time_periods,
            min_order_qty,
            lot_size_multiple,
            unit_price: None,
        })
    }

    /// 建構器模式：設置單價
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Result<Self> {
        ensure_non_negative(&self.component_id, "unit_price", unit_price)?;
        self.unit_price = Some(unit_price);
        Ok(self)
    }

    /// 調整訂購量以符合採購條件
    ///
    /// 先套用最小訂購量，再向上取整到訂購倍數；淨需求為 0 時不下單。
    pub fn adjust_order_quantity(&self, net_requirement: Decimal) -> Decimal {
        if net_requirement <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let quantity = net_requirement.max(self.min_order_qty);
        ceil_to_multiple(quantity, self.lot_size_multiple)
    }

    /// 估計採購金額
    pub fn estimated_cost(&self, quantity: Decimal) -> Option<Decimal> {
        self.unit_price.map(|price| price * quantity)
    }
}

/// 供應商表：零件ID -> 依登錄順序的供應商
///
/// 第一個登錄的供應商為首選供應商。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierTable {
    suppliers: BTreeMap<String, Vec<SupplierRecord>>,
}

impl SupplierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SupplierRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: SupplierRecord) {
        self.suppliers
            .entry(record.component_id.clone())
            .or_default()
            .push(record);
    }

    /// 首選供應商
    pub fn preferred(&self, component_id: &str) -> Option<&SupplierRecord> {
        self.suppliers.get(component_id).and_then(|s| s.first())
    }

    pub fn suppliers(&self, component_id: &str) -> &[SupplierRecord] {
        self.suppliers
            .get(component_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, component_id: &str) -> bool {
        self.suppliers.contains_key(component_id)
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }
}
