//! BOM 展開
//!
//! 沿拓撲順序逐層累加需求量（不使用遞迴），多條路徑到達同一物料時數量加總。

use plan_core::{PlanError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::{BomGraph, ItemClass};

impl BomGraph {
    /// 展開產品的所有下階物料（含半成品）
    ///
    /// 回傳 物料ID -> 總用量，不含產品本身。用量溢位時回傳 `InvalidParameter`。
    pub fn explode(&self, product_id: &str, quantity: Decimal) -> Result<BTreeMap<String, Decimal>> {
        if !self.contains(product_id) {
            return Err(PlanError::UnknownItem(product_id.to_string()));
        }

        let mut required: BTreeMap<&str, Decimal> = BTreeMap::new();
        required.insert(product_id, quantity);

        let order = self.topological_order();
        let start = order
            .iter()
            .position(|item| item == product_id)
            .unwrap_or(order.len());

        for item in &order[start..] {
            let Some(&item_qty) = required.get(item.as_str()) else {
                continue;
            };
            for (child, per_unit) in self.children(item) {
                let slot = required.entry(child).or_insert(Decimal::ZERO);
                let current = *slot;
                *slot = item_qty
                    .checked_mul(per_unit)
                    .and_then(|qty| current.checked_add(qty))
                    .ok_or_else(|| {
                        PlanError::InvalidParameter(format!(
                            "{product_id} 展開到 {child} 的用量超出數值範圍"
                        ))
                    })?;
            }
        }

        required.remove(product_id);
        Ok(required
            .into_iter()
            .map(|(item, qty)| (item.to_string(), qty))
            .collect())
    }

    /// 只展開到最底層原料
    pub fn explode_leaves(
        &self,
        product_id: &str,
        quantity: Decimal,
    ) -> Result<BTreeMap<String, Decimal>> {
        self.explode_by_class(product_id, quantity, ItemClass::RawMaterial)
    }

    /// 展開並只保留指定類別的物料
    pub fn explode_by_class(
        &self,
        product_id: &str,
        quantity: Decimal,
        class: ItemClass,
    ) -> Result<BTreeMap<String, Decimal>> {
        let mut exploded = self.explode(product_id, quantity)?;
        exploded.retain(|item, _| self.item_class(item) == class);
        Ok(exploded)
    }
}
