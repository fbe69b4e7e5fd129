//! BOM 邊

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PlanError, Result};

/// BOM 關係：一單位 parent 需要 quantity_per_unit 單位 child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEdge {
    pub parent_id: String,
    pub child_id: String,
    pub quantity_per_unit: Decimal,
}

impl BomEdge {
    /// 創建 BOM 邊（用量必須大於 0，且不可自我引用）
    pub fn new(
        parent_id: impl Into<String>,
        child_id: impl Into<String>,
        quantity_per_unit: Decimal,
    ) -> Result<Self> {
        let parent_id = parent_id.into();
        let child_id = child_id.into();

        if quantity_per_unit < Decimal::ZERO {
            return Err(PlanError::NegativeQuantity {
                entity: format!("{parent_id}->{child_id}"),
                field: "quantity_per_unit",
                value: quantity_per_unit,
            });
        }
        if quantity_per_unit == Decimal::ZERO {
            return Err(PlanError::InvalidParameter(format!(
                "{parent_id}->{child_id} 的用量必須大於 0"
            )));
        }
        if parent_id == child_id {
            return Err(PlanError::CyclicBom {
                path: vec![parent_id.clone(), child_id],
            });
        }

        Ok(Self {
            parent_id,
            child_id,
            quantity_per_unit,
        })
    }
}
