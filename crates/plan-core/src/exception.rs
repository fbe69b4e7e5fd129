//! 計劃例外與警告
//!
//! 例外是計劃結果的一部分（需要人員處理的狀況），不是錯誤。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Period;

/// 嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// 計劃例外
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanningException {
    /// 需求無法被滿足（結轉至下期）
    Shortfall {
        product_id: String,
        period: Period,
        quantity: Decimal,
    },

    /// 使用加班產能
    Overtime {
        product_id: String,
        resource_id: String,
        period: Period,
        quantity: Decimal,
        cost: Decimal,
    },

    /// 人工指定量超出產能
    CapacityExceeded {
        product_id: String,
        resource_id: Option<String>,
        period: Period,
        planned_qty: Decimal,
        capacity: Decimal,
    },

    /// 下單期間早於計劃起點
    LateOrder {
        item_id: String,
        period: Period,
        order_period: Period,
        quantity: Decimal,
        periods_late: i64,
    },

    /// 期末庫存不足
    Stockout {
        item_id: String,
        period: Period,
        quantity: Decimal,
    },

    /// 預測原始估計為負，已截為 0
    ClampedForecast {
        product_id: String,
        period: Period,
        raw_estimate: Decimal,
    },
}

impl PlanningException {
    /// 相關的產品或物料ID
    pub fn entity_id(&self) -> &str {
        match self {
            PlanningException::Shortfall { product_id, .. }
            | PlanningException::Overtime { product_id, .. }
            | PlanningException::CapacityExceeded { product_id, .. }
            | PlanningException::ClampedForecast { product_id, .. } => product_id,
            PlanningException::LateOrder { item_id, .. }
            | PlanningException::Stockout { item_id, .. } => item_id,
        }
    }

    pub fn period(&self) -> Period {
        match self {
            PlanningException::Shortfall { period, .. }
            | PlanningException::Overtime { period, .. }
            | PlanningException::CapacityExceeded { period, .. }
            | PlanningException::LateOrder { period, .. }
            | PlanningException::Stockout { period, .. }
            | PlanningException::ClampedForecast { period, .. } => *period,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PlanningException::ClampedForecast { .. } | PlanningException::Overtime { .. } => {
                Severity::Info
            }
            PlanningException::Shortfall { .. } | PlanningException::CapacityExceeded { .. } => {
                Severity::Warning
            }
            PlanningException::LateOrder { .. } | PlanningException::Stockout { .. } => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for PlanningException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningException::Shortfall {
                product_id,
                period,
                quantity,
            } => write!(f, "{product_id} 在 {period} 缺貨 {quantity}"),
            PlanningException::Overtime {
                product_id,
                resource_id,
                period,
                quantity,
                cost,
            } => write!(
                f,
                "{product_id} 在 {period} 於 {resource_id} 加班生產 {quantity}（成本 {cost}）"
            ),
            PlanningException::CapacityExceeded {
                product_id,
                period,
                planned_qty,
                capacity,
                ..
            } => write!(
                f,
                "{product_id} 在 {period} 的計劃量 {planned_qty} 超出產能 {capacity}"
            ),
            PlanningException::LateOrder {
                item_id,
                period,
                order_period,
                periods_late,
                ..
            } => write!(
                f,
                "{item_id} 的 {period} 需求應於 {order_period} 下單，已延遲 {periods_late} 期"
            ),
            PlanningException::Stockout {
                item_id,
                period,
                quantity,
            } => write!(f, "{item_id} 在 {period} 庫存不足 {quantity}"),
            PlanningException::ClampedForecast {
                product_id,
                period,
                raw_estimate,
            } => write!(f, "{product_id} 在 {period} 的預測 {raw_estimate} 為負，已截為 0"),
        }
    }
}

/// 警告（主資料缺漏時採用預設值等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub entity_id: String,
    pub message: String,
    pub severity: Severity,
}

impl Warning {
    pub fn new(entity_id: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            entity_id: entity_id.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(entity_id, message, Severity::Info)
    }

    pub fn warning(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(entity_id, message, Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_accessors() {
        let period = Period::new(2025, 11).unwrap();
        let late = PlanningException::LateOrder {
            item_id: "C".to_string(),
            period,
            order_period: period.pred(),
            quantity: Decimal::from(80),
            periods_late: 1,
        };
        assert_eq!(late.entity_id(), "C");
        assert_eq!(late.period(), period);
        assert_eq!(late.severity(), Severity::Error);
        assert!(late.to_string().contains("2025-10"));
    }

    #[test]
    fn test_exception_serde_tag() {
        let exception = PlanningException::Stockout {
            item_id: "C".to_string(),
            period: Period::new(2025, 11).unwrap(),
            quantity: Decimal::from(5),
        };
        let json = serde_json::to_value(&exception).unwrap();
        assert_eq!(json["type"], "Stockout");
        assert_eq!(json["period"], "2025-11");
    }
}
