//! 交期計算（以期間為單位）

use plan_core::Period;

/// 交期計算器
pub struct LeadTimeCalculator;

impl LeadTimeCalculator {
    /// 計算下單期間（需求期間往前推提前期）
    pub fn order_period(required: Period, lead_time_periods: u32) -> Period {
        required.sub_months(i64::from(lead_time_periods))
    }

    /// 計算到貨期間
    pub fn receipt_period(order: Period, lead_time_periods: u32) -> Period {
        order.add_months(i64::from(lead_time_periods))
    }

    /// 下單期間比計劃起點晚了幾期才能下單（0 表示準時）
    pub fn periods_late(order: Period, today: Period) -> i64 {
        order.months_until(today).max(0)
    }

    /// 實際釋放期間：早於計劃起點的訂單只能從起點開始
    pub fn release_period(order: Period, today: Period) -> Period {
        order.max(today)
    }
}
