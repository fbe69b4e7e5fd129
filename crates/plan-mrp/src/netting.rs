//! 淨需求計算
//!
//! 逐期推算庫存：淨需求 = max(0, 毛需求 + 安全庫存 - 期初 - 預計到貨)，
//! 淨需求經批量調整後成為本期的計劃收料，期末庫存結轉為下期期初。

use plan_core::Period;
use rust_decimal::Decimal;

use crate::lead_time::LeadTimeCalculator;
use crate::lot_sizing::{LotSizingCalculator, OrderTerms};

/// 淨需求計算輸入（與計劃期間對齊）
#[derive(Debug, Clone, PartialEq)]
pub struct NettingInput {
    /// 計劃起點的期初庫存
    pub opening: Decimal,
    pub gross: Vec<Decimal>,
    pub incoming: Vec<Decimal>,
    pub safety: Vec<Decimal>,
}

/// 單期淨需求結果
#[derive(Debug, Clone, PartialEq)]
pub struct NetRequirement {
    pub period: Period,
    pub gross_requirement: Decimal,
    pub opening_balance: Decimal,
    pub incoming_qty: Decimal,
    pub safety_stock: Decimal,
    pub net_requirement: Decimal,

    /// 批量調整後的訂購量
    pub order_qty: Decimal,
    pub order_period: Period,

    /// 下單期間早於計劃起點
    pub late: bool,

    /// 計入本期的收料（延遲且不加急時為 0）
    pub planned_receipt: Decimal,
    pub ending_balance: Decimal,

    /// 期末庫存不足的數量
    pub deficit: Decimal,
}

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 計算淨需求
    ///
    /// `today` 為計劃起點；`expedite` 為 false 時延遲訂單不計入當期收料。
    pub fn calculate(
        horizon: &[Period],
        input: &NettingInput,
        terms: &OrderTerms,
        today: Period,
        expedite: bool,
    ) -> Vec<NetRequirement> {
        let mut results = Vec::with_capacity(horizon.len());
        let mut on_hand = input.opening;

        for (t, period) in horizon.iter().enumerate() {
            let gross = input.gross.get(t).copied().unwrap_or(Decimal::ZERO);
            let incoming = input.incoming.get(t).copied().unwrap_or(Decimal::ZERO);
            let safety = input.safety.get(t).copied().unwrap_or(Decimal::ZERO);

            let net = (gross + safety - on_hand - incoming).max(Decimal::ZERO);
            let order_qty = LotSizingCalculator::apply(net, terms);
            let order_period = LeadTimeCalculator::order_period(*period, terms.lead_time_periods);
            let late = order_qty > Decimal::ZERO && order_period < today;

            let planned_receipt = if late && !expedite {
                Decimal::ZERO
            } else {
                order_qty
            };

            let balance = on_hand + incoming + planned_receipt - gross;
            let deficit = (-balance).max(Decimal::ZERO);
            let ending = balance.max(Decimal::ZERO);

            results.push(NetRequirement {
                period: *period,
                gross_requirement: gross,
                opening_balance: on_hand,
                incoming_qty: incoming,
                safety_stock: safety,
                net_requirement: net,
                order_qty,
                order_period,
                late,
                planned_receipt,
                ending_balance: ending,
                deficit,
            });

            on_hand = ending;
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::PlannedOrderType;

    fn periods(count: usize) -> Vec<Period> {
        Period::range(Period::new(2025, 1).unwrap(), count)
    }

    fn d(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    fn terms(lead: u32, min: i64, multiple: i64) -> OrderTerms {
        OrderTerms {
            order_type: PlannedOrderType::Purchase,
            supplier_id: Some("SUP-1".to_string()),
            lead_time_periods: lead,
            min_order_qty: Decimal::from(min),
            lot_size_multiple: Decimal::from(multiple),
            unit_price: None,
        }
    }

    fn input(opening: i64, gross: &[i64]) -> NettingInput {
        NettingInput {
            opening: Decimal::from(opening),
            gross: d(gross),
            incoming: Vec::new(),
            safety: Vec::new(),
        }
    }

    #[test]
    fn test_basic_netting() {
        let horizon = periods(3);
        let results = NettingCalculator::calculate(
            &horizon,
            &input(20, &[100, 100, 100]),
            &terms(1, 0, 1),
            horizon[0],
            true,
        );

        let net: Vec<Decimal> = results.iter().map(|r| r.net_requirement).collect();
        assert_eq!(net, d(&[80, 100, 100]));
        assert!(results[0].late);
        assert_eq!(results[0].order_period, Period::new(2024, 12).unwrap());
        assert!(!results[1].late);
        assert!(results.iter().all(|r| r.ending_balance == Decimal::ZERO));
    }

    #[test]
    fn test_lot_excess_carries_forward() {
        let horizon = periods(3);
        let results = NettingCalculator::calculate(
            &horizon,
            &input(0, &[30, 30, 30]),
            &terms(0, 0, 50),
            horizon[0],
            true,
        );

        let orders: Vec<Decimal> = results.iter().map(|r| r.order_qty).collect();
        assert_eq!(orders, d(&[50, 50, 0]));
        let ending: Vec<Decimal> = results.iter().map(|r| r.ending_balance).collect();
        assert_eq!(ending, d(&[20, 40, 10]));
    }

    #[test]
    fn test_safety_stock_and_incoming() {
        let horizon = periods(2);
        let netting = NettingInput {
            opening: Decimal::from(10),
            gross: d(&[50, 50]),
            incoming: d(&[20, 0]),
            safety: d(&[15, 15]),
        };
        let results =
            NettingCalculator::calculate(&horizon, &netting, &terms(0, 0, 1), horizon[0], true);

        // 50 + 15 - 10 - 20 = 35，期末 = 10 + 20 + 35 - 50 = 15
        assert_eq!(results[0].net_requirement, Decimal::from(35));
        assert_eq!(results[0].ending_balance, Decimal::from(15));
        // 50 + 15 - 15 = 50
        assert_eq!(results[1].net_requirement, Decimal::from(50));
    }

    #[test]
    fn test_late_order_without_expedite_causes_deficit() {
        let horizon = periods(2);
        let results = NettingCalculator::calculate(
            &horizon,
            &input(20, &[100, 100]),
            &terms(1, 0, 1),
            horizon[0],
            false,
        );

        assert!(results[0].late);
        assert_eq!(results[0].planned_receipt, Decimal::ZERO);
        assert_eq!(results[0].deficit, Decimal::from(80));
        assert_eq!(results[0].ending_balance, Decimal::ZERO);
        // 第二期準時下單，正常收料
        assert_eq!(results[1].planned_receipt, Decimal::from(100));
        assert_eq!(results[1].deficit, Decimal::ZERO);
    }
}
