//! 需求追溯
//!
//! 上階物料的訂單釋放經 BOM 展開為子件的相依需求，每筆相依需求都記錄來源上階。

use plan_bom::BomGraph;
use plan_core::{PeggingRecord, PlanError, Period, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 相依需求與追溯記錄
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeggingCalculator {
    demand: BTreeMap<String, BTreeMap<Period, Vec<PeggingRecord>>>,
}

impl PeggingCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄一筆相依需求；同一期間同一上階的需求合併
    ///
    /// 合併後超出數值範圍時回傳錯誤，已有記錄不變。
    pub fn record(
        &mut self,
        child_id: &str,
        period: Period,
        parent_id: &str,
        quantity: Decimal,
    ) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Ok(());
        }
        let records = self
            .demand
            .entry(child_id.to_string())
            .or_default()
            .entry(period)
            .or_default();

        match records.iter_mut().find(|r| r.parent_id == parent_id) {
            Some(record) => {
                record.quantity = record
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| overflow(parent_id, child_id, period))?;
            }
            None => records.push(PeggingRecord::new(parent_id, quantity)),
        }
        Ok(())
    }

    /// 將上階的訂單釋放展開到直接子件
    ///
    /// 先算出全部展開量再寫入，任何一筆溢位時整個上階都不寫入。
    pub fn perform(
        &mut self,
        parent_id: &str,
        releases: &[(Period, Decimal)],
        bom: &BomGraph,
    ) -> Result<()> {
        let children = bom.children(parent_id);
        let mut staged: BTreeMap<(&str, Period), Decimal> = BTreeMap::new();
        for (period, quantity) in releases {
            for (child_id, per_unit) in &children {
                let slot = staged.entry((*child_id, *period)).or_insert(Decimal::ZERO);
                let current = *slot;
                *slot = quantity
                    .checked_mul(*per_unit)
                    .and_then(|qty| current.checked_add(qty))
                    .ok_or_else(|| overflow(parent_id, child_id, *period))?;
            }
        }

        for ((child_id, period), quantity) in &staged {
            self.recorded(child_id, *period, parent_id)
                .checked_add(*quantity)
                .ok_or_else(|| overflow(parent_id, child_id, *period))?;
        }
        for ((child_id, period), quantity) in staged {
            self.record(child_id, period, parent_id, quantity)?;
        }
        Ok(())
    }

    /// 物料在各期的相依毛需求（與計劃期間對齊）
    pub fn gross(&self, item_id: &str, horizon: &[Period]) -> Result<Vec<Decimal>> {
        horizon
            .iter()
            .map(|p| {
                self.pegging(item_id, *p)
                    .iter()
                    .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.quantity))
                    .ok_or_else(|| {
                        PlanError::InvalidParameter(format!("{item_id} 在 {p} 的相依需求超出數值範圍"))
                    })
            })
            .collect()
    }

    fn recorded(&self, child_id: &str, period: Period, parent_id: &str) -> Decimal {
        self.demand
            .get(child_id)
            .and_then(|periods| periods.get(&period))
            .and_then(|records| records.iter().find(|r| r.parent_id == parent_id))
            .map_or(Decimal::ZERO, |r| r.quantity)
    }

    /// 物料在某期的需求來源，依上階ID排序
    pub fn pegging(&self, item_id: &str, period: Period) -> Vec<PeggingRecord> {
        let mut records = self
            .demand
            .get(item_id)
            .and_then(|periods| periods.get(&period))
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| a.parent_id.cmp(&b.parent_id));
        records
    }
}

fn overflow(parent_id: &str, child_id: &str, period: Period) -> PlanError {
    PlanError::InvalidParameter(format!(
        "{parent_id} 在 {period} 展開到 {child_id} 的需求量超出數值範圍"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::BomEdge;

    fn period(month: u32) -> Period {
        Period::new(2025, month).unwrap()
    }

    #[test]
    fn test_pegging_merges_parents() {
        // 兩個產品共用零件 C
        let bom = BomGraph::from_edges(vec![
            BomEdge::new("BIKE", "C", Decimal::from(2)).unwrap(),
            BomEdge::new("TRIKE", "C", Decimal::from(3)).unwrap(),
        ])
        .unwrap();

        let mut pegging = PeggingCalculator::new();
        pegging
            .perform("TRIKE", &[(period(1), Decimal::from(10))], &bom)
            .unwrap();
        pegging
            .perform(
                "BIKE",
                &[(period(1), Decimal::from(50)), (period(2), Decimal::from(40))],
                &bom,
            )
            .unwrap();
        pegging
            .perform("BIKE", &[(period(1), Decimal::from(5))], &bom)
            .unwrap();

        let records = pegging.pegging("C", period(1));
        assert_eq!(
            records,
            vec![
                PeggingRecord::new("BIKE", Decimal::from(110)),
                PeggingRecord::new("TRIKE", Decimal::from(30)),
            ]
        );

        let gross = pegging.gross("C", &[period(1), period(2), period(3)]).unwrap();
        assert_eq!(gross, vec![Decimal::from(140), Decimal::from(80), Decimal::ZERO]);
    }

    #[test]
    fn test_zero_release_not_recorded() {
        let bom = BomGraph::from_edges(vec![BomEdge::new("BIKE", "C", Decimal::ONE).unwrap()]).unwrap();
        let mut pegging = PeggingCalculator::new();
        pegging
            .perform("BIKE", &[(period(1), Decimal::ZERO)], &bom)
            .unwrap();
        assert!(pegging.pegging("C", period(1)).is_empty());
    }

    #[test]
    fn test_overflow_rejected_without_partial_records() {
        let bom = BomGraph::from_edges(vec![
            BomEdge::new("BIKE", "A", Decimal::ONE).unwrap(),
            BomEdge::new("BIKE", "C", Decimal::from(2)).unwrap(),
        ])
        .unwrap();
        let mut pegging = PeggingCalculator::new();

        let err = pegging
            .perform("BIKE", &[(period(1), Decimal::MAX)], &bom)
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidParameter(_)));
        // A 的展開量本身沒有溢位，但整批都不寫入
        assert!(pegging.pegging("A", period(1)).is_empty());
        assert!(pegging.pegging("C", period(1)).is_empty());
    }

    #[test]
    fn test_merge_overflow_keeps_existing_record() {
        let bom = BomGraph::from_edges(vec![BomEdge::new("BIKE", "C", Decimal::ONE).unwrap()]).unwrap();
        let mut pegging = PeggingCalculator::new();
        pegging
            .perform("BIKE", &[(period(1), Decimal::MAX)], &bom)
            .unwrap();

        assert!(pegging
            .perform("BIKE", &[(period(1), Decimal::ONE)], &bom)
            .is_err());
        assert_eq!(
            pegging.pegging("C", period(1)),
            vec![PeggingRecord::new("BIKE", Decimal::MAX)]
        );
    }

    #[test]
    fn test_gross_overflow_across_parents() {
        let mut pegging = PeggingCalculator::new();
        pegging.record("C", period(1), "BIKE", Decimal::MAX).unwrap();
        pegging.record("C", period(1), "TRIKE", Decimal::MAX).unwrap();
        assert!(pegging.gross("C", &[period(1)]).is_err());
        assert_eq!(pegging.gross("C", &[period(2)]).unwrap(), vec![Decimal::ZERO]);
    }
}
