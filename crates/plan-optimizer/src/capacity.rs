//! 產能帳本
//!
//! 記錄每個資源在每個期間已使用的正常產能與加班量。共用資源的產品
//! 依處理順序依次佔用剩餘產能。

use plan_core::{
    CapacityTable, MasterDataKind, MissingDataPolicy, OvertimePolicy, Period, PlanError,
    PlannerPolicy, Result, Warning,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 產品與產能資源的綁定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBinding {
    /// 受資源產能限制
    Constrained(String),
    /// 沒有產能資料，不受限制
    Unconstrained,
}

impl ResourceBinding {
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            ResourceBinding::Constrained(resource) => Some(resource),
            ResourceBinding::Unconstrained => None,
        }
    }

    /// 解析產品使用的資源並檢查計劃期間的產能資料是否齊全
    ///
    /// 資料不全時依 `missing_capacity` 策略：失敗，或不受限制並產生警告。
    pub fn resolve(
        product_id: &str,
        horizon: &[Period],
        table: &CapacityTable,
        policy: &PlannerPolicy,
    ) -> Result<(Self, Option<Warning>)> {
        let resource = table.resolve_resource(
            product_id,
            &policy.resource_assignments,
            policy.default_resource.as_deref(),
        );

        let missing: Vec<Period> = match &resource {
            Some(resource) => horizon
                .iter()
                .copied()
                .filter(|p| table.ceiling(resource, *p).is_none())
                .collect(),
            None => horizon.to_vec(),
        };

        if missing.is_empty() {
            if let Some(resource) = resource {
                return Ok((ResourceBinding::Constrained(resource), None));
            }
        }

        match policy.missing_capacity {
            MissingDataPolicy::Fail => Err(PlanError::MissingMasterData {
                item_id: product_id.to_string(),
                kind: MasterDataKind::Capacity,
            }),
            MissingDataPolicy::DefaultWithWarning => {
                let periods: Vec<String> = missing.iter().map(Period::to_string).collect();
                let message = format!("缺少產能資料（{}），不限制產能", periods.join(", "));
                tracing::warn!("{}: {}", product_id, message);

                let binding = match resource {
                    Some(resource) if missing.len() < horizon.len() => {
                        ResourceBinding::Constrained(resource)
                    }
                    _ => ResourceBinding::Unconstrained,
                };
                Ok((binding, Some(Warning::warning(product_id, message))))
            }
        }
    }
}

/// 單次產能分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Allocation {
    /// 正常產能內的數量
    pub regular: Decimal,
    /// 加班數量
    pub overtime: Decimal,
}

impl Allocation {
    pub fn total(&self) -> Decimal {
        self.regular + self.overtime
    }
}

/// 產能帳本
#[derive(Debug, Clone)]
pub struct CapacityLedger<'a> {
    table: &'a CapacityTable,
    consumed: BTreeMap<(String, Period), Decimal>,
    overtime: BTreeMap<(String, Period), Decimal>,
}

impl<'a> CapacityLedger<'a> {
    pub fn new(table: &'a CapacityTable) -> Self {
        Self {
            table,
            consumed: BTreeMap::new(),
            overtime: BTreeMap::new(),
        }
    }

    pub fn ceiling(&self, resource_id: &str, period: Period) -> Option<Decimal> {
        self.table.ceiling(resource_id, period)
    }

    fn used(map: &BTreeMap<(String, Period), Decimal>, resource_id: &str, period: Period) -> Decimal {
        map.get(&(resource_id.to_string(), period))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// 剩餘正常產能；沒有產能資料時為 None
    pub fn remaining(&self, resource_id: &str, period: Period) -> Option<Decimal> {
        self.ceiling(resource_id, period).map(|ceiling| {
            (ceiling - Self::used(&self.consumed, resource_id, period)).max(Decimal::ZERO)
        })
    }

    /// 已使用的加班量
    pub fn overtime_used(&self, resource_id: &str, period: Period) -> Decimal {
        Self::used(&self.overtime, resource_id, period)
    }

    /// 產能使用率（正常產能）
    pub fn utilization(&self, resource_id: &str, period: Period) -> Option<Decimal> {
        let ceiling = self.ceiling(resource_id, period)?;
        if ceiling <= Decimal::ZERO {
            return None;
        }
        Some(Self::used(&self.consumed, resource_id, period) / ceiling)
    }

    /// 分配產能
    ///
    /// 先用正常產能，超出部分在加班策略允許的範圍內以加班補足。
    /// 該期間沒有產能資料時全數視為正常產能。
    pub fn allocate(
        &mut self,
        resource_id: &str,
        period: Period,
        desired: Decimal,
        overtime: &OvertimePolicy,
    ) -> Allocation {
        let desired = desired.max(Decimal::ZERO);
        let Some(ceiling) = self.ceiling(resource_id, period) else {
            return Allocation {
                regular: desired,
                overtime: Decimal::ZERO,
            };
        };

        let remaining = self.remaining(resource_id, period).unwrap_or(Decimal::ZERO);
        let regular = desired.min(remaining);
        let extra = desired - regular;

        let extra_allowed = match overtime.allowance(ceiling) {
            None => extra,
            Some(limit) => {
                let left = (limit - self.overtime_used(resource_id, period)).max(Decimal::ZERO);
                extra.min(left)
            }
        };

        let key = (resource_id.to_string(), period);
        *self.consumed.entry(key.clone()).or_insert(Decimal::ZERO) += regular;
        if extra_allowed > Decimal::ZERO {
            *self.overtime.entry(key).or_insert(Decimal::ZERO) += extra_allowed;
        }

        Allocation {
            regular,
            overtime: extra_allowed,
        }
    }

    /// 強制佔用產能（人工指定量），回傳佔用前的剩餘產能
    pub fn force(&mut self, resource_id: &str, period: Period, quantity: Decimal) -> Option<Decimal> {
        let remaining = self.remaining(resource_id, period)?;
        *self
            .consumed
            .entry((resource_id.to_string(), period))
            .or_insert(Decimal::ZERO) += quantity;
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::CapacityRecord;

    fn period(month: u32) -> Period {
        Period::new(2025, month).unwrap()
    }

    fn table() -> CapacityTable {
        CapacityTable::from_records(vec![
            CapacityRecord::new("LINE-1", period(1), Decimal::from(100)).unwrap(),
            CapacityRecord::new("LINE-1", period(2), Decimal::from(100)).unwrap(),
        ])
    }

    #[test]
    fn test_allocate_consumes_remaining() {
        let table = table();
        let mut ledger = CapacityLedger::new(&table);
        let none = OvertimePolicy::default();

        let first = ledger.allocate("LINE-1", period(1), Decimal::from(70), &none);
        assert_eq!(first.regular, Decimal::from(70));

        let second = ledger.allocate("LINE-1", period(1), Decimal::from(70), &none);
        assert_eq!(second.regular, Decimal::from(30));
        assert_eq!(second.overtime, Decimal::ZERO);
        assert_eq!(ledger.remaining("LINE-1", period(1)), Some(Decimal::ZERO));
        assert_eq!(ledger.utilization("LINE-1", period(1)), Some(Decimal::ONE));

        // 其他期間不受影響
        assert_eq!(ledger.remaining("LINE-1", period(2)), Some(Decimal::from(100)));
    }

    #[test]
    fn test_overtime_limited_by_ratio() {
        let table = table();
        let mut ledger = CapacityLedger::new(&table);
        let overtime = OvertimePolicy::allowed(Decimal::from(5)).with_max_ratio(Decimal::new(2, 1));

        let allocation = ledger.allocate("LINE-1", period(1), Decimal::from(150), &overtime);
        assert_eq!(allocation.regular, Decimal::from(100));
        assert_eq!(allocation.overtime, Decimal::from(20));
        assert_eq!(allocation.total(), Decimal::from(120));

        // 加班額度已用完
        let again = ledger.allocate("LINE-1", period(1), Decimal::from(10), &overtime);
        assert_eq!(again.total(), Decimal::ZERO);
    }

    #[test]
    fn test_unbounded_overtime() {
        let table = table();
        let mut ledger = CapacityLedger::new(&table);
        let allocation = ledger.allocate(
            "LINE-1",
            period(1),
            Decimal::from(250),
            &OvertimePolicy::allowed(Decimal::ONE),
        );
        assert_eq!(allocation.overtime, Decimal::from(150));
    }

    #[test]
    fn test_force_reports_prior_remaining() {
        let table = table();
        let mut ledger = CapacityLedger::new(&table);
        assert_eq!(ledger.force("LINE-1", period(1), Decimal::from(130)), Some(Decimal::from(100)));
        assert_eq!(ledger.remaining("LINE-1", period(1)), Some(Decimal::ZERO));
        assert_eq!(ledger.force("LINE-9", period(1), Decimal::ONE), None);
    }

    #[test]
    fn test_resolve_binding() {
        let table = table();
        let horizon = vec![period(1), period(2)];

        let policy = PlannerPolicy::default().with_resource("BIKE", "LINE-1");
        let (binding, warning) = ResourceBinding::resolve("BIKE", &horizon, &table, &policy).unwrap();
        assert_eq!(binding, ResourceBinding::Constrained("LINE-1".to_string()));
        assert!(warning.is_none());

        let (binding, warning) =
            ResourceBinding::resolve("BIKE", &horizon, &table, &PlannerPolicy::default()).unwrap();
        assert_eq!(binding, ResourceBinding::Unconstrained);
        assert!(warning.is_some());

        let strict = PlannerPolicy::default().with_missing_capacity(MissingDataPolicy::Fail);
        let err = ResourceBinding::resolve("BIKE", &horizon, &table, &strict).unwrap_err();
        assert!(matches!(
            err,
            PlanError::MissingMasterData {
                kind: MasterDataKind::Capacity,
                ..
            }
        ));
    }

    #[test]
    fn test_partial_capacity_stays_constrained() {
        let table = table();
        let horizon = vec![period(1), period(2), period(3)];
        let policy = PlannerPolicy::default().with_default_resource("LINE-1");
        let (binding, warning) = ResourceBinding::resolve("BIKE", &horizon, &table, &policy).unwrap();
        assert_eq!(binding.resource_id(), Some("LINE-1"));
        assert!(warning.unwrap().message.contains("2025-03"));
    }
}
