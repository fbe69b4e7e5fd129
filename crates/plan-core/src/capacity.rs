//! 產能模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::quantity::ensure_non_negative;
use crate::{Period, Result};

/// 產能記錄（某資源在某期間的最大產出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    /// 資源ID（產線/工作中心）
    pub resource_id: String,

    /// 期間
    pub period: Period,

    /// 最大產出單位
    pub max_units: Decimal,
}

impl CapacityRecord {
    pub fn new(resource_id: impl Into<String>, period: Period, max_units: Decimal) -> Result<Self> {
        let resource_id = resource_id.into();
        ensure_non_negative(&resource_id, "max_units", max_units)?;
        Ok(Self {
            resource_id,
            period,
            max_units,
        })
    }
}

/// 產能表：資源ID -> 期間 -> 最大產出
///
/// 同一資源同一期間有多筆記錄時產能累加（例如多個班次）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityTable {
    ceilings: BTreeMap<String, BTreeMap<Period, Decimal>>,
}

impl CapacityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = CapacityRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: CapacityRecord) {
        *self
            .ceilings
            .entry(record.resource_id)
            .or_default()
            .entry(record.period)
            .or_insert(Decimal::ZERO) += record.max_units;
    }

    pub fn has_resource(&self, resource_id: &str) -> bool {
        self.ceilings.contains_key(resource_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.ceilings.keys().map(String::as_str)
    }

    /// 資源在期間的產能上限；沒有記錄時為 None
    pub fn ceiling(&self, resource_id: &str, period: Period) -> Option<Decimal> {
        self.ceilings
            .get(resource_id)
            .and_then(|periods| periods.get(&period))
            .copied()
    }

    /// 解析產品使用的資源
    ///
    /// 順序：明確指派 -> 與產品同名的資源 -> 預設資源。
    pub fn resolve_resource(
        &self,
        product_id: &str,
        assignments: &BTreeMap<String, String>,
        default_resource: Option<&str>,
    ) -> Option<String> {
        if let Some(resource) = assignments.get(product_id) {
            return Some(resource.clone());
        }
        if self.has_resource(product_id) {
            return Some(product_id.to_string());
        }
        default_resource
            .filter(|r| self.has_resource(r))
            .map(str::to_string)
    }

    pub fn is_empty(&self) -> bool {
        self.ceilings.is_empty()
    }
}
