//! 庫存模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::quantity::ensure_non_negative;
use crate::{Period, Result};

/// 庫存記錄（某物料在某期間的庫存快照）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 物料ID（產品或零件）
    pub item_id: String,

    /// 期間
    pub period: Period,

    /// 現有庫存
    pub on_hand_qty: Decimal,

    /// 本期預計到貨
    pub incoming_qty: Decimal,

    /// 安全庫存
    pub safety_stock_qty: Decimal,
}

impl InventoryRecord {
    /// 創建新的庫存記錄（數量必須非負）
    pub fn new(
        item_id: impl Into<String>,
        period: Period,
        on_hand_qty: Decimal,
        incoming_qty: Decimal,
        safety_stock_qty: Decimal,
    ) -> Result<Self> {
        let item_id = item_id.into();
        ensure_non_negative(&item_id, "on_hand_qty", on_hand_qty)?;
        ensure_non_negative(&item_id, "incoming_qty", incoming_qty)?;
        ensure_non_negative(&item_id, "safety_stock_qty", safety_stock_qty)?;
        Ok(Self {
            item_id,
            period,
            on_hand_qty,
            incoming_qty,
            safety_stock_qty,
        })
    }
}

/// 庫存表：物料ID -> 依期間排序的庫存記錄
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryTable {
    records: BTreeMap<String, Vec<InventoryRecord>>,
}

impl InventoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = InventoryRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    /// 加入記錄，保持期間排序
    pub fn insert(&mut self, record: InventoryRecord) {
        let records = self.records.entry(record.item_id.clone()).or_default();
        let index = records.partition_point(|r| r.period <= record.period);
        records.insert(index, record);
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.records.contains_key(item_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self, item_id: &str) -> &[InventoryRecord] {
        self.records.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// period 當期或之前最近的記錄；都沒有時取最早的記錄
    fn snapshot(&self, item_id: &str, period: Period) -> Option<&InventoryRecord> {
        let records = self.records.get(item_id)?;
        records
            .iter()
            .rev()
            .find(|r| r.period <= period)
            .or_else(|| records.first())
    }

    /// 計劃起點的期初庫存
    pub fn opening_on_hand(&self, item_id: &str, start: Period) -> Decimal {
        self.snapshot(item_id, start)
            .map(|r| r.on_hand_qty)
            .unwrap_or(Decimal::ZERO)
    }

    /// 該期間的預計到貨總量
    pub fn incoming(&self, item_id: &str, period: Period) -> Decimal {
        self.records(item_id)
            .iter()
            .filter(|r| r.period == period)
            .map(|r| r.incoming_qty)
            .sum()
    }

    /// 該期間適用的安全庫存
    pub fn safety_stock(&self, item_id: &str, period: Period) -> Decimal {
        self.snapshot(item_id, period)
            .map(|r| r.safety_stock_qty)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
