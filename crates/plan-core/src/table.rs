//! 表格資料列（匯入/匯出邊界）
//!
//! 資料列保持外部格式的欄位名稱；轉換成型別化記錄時進行驗證，
//! 格式錯誤的資料列在邊界就被拒絕。

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    BomEdge, CapacityRecord, EntityError, InventoryRecord, Period, PlanError, Result,
    SupplierRecord, TimeSeriesPoint,
};

/// 資料列的實體識別（用於錯誤報告）
pub trait RowIdentity {
    fn entity_id(&self) -> String;
}

/// 出貨資料列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRow {
    pub product_id: String,
    pub period: String,
    pub quantity: Decimal,
}

/// BOM 資料列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRow {
    pub parent_product_id: String,
    pub child_component_id: String,
    pub quantity_per_unit: Decimal,
}

/// 庫存資料列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub item_id: String,
    pub period: String,
    pub on_hand_qty: Decimal,
    #[serde(default)]
    pub incoming_qty: Decimal,
    #[serde(default)]
    pub safety_stock_qty: Decimal,
}

/// 供應商資料列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRow {
    pub component_id: String,
    pub supplier_id: String,
    pub lead_time_periods: u32,
    #[serde(default)]
    pub min_order_qty: Decimal,
    #[serde(default = "default_lot_size_multiple")]
    pub lot_size_multiple: Decimal,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

fn default_lot_size_multiple() -> Decimal {
    Decimal::ONE
}

/// 產能資料列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRow {
    pub resource_id: String,
    pub period: String,
    pub max_units: Decimal,
}

impl TryFrom<ShipmentRow> for TimeSeriesPoint {
    type Error = PlanError;

    fn try_from(row: ShipmentRow) -> Result<Self> {
        let period: Period = row.period.parse()?;
        TimeSeriesPoint::new(row.product_id, period, row.quantity)
    }
}

impl TryFrom<BomRow> for BomEdge {
    type Error = PlanError;

    fn try_from(row: BomRow) -> Result<Self> {
        BomEdge::new(row.parent_product_id, row.child_component_id, row.quantity_per_unit)
    }
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = PlanError;

    fn try_from(row: InventoryRow) -> Result<Self> {
        let period: Period = row.period.parse()?;
        InventoryRecord::new(
            row.item_id,
            period,
            row.on_hand_qty,
            row.incoming_qty,
            row.safety_stock_qty,
        )
    }
}

impl TryFrom<SupplierRow> for SupplierRecord {
    type Error = PlanError;

    fn try_from(row: SupplierRow) -> Result<Self> {
        let record = SupplierRecord::new(
            row.component_id,
            row.supplier_id,
            row.lead_time_periods,
            row.min_order_qty,
            row.lot_size_multiple,
        )?;
        match row.unit_price {
            Some(price) => record.with_unit_price(price),
            None => Ok(record),
        }
    }
}

impl TryFrom<CapacityRow> for CapacityRecord {
    type Error = PlanError;

    fn try_from(row: CapacityRow) -> Result<Self> {
        let period: Period = row.period.parse()?;
        CapacityRecord::new(row.resource_id, period, row.max_units)
    }
}

impl RowIdentity for ShipmentRow {
    fn entity_id(&self) -> String {
        self.product_id.clone()
    }
}

impl RowIdentity for BomRow {
    fn entity_id(&self) -> String {
        format!("{}->{}", self.parent_product_id, self.child_component_id)
    }
}

impl RowIdentity for InventoryRow {
    fn entity_id(&self) -> String {
        self.item_id.clone()
    }
}

impl RowIdentity for SupplierRow {
    fn entity_id(&self) -> String {
        self.component_id.clone()
    }
}

impl RowIdentity for CapacityRow {
    fn entity_id(&self) -> String {
        self.resource_id.clone()
    }
}

/// 從 JSON 陣列讀取資料列或輸出記錄
pub fn from_json_rows<T: DeserializeOwned>(json: &str) -> Result<Vec<T>> {
    Ok(serde_json::from_str(json)?)
}

/// 將資料列或輸出記錄寫成 JSON 陣列
pub fn to_json_rows<T: Serialize>(rows: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// 逐列轉換成型別化記錄
///
/// 無效的資料列不會中止轉換，而是以 [`EntityError`] 回報。
pub fn convert_rows<R, T>(rows: impl IntoIterator<Item = R>) -> (Vec<T>, Vec<EntityError>)
where
    R: RowIdentity,
    T: TryFrom<R, Error = PlanError>,
{
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for row in rows {
        let entity_id = row.entity_id();
        match T::try_from(row) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!("拒絕無效資料列 {}: {}", entity_id, err);
                errors.push(EntityError::new(entity_id, &err));
            }
        }
    }

    (records, errors)
}
