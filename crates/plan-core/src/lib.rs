//! # Plan Core
//!
//! 核心資料模型與類型定義：期間、時間序列、預測、BOM 邊、庫存、產能、
//! 供應商、計劃結果、計劃例外與錯誤分類。

pub mod accuracy;
pub mod bom;
pub mod capacity;
pub mod config;
pub mod exception;
pub mod forecast;
pub mod inventory;
pub mod period;
pub mod plan;
pub mod quantity;
pub mod series;
pub mod supplier;
pub mod table;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export 主要類型
pub use accuracy::{AccuracyRecord, ScoreStatus};
pub use bom::BomEdge;
pub use capacity::{CapacityRecord, CapacityTable};
pub use config::{
    ForecastConfig, MethodSelection, MissingDataPolicy, MrpPolicy, OvertimePolicy, PlannerPolicy,
    PlanningConfig, PlanningMode, TargetInventory,
};
pub use exception::{PlanningException, Severity, Warning};
pub use forecast::{
    Forecast, ForecastLedger, ForecastMethod, ForecastSource, MethodFamily, SeasonalModel,
};
pub use inventory::{InventoryRecord, InventoryTable};
pub use period::Period;
pub use plan::{
    ManualOverride, MrpRequirement, PeggingRecord, PlanSource, PlannedOrderType,
    ProductionPlanEntry,
};
pub use series::{GapPolicy, ResolvedSeries, TimeSeries, TimeSeriesPoint, TimeSeriesStore};
pub use supplier::{SupplierRecord, SupplierTable};

/// 主資料類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MasterDataKind {
    Bom,
    Capacity,
    Supplier,
    Inventory,
}

impl fmt::Display for MasterDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MasterDataKind::Bom => "BOM",
            MasterDataKind::Capacity => "產能",
            MasterDataKind::Supplier => "供應商",
            MasterDataKind::Inventory => "庫存",
        };
        f.write_str(name)
    }
}

/// 計劃錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("歷史資料不足: {algorithm} 至少需要 {required} 期，實際只有 {actual} 期")]
    InsufficientHistory {
        algorithm: String,
        required: usize,
        actual: usize,
    },

    #[error("BOM 存在循環引用: {}", path.join(" -> "))]
    CyclicBom { path: Vec<String> },

    #[error("負數量: {entity} 的 {field} 為 {value}")]
    NegativeQuantity {
        entity: String,
        field: &'static str,
        value: Decimal,
    },

    #[error("缺少主資料: {item_id} 沒有{kind}記錄")]
    MissingMasterData {
        item_id: String,
        kind: MasterDataKind,
    },

    #[error("無效的期間: {0}")]
    InvalidPeriod(String),

    #[error("無效的參數: {0}")]
    InvalidParameter(String),

    #[error("找不到物料: {0}")]
    UnknownItem(String),

    #[error("序列化錯誤: {0}")]
    Serialization(String),
}

impl PlanError {
    /// 錯誤分類
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            PlanError::CyclicBom { .. } => ErrorKind::CyclicBom,
            PlanError::NegativeQuantity { .. } => ErrorKind::NegativeQuantity,
            PlanError::MissingMasterData { .. } => ErrorKind::MissingMasterData,
            PlanError::InvalidPeriod(_) => ErrorKind::InvalidPeriod,
            PlanError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            PlanError::UnknownItem(_) => ErrorKind::UnknownItem,
            PlanError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// 錯誤分類（用於部分結果報告）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InsufficientHistory,
    CyclicBom,
    NegativeQuantity,
    MissingMasterData,
    InvalidPeriod,
    InvalidParameter,
    UnknownItem,
    Serialization,
}

/// 單一實體（產品、物料、資料列）的失敗記錄
///
/// 批次計算不會因單一實體失敗而中止，失敗會以此形式隨結果一併回傳。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityError {
    pub entity_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl EntityError {
    pub fn new(entity_id: impl Into<String>, error: &PlanError) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
