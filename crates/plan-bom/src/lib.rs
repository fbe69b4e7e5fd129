//! # Plan BOM
//!
//! BOM 圖：循環檢查、拓撲排序、低階碼、多層展開

pub mod explosion;
pub mod graph;

use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use graph::BomGraph;

/// 物料類別（由 BOM 中的上下階關係推斷）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemClass {
    /// 成品：沒有上階，有子件
    FinishedGood,
    /// 半成品：有上階也有子件
    SemiFinished,
    /// 原料：有上階，沒有子件
    RawMaterial,
    /// 不在 BOM 中
    Standalone,
}
