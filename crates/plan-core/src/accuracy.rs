//! 預測準確度記錄

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ForecastMethod, Period};

/// 評分狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStatus {
    /// 已評分
    Scored,
    /// 實際值為 0，百分比誤差無定義
    UndefinedZeroActual,
}

/// 預測與實際值的比對結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub product_id: String,
    pub period: Period,
    pub forecast_qty: Decimal,
    pub actual_qty: Decimal,

    /// |預測 - 實際| / 實際
    pub absolute_pct_error: Option<Decimal>,

    /// (預測 - 實際) / 實際，正值為高估
    pub bias: Option<Decimal>,

    /// 被評分預測的演算法
    pub algorithm_id: String,
    pub method: ForecastMethod,
    pub generated_at: NaiveDateTime,

    pub status: ScoreStatus,
}

impl AccuracyRecord {
    pub fn is_scored(&self) -> bool {
        self.status == ScoreStatus::Scored
    }
}
