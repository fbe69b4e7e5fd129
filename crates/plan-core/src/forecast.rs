//! 需求預測模型

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::quantity::ensure_non_negative;
use crate::{Period, PlanError, Result};

/// 人工調整預測的演算法ID
pub const MANUAL_ALGORITHM_ID: &str = "manual";

/// 季節模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeasonalModel {
    /// 加法：值 = 趨勢 + 季節
    Additive,
    /// 乘法：值 = 趨勢 × 季節
    Multiplicative,
}

/// 演算法族群（排序即複雜度，平手時偏好較簡單者）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MethodFamily {
    MovingAverage,
    ExponentialSmoothing,
    Seasonal,
    Regression,
}

/// 預測方法與參數
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum ForecastMethod {
    /// 移動平均（weighted 為線性加權，最近一期權重最高）
    MovingAverage { window: usize, weighted: bool },

    /// 指數平滑
    /// - 只有 alpha：單一指數平滑
    /// - alpha + beta：Holt 趨勢法
    /// - alpha + beta + gamma：Holt-Winters 加法季節
    ExponentialSmoothing {
        alpha: f64,
        beta: Option<f64>,
        gamma: Option<f64>,
        season_length: usize,
    },

    /// 古典季節分解
    SeasonalDecomposition {
        season_length: usize,
        model: SeasonalModel,
    },

    /// 時間索引多項式迴歸（最小平方法）
    Regression { degree: usize },
}

impl ForecastMethod {
    /// 簡單移動平均
    pub fn moving_average(window: usize) -> Self {
        ForecastMethod::MovingAverage {
            window,
            weighted: false,
        }
    }

    /// 線性加權移動平均
    pub fn weighted_moving_average(window: usize) -> Self {
        ForecastMethod::MovingAverage {
            window,
            weighted: true,
        }
    }

    /// 單一指數平滑
    pub fn simple_exponential(alpha: f64) -> Self {
        ForecastMethod::ExponentialSmoothing {
            alpha,
            beta: None,
            gamma: None,
            season_length: 12,
        }
    }

    /// Holt 趨勢指數平滑
    pub fn holt(alpha: f64, beta: f64) -> Self {
        ForecastMethod::ExponentialSmoothing {
            alpha,
            beta: Some(beta),
            gamma: None,
            season_length: 12,
        }
    }

    /// Holt-Winters 加法季節指數平滑
    pub fn holt_winters(alpha: f64, beta: f64, gamma: f64, season_length: usize) -> Self {
        ForecastMethod::ExponentialSmoothing {
            alpha,
            beta: Some(beta),
            gamma: Some(gamma),
            season_length,
        }
    }

    /// 季節分解
    pub fn seasonal(season_length: usize, model: SeasonalModel) -> Self {
        ForecastMethod::SeasonalDecomposition {
            season_length,
            model,
        }
    }

    /// 多項式迴歸
    pub fn regression(degree: usize) -> Self {
        ForecastMethod::Regression { degree }
    }

    /// 自動選擇的預設候選清單
    pub fn default_candidates() -> Vec<ForecastMethod> {
        vec![
            Self::moving_average(3),
            Self::weighted_moving_average(3),
            Self::simple_exponential(0.3),
            Self::holt(0.3, 0.1),
            Self::holt_winters(0.3, 0.1, 0.1, 12),
            Self::seasonal(12, SeasonalModel::Additive),
            Self::seasonal(12, SeasonalModel::Multiplicative),
            Self::regression(1),
            Self::regression(2),
        ]
    }

    /// 演算法ID（寫入 Forecast::algorithm_id）
    pub fn id(&self) -> &'static str {
        match self {
            ForecastMethod::MovingAverage { .. } => "moving-average",
            ForecastMethod::ExponentialSmoothing { .. } => "exponential-smoothing",
            ForecastMethod::SeasonalDecomposition { .. } => "seasonal-decomposition",
            ForecastMethod::Regression { .. } => "regression",
        }
    }

    pub fn family(&self) -> MethodFamily {
        match self {
            ForecastMethod::MovingAverage { .. } => MethodFamily::MovingAverage,
            ForecastMethod::ExponentialSmoothing { .. } => MethodFamily::ExponentialSmoothing,
            ForecastMethod::SeasonalDecomposition { .. } => MethodFamily::Seasonal,
            ForecastMethod::Regression { .. } => MethodFamily::Regression,
        }
    }

    /// 最少需要的歷史期數
    pub fn min_history(&self) -> usize {
        match *self {
            ForecastMethod::MovingAverage { window, .. } => window.max(1),
            ForecastMethod::ExponentialSmoothing {
                beta,
                gamma,
                season_length,
                ..
            } => match (beta, gamma) {
                (_, Some(_)) => 2 * season_length,
                (Some(_), None) => 4,
                (None, None) => 2,
            },
            ForecastMethod::SeasonalDecomposition { season_length, .. } => 2 * season_length,
            ForecastMethod::Regression { degree } => degree + 2,
        }
    }

    /// 檢查參數
    pub fn validate(&self) -> Result<()> {
        let in_unit = |name: &str, value: f64| {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(PlanError::InvalidParameter(format!(
                    "{name} 必須介於 (0, 1]，實際為 {value}"
                )))
            }
        };

        match *self {
            ForecastMethod::MovingAverage { window, .. } => {
                if window == 0 {
                    return Err(PlanError::InvalidParameter(
                        "移動平均視窗必須大於 0".to_string(),
                    ));
                }
            }
            ForecastMethod::ExponentialSmoothing {
                alpha,
                beta,
                gamma,
                season_length,
            } => {
                in_unit("alpha", alpha)?;
                if let Some(beta) = beta {
                    in_unit("beta", beta)?;
                }
                if let Some(gamma) = gamma {
                    if beta.is_none() {
                        return Err(PlanError::InvalidParameter(
                            "季節平滑 (gamma) 需要同時設定趨勢平滑 (beta)".to_string(),
                        ));
                    }
                    in_unit("gamma", gamma)?;
                    if season_length < 2 {
                        return Err(PlanError::InvalidParameter(format!(
                            "季節長度必須至少為 2，實際為 {season_length}"
                        )));
                    }
                }
            }
            ForecastMethod::SeasonalDecomposition { season_length, .. } => {
                if season_length < 2 {
                    return Err(PlanError::InvalidParameter(format!(
                        "季節長度必須至少為 2，實際為 {season_length}"
                    )));
                }
            }
            ForecastMethod::Regression { degree } => {
                if !(1..=3).contains(&degree) {
                    return Err(PlanError::InvalidParameter(format!(
                        "迴歸次數必須介於 1..=3，實際為 {degree}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::MovingAverage { window, weighted } => {
                let kind = if *weighted { "weighted" } else { "simple" };
                write!(f, "moving-average({kind}, window={window})")
            }
            ForecastMethod::ExponentialSmoothing {
                alpha,
                beta,
                gamma,
                season_length,
            } => match (beta, gamma) {
                (Some(b), Some(g)) => write!(
                    f,
                    "exponential-smoothing(alpha={alpha}, beta={b}, gamma={g}, season={season_length})"
                ),
                (Some(b), None) => write!(f, "exponential-smoothing(alpha={alpha}, beta={b})"),
                _ => write!(f, "exponential-smoothing(alpha={alpha})"),
            },
            ForecastMethod::SeasonalDecomposition {
                season_length,
                model,
            } => write!(
                f,
                "seasonal-decomposition({model:?}, season={season_length})"
            ),
            ForecastMethod::Regression { degree } => write!(f, "regression(degree={degree})"),
        }
    }
}

/// 預測來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastSource {
    /// 演算法產生
    Algorithm,
    /// 人工調整
    ManualAdjustment,
}

/// 單一產品單一期間的預測（產生後不可修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// 產品ID
    pub product_id: String,

    /// 預測期間
    pub period: Period,

    /// 預測數量（非負）
    pub predicted_quantity: Decimal,

    /// 95% 信賴區間下界（非負）
    pub lower_bound: Decimal,

    /// 95% 信賴區間上界
    pub upper_bound: Decimal,

    /// 演算法ID
    pub algorithm_id: String,

    /// 演算法參數
    pub method: ForecastMethod,

    /// 產生時間
    pub generated_at: NaiveDateTime,

    /// 原始估計為負，已截為 0
    pub clamped: bool,

    /// 來源
    pub source: ForecastSource,
}

impl Forecast {
    /// 創建演算法預測（區間預設為點估計）
    pub fn new(
        product_id: impl Into<String>,
        period: Period,
        predicted_quantity: Decimal,
        method: ForecastMethod,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            period,
            predicted_quantity,
            lower_bound: predicted_quantity,
            upper_bound: predicted_quantity,
            algorithm_id: method.id().to_string(),
            method,
            generated_at,
            clamped: false,
            source: ForecastSource::Algorithm,
        }
    }

    /// 建構器模式：設置信賴區間
    pub fn with_bounds(mut self, lower: Decimal, upper: Decimal) -> Self {
        self.lower_bound = lower.max(Decimal::ZERO);
        self.upper_bound = upper.max(self.lower_bound);
        self
    }

    /// 建構器模式：標記為已截斷
    pub fn with_clamped(mut self, clamped: bool) -> Self {
        self.clamped = clamped;
        self
    }

    pub fn is_manual(&self) -> bool {
        self.source == ForecastSource::ManualAdjustment
    }
}

/// 預測帳本（僅追加）
///
/// 同一 (產品, 期間) 的新預測會取代舊預測成為最新版本，但舊版本保留。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastLedger {
    entries: Vec<Forecast>,
}

impl ForecastLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄一筆預測
    pub fn record(&mut self, forecast: Forecast) {
        self.entries.push(forecast);
    }

    /// 記錄多筆預測
    pub fn record_all(&mut self, forecasts: impl IntoIterator<Item = Forecast>) {
        self.entries.extend(forecasts);
    }

    /// 最新版本
    pub fn latest(&self, product_id: &str, period: Period) -> Option<&Forecast> {
        self.entries
            .iter()
            .rev()
            .find(|f| f.product_id == product_id && f.period == period)
    }

    /// 所有版本（依記錄順序）
    pub fn versions(&self, product_id: &str, period: Period) -> Vec<&Forecast> {
        self.entries
            .iter()
            .filter(|f| f.product_id == product_id && f.period == period)
            .collect()
    }

    /// 人工調整預測
    ///
    /// 以最新版本為基礎追加一個人工版本，原版本保留。
    pub fn adjust(
        &mut self,
        product_id: &str,
        period: Period,
        quantity: Decimal,
        adjusted_at: NaiveDateTime,
    ) -> Result<&Forecast> {
        ensure_non_negative(product_id, "predicted_quantity", quantity)?;

        let base = self.latest(product_id, period).cloned().ok_or_else(|| {
            PlanError::InvalidParameter(format!("{product_id} 在 {period} 沒有可調整的預測"))
        })?;

        tracing::info!(
            "人工調整預測 {} {}: {} -> {}",
            product_id,
            period,
            base.predicted_quantity,
            quantity
        );

        self.entries.push(Forecast {
            predicted_quantity: quantity,
            lower_bound: quantity,
            upper_bound: quantity,
            algorithm_id: MANUAL_ALGORITHM_ID.to_string(),
            generated_at: adjusted_at,
            clamped: false,
            source: ForecastSource::ManualAdjustment,
            ..base
        });

        let last = self.entries.len() - 1;
        Ok(&self.entries[last])
    }

    /// 每個 (產品, 期間) 的最新版本，依產品、期間排序
    pub fn latest_forecasts(&self) -> Vec<Forecast> {
        let mut latest: BTreeMap<(&str, Period), &Forecast> = BTreeMap::new();
        for forecast in &self.entries {
            latest.insert((forecast.product_id.as_str(), forecast.period), forecast);
        }
        latest.into_values().cloned().collect()
    }

    /// 產品的最新預測，依期間排序
    pub fn product_forecasts(&self, product_id: &str) -> Vec<Forecast> {
        self.latest_forecasts()
            .into_iter()
            .filter(|f| f.product_id == product_id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Forecast> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
