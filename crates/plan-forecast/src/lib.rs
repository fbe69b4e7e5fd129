//! # Plan Forecast
//!
//! 需求預測引擎：移動平均、指數平滑、季節分解、多項式迴歸，以及回測自動選擇

pub mod engine;
pub mod exponential;
pub mod moving_average;
pub mod regression;
pub mod seasonal;
pub mod selection;

use plan_core::ForecastMethod;

// Re-export 主要類型
pub use engine::{ForecastBatch, ForecastEngine, ForecastOutput};
pub use selection::{CandidateScore, SelectionReason, SelectionReport};

/// 95% 信賴區間的 z 值
pub const Z_95: f64 = 1.96;

/// 演算法估計結果（尚未截斷負值）
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// 各期點估計
    pub points: Vec<f64>,

    /// 樣本內殘差標準差
    pub residual_std: f64,
}

/// 預測演算法：給定歷史與期數，產生 N 期估計
///
/// 呼叫端負責確認歷史長度已達 [`ForecastMethod::min_history`]。
pub trait Estimator {
    fn fit_predict(&self, history: &[f64], horizon: usize) -> Estimate;
}

/// 依方法參數執行對應的演算法
pub fn estimate(method: &ForecastMethod, history: &[f64], horizon: usize) -> Estimate {
    match *method {
        ForecastMethod::MovingAverage { window, weighted } => {
            moving_average::MovingAverage { window, weighted }.fit_predict(history, horizon)
        }
        ForecastMethod::ExponentialSmoothing {
            alpha,
            beta,
            gamma,
            season_length,
        } => exponential::ExponentialSmoothing {
            alpha,
            beta,
            gamma,
            season_length,
        }
        .fit_predict(history, horizon),
        ForecastMethod::SeasonalDecomposition {
            season_length,
            model,
        } => seasonal::SeasonalDecomposition {
            season_length,
            model,
        }
        .fit_predict(history, horizon),
        ForecastMethod::Regression { degree } => {
            regression::PolynomialRegression { degree }.fit_predict(history, horizon)
        }
    }
}

/// 殘差標準差（樣本數不足時為 0）
pub(crate) fn residual_std(residuals: &[f64], dof_loss: usize) -> f64 {
    let n = residuals.len();
    if n == 0 {
        return 0.0;
    }
    let denominator = if n > dof_loss { n - dof_loss } else { n };
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    (sse / denominator as f64).sqrt()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
