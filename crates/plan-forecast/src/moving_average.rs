//! 移動平均

use crate::{mean, Estimate, Estimator};

/// 移動平均（簡單或線性加權）
///
/// 預測值為最近 window 期的平均，所有預測期相同。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverage {
    pub window: usize,
    pub weighted: bool,
}

impl MovingAverage {
    fn average(&self, values: &[f64]) -> f64 {
        if !self.weighted {
            return mean(values);
        }
        // 權重 1..=n，最近一期最大
        let total_weight = (values.len() * (values.len() + 1) / 2) as f64;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| v * (i + 1) as f64)
            .sum::<f64>()
            / total_weight
    }
}

impl Estimator for MovingAverage {
    fn fit_predict(&self, history: &[f64], horizon: usize) -> Estimate {
        let window = self.window.clamp(1, history.len().max(1));
        let tail = &history[history.len().saturating_sub(window)..];
        let level = self.average(tail);

        // 視窗內的離散程度作為不確定性
        let spread = tail.iter().map(|v| (v - level).powi(2)).sum::<f64>();
        let residual_std = if tail.is_empty() {
            0.0
        } else {
            (spread / tail.len() as f64).sqrt()
        };

        Estimate {
            points: vec![level; horizon],
            residual_std,
        }
    }
}
