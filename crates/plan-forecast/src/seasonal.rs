//! 古典季節分解
//!
//! 中心化移動平均取趨勢，去趨勢後按季節位置平均得到季節指數，
//! 去季節後的序列以直線外推趨勢，再套回季節指數。

use plan_core::SeasonalModel;

use crate::regression::fit_polynomial;
use crate::{mean, residual_std, Estimate, Estimator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalDecomposition {
    pub season_length: usize,
    pub model: SeasonalModel,
}

impl SeasonalDecomposition {
    /// 中心化移動平均；頭尾不足半個季節的位置為 None
    fn centered_trend(&self, history: &[f64]) -> Vec<Option<f64>> {
        let m = self.season_length;
        let n = history.len();
        let half = m / 2;
        let mut trend = vec![None; n];

        if n < m + 1 {
            return trend;
        }

        for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
            let value = if m % 2 == 0 {
                // 2×m 移動平均：兩端各取一半權重
                let inner: f64 = history[t + 1 - half..t + half].iter().sum();
                (0.5 * history[t - half] + inner + 0.5 * history[t + half]) / m as f64
            } else {
                mean(&history[t - half..=t + half])
            };
            *slot = Some(value);
        }
        trend
    }

    /// 各季節位置的指數（加法總和為 0，乘法平均為 1）
    fn seasonal_indices(&self, history: &[f64], trend: &[Option<f64>]) -> Vec<f64> {
        let m = self.season_length;
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); m];

        for (t, (value, trend)) in history.iter().zip(trend).enumerate() {
            let Some(trend) = trend else { continue };
            match self.model {
                SeasonalModel::Additive => buckets[t % m].push(value - trend),
                SeasonalModel::Multiplicative if *trend > 0.0 => {
                    buckets[t % m].push(value / trend)
                }
                SeasonalModel::Multiplicative => {}
            }
        }

        let neutral = match self.model {
            SeasonalModel::Additive => 0.0,
            SeasonalModel::Multiplicative => 1.0,
        };
        let raw: Vec<f64> = buckets
            .iter()
            .map(|b| if b.is_empty() { neutral } else { mean(b) })
            .collect();

        let center = mean(&raw);
        match self.model {
            SeasonalModel::Additive => raw.iter().map(|s| s - center).collect(),
            SeasonalModel::Multiplicative if center > 0.0 => {
                raw.iter().map(|s| s / center).collect()
            }
            SeasonalModel::Multiplicative => vec![1.0; m],
        }
    }

    fn deseasonalize(&self, value: f64, index: f64) -> f64 {
        match self.model {
            SeasonalModel::Additive => value - index,
            SeasonalModel::Multiplicative if index > 0.0 => value / index,
            SeasonalModel::Multiplicative => value,
        }
    }

    fn reseasonalize(&self, trend: f64, index: f64) -> f64 {
        match self.model {
            SeasonalModel::Additive => trend + index,
            SeasonalModel::Multiplicative => trend * index,
        }
    }
}

impl Estimator for SeasonalDecomposition {
    fn fit_predict(&self, history: &[f64], horizon: usize) -> Estimate {
        let m = self.season_length.max(1);
        let n = history.len();

        let trend = self.centered_trend(history);
        let indices = self.seasonal_indices(history, &trend);

        let adjusted: Vec<f64> = history
            .iter()
            .enumerate()
            .map(|(t, v)| self.deseasonalize(*v, indices[t % m]))
            .collect();
        let line = fit_polynomial(&adjusted, 1);

        let residuals: Vec<f64> = history
            .iter()
            .enumerate()
            .map(|(t, v)| v - self.reseasonalize(line.value_at(t), indices[t % m]))
            .collect();

        let points = (n..n + horizon)
            .map(|t| self.reseasonalize(line.value_at(t), indices[t % m]))
            .collect();

        Estimate {
            points,
            residual_std: residual_std(&residuals, m + 1),
        }
    }
}
