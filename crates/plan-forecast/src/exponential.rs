//! 指數平滑（單一、Holt 趨勢、Holt-Winters 加法季節）

use crate::{mean, residual_std, Estimate, Estimator};

/// 指數平滑
///
/// beta 為 None 時沒有趨勢項；gamma 為 None 時沒有季節項。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSmoothing {
    pub alpha: f64,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub season_length: usize,
}

impl ExponentialSmoothing {
    fn simple(&self, history: &[f64], horizon: usize) -> Estimate {
        let Some(&first) = history.first() else {
            return Estimate {
                points: vec![0.0; horizon],
                residual_std: 0.0,
            };
        };

        let mut level = first;
        let mut residuals = Vec::with_capacity(history.len());
        for &value in &history[1..] {
            residuals.push(value - level);
            level = self.alpha * value + (1.0 - self.alpha) * level;
        }

        Estimate {
            points: vec![level; horizon],
            residual_std: residual_std(&residuals, 1),
        }
    }

    fn holt(&self, beta: f64, history: &[f64], horizon: usize) -> Estimate {
        if history.len() < 2 {
            return self.simple(history, horizon);
        }

        let mut level = history[0];
        let mut trend = history[1] - history[0];
        let mut residuals = Vec::with_capacity(history.len());

        for &value in &history[1..] {
            residuals.push(value - (level + trend));
            let previous_level = level;
            level = self.alpha * value + (1.0 - self.alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
        }

        Estimate {
            points: (1..=horizon).map(|h| level + h as f64 * trend).collect(),
            residual_std: residual_std(&residuals, 2),
        }
    }

    fn holt_winters(&self, beta: f64, gamma: f64, history: &[f64], horizon: usize) -> Estimate {
        let m = self.season_length;
        if m < 2 || history.len() < 2 * m {
            return self.holt(beta, history, horizon);
        }

        // 以前兩個完整季節初始化
        let first_season = mean(&history[..m]);
        let second_season = mean(&history[m..2 * m]);
        let mut level = first_season;
        let mut trend = (second_season - first_season) / m as f64;
        let mut seasonals: Vec<f64> = history[..m].iter().map(|v| v - first_season).collect();
        let mut residuals = Vec::with_capacity(history.len() - m);

        for (t, &value) in history.iter().enumerate().skip(m) {
            let seasonal = seasonals[t - m];
            residuals.push(value - (level + trend + seasonal));

            let previous_level = level;
            level = self.alpha * (value - seasonal) + (1.0 - self.alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
            seasonals.push(gamma * (value - level) + (1.0 - gamma) * seasonal);
        }

        let n = history.len();
        let points = (1..=horizon)
            .map(|h| level + h as f64 * trend + seasonals[n - m + (h - 1) % m])
            .collect();

        Estimate {
            points,
            residual_std: residual_std(&residuals, 3),
        }
    }
}

impl Estimator for ExponentialSmoothing {
    fn fit_predict(&self, history: &[f64], horizon: usize) -> Estimate {
        match (self.beta, self.gamma) {
            (Some(beta), Some(gamma)) => self.holt_winters(beta, gamma, history, horizon),
            (Some(beta), None) => self.holt(beta, history, horizon),
            _ => self.simple(history, horizon),
        }
    }
}
