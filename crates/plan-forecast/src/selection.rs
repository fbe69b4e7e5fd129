//! 預測方法自動選擇
//!
//! 以最後 holdout 期作為驗證集，用其餘歷史擬合各候選方法，
//! 比較驗證集的 MAPE（實際值為 0 的期間不計）。

use plan_core::{ForecastMethod, PlanError, ResolvedSeries, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::estimate;

/// 選擇依據
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionReason {
    /// 配置固定的方法
    Fixed,
    /// 準確度分析的產品偏好
    Preference,
    /// 回測 MAPE 最小
    Backtest,
    /// 歷史不足以回測，使用最簡單可用的方法
    Fallback,
}

/// 候選方法的回測分數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub method: ForecastMethod,

    /// 回測 MAPE（百分比）；無法回測時為 None
    pub mape: Option<f64>,
}

/// 單一產品的選擇結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub product_id: String,
    pub chosen: ForecastMethod,
    pub reason: SelectionReason,
    pub scores: Vec<CandidateScore>,
}

/// 平均絕對百分比誤差（百分比）；實際值全為 0 時為 None
pub fn mape(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    let errors: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .filter(|(_, a)| **a != 0.0)
        .map(|(p, a)| ((p - a) / a).abs())
        .collect();

    if errors.is_empty() {
        return None;
    }
    Some(errors.iter().sum::<f64>() / errors.len() as f64 * 100.0)
}

/// 回測所有候選方法並選出最佳者
pub fn select_method(
    series: &ResolvedSeries,
    candidates: &[ForecastMethod],
    holdout: usize,
) -> Result<SelectionReport> {
    let values = series.values_f64();
    let n = values.len();

    let scores: Vec<CandidateScore> = candidates
        .iter()
        .map(|method| {
            let mape = if holdout > 0 && n > holdout && n - holdout >= method.min_history() {
                let (train, test) = values.split_at(n - holdout);
                let predicted: Vec<f64> = estimate(method, train, holdout)
                    .points
                    .into_iter()
                    .map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 })
                    .collect();
                mape(&predicted, test)
            } else {
                None
            };
            CandidateScore {
                method: *method,
                mape,
            }
        })
        .collect();

    // MAPE 最小；平手時偏好較簡單的族群，再依候選順序
    let best = scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.mape.map(|m| (i, m, s.method)))
        .min_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| a.2.family().cmp(&b.2.family()))
                .then_with(|| a.0.cmp(&b.0))
        });

    if let Some((_, score, method)) = best {
        tracing::debug!("{} 回測選擇 {}（MAPE {:.2}%）", series.product_id, method, score);
        return Ok(SelectionReport {
            product_id: series.product_id.clone(),
            chosen: method,
            reason: SelectionReason::Backtest,
            scores,
        });
    }

    // 無法回測：使用可套用於全部歷史的最簡單方法
    let mut ordered: Vec<(usize, &ForecastMethod)> = candidates.iter().enumerate().collect();
    ordered.sort_by(|a, b| match a.1.family().cmp(&b.1.family()) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    if let Some((_, method)) = ordered.iter().find(|(_, m)| m.min_history() <= n) {
        tracing::warn!(
            "{} 歷史只有 {} 期，無法回測，改用 {}",
            series.product_id,
            n,
            method
        );
        return Ok(SelectionReport {
            product_id: series.product_id.clone(),
            chosen: **method,
            reason: SelectionReason::Fallback,
            scores,
        });
    }

    let simplest = ordered
        .iter()
        .map(|(_, m)| *m)
        .min_by_key(|m| m.min_history());
    Err(match simplest {
        Some(method) => PlanError::InsufficientHistory {
            algorithm: method.id().to_string(),
            required: method.min_history(),
            actual: n,
        },
        None => PlanError::InvalidParameter("沒有候選預測方法".to_string()),
    })
}
