//! 預測引擎

use chrono::NaiveDateTime;
use plan_core::quantity::from_f64;
use plan_core::{
    EntityError, Forecast, ForecastConfig, ForecastLedger, ForecastMethod, MethodSelection,
    PlanError, PlanningException, ResolvedSeries, Result, TimeSeries, TimeSeriesStore, Warning,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::selection::{select_method, SelectionReason, SelectionReport};
use crate::{estimate, Z_95};

/// 單一產品的預測結果
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutput {
    pub product_id: String,

    /// 依期間排序的預測
    pub forecasts: Vec<Forecast>,

    /// 截斷負值等例外
    pub exceptions: Vec<PlanningException>,

    pub warnings: Vec<Warning>,

    /// 方法選擇過程（直接指定方法時為 None）
    pub selection: Option<SelectionReport>,
}

/// 多產品批次預測結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastBatch {
    pub forecasts: Vec<Forecast>,
    pub exceptions: Vec<PlanningException>,
    pub warnings: Vec<Warning>,
    pub selections: Vec<SelectionReport>,

    /// 失敗的產品
    pub errors: Vec<EntityError>,
}

impl ForecastBatch {
    /// 轉為預測帳本
    pub fn to_ledger(&self) -> ForecastLedger {
        let mut ledger = ForecastLedger::new();
        ledger.record_all(self.forecasts.iter().cloned());
        ledger
    }
}

/// 預測引擎
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    generated_at: NaiveDateTime,
}

impl ForecastEngine {
    /// 創建預測引擎（generated_at 寫入每筆預測）
    pub fn new(config: ForecastConfig, generated_at: NaiveDateTime) -> Self {
        Self {
            config,
            generated_at,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// 以指定方法預測 horizon 期
    ///
    /// 第一期為歷史最後一期的下一個月。負的估計截為 0 並產生例外。
    pub fn forecast(
        &self,
        series: &ResolvedSeries,
        horizon: usize,
        method: &ForecastMethod,
    ) -> Result<ForecastOutput> {
        method.validate()?;
        if horizon == 0 {
            return Err(PlanError::InvalidParameter("預測期數必須大於 0".to_string()));
        }
        if series.len() < method.min_history() {
            return Err(PlanError::InsufficientHistory {
                algorithm: method.id().to_string(),
                required: method.min_history(),
                actual: series.len(),
            });
        }

        let estimate = estimate(method, &series.values_f64(), horizon);
        let sigma = if estimate.residual_std.is_finite() {
            estimate.residual_std
        } else {
            0.0
        };
        let start = series.next_period();

        let mut forecasts = Vec::with_capacity(horizon);
        let mut exceptions = Vec::new();

        for (h, raw) in estimate.points.iter().enumerate() {
            let period = start.add_months(h as i64);
            let raw = if raw.is_finite() { *raw } else { 0.0 };
            let point = from_f64(raw);
            let clamped = point < Decimal::ZERO;

            if clamped {
                debug!("{} {} 預測為負 ({})，截為 0", series.product_id, period, point);
                exceptions.push(PlanningException::ClampedForecast {
                    product_id: series.product_id.clone(),
                    period,
                    raw_estimate: point,
                });
            }

            let forecast = Forecast::new(
                series.product_id.clone(),
                period,
                point.max(Decimal::ZERO),
                *method,
                self.generated_at,
            )
            .with_bounds(
                from_f64((raw - Z_95 * sigma).max(0.0)),
                from_f64((raw + Z_95 * sigma).max(0.0)),
            )
            .with_clamped(clamped);
            forecasts.push(forecast);
        }

        Ok(ForecastOutput {
            product_id: series.product_id.clone(),
            forecasts,
            exceptions,
            warnings: Vec::new(),
            selection: None,
        })
    }

    /// 決定產品使用的方法
    ///
    /// 固定方法一律採用；自動選擇時先看產品偏好，偏好方法歷史不足才回測選擇。
    pub fn choose_method(&self, series: &ResolvedSeries) -> Result<(SelectionReport, Vec<Warning>)> {
        let mut warnings = Vec::new();

        let report = match self.config.selection {
            MethodSelection::Fixed(method) => SelectionReport {
                product_id: series.product_id.clone(),
                chosen: method,
                reason: SelectionReason::Fixed,
                scores: Vec::new(),
            },
            MethodSelection::Automatic => {
                if let Some(preferred) = self.config.preferences.get(&series.product_id) {
                    if preferred.min_history() <= series.len() {
                        return Ok((
                            SelectionReport {
                                product_id: series.product_id.clone(),
                                chosen: *preferred,
                                reason: SelectionReason::Preference,
                                scores: Vec::new(),
                            },
                            warnings,
                        ));
                    }
                    warn!(
                        "{} 的偏好方法 {} 需要 {} 期歷史，實際 {} 期",
                        series.product_id,
                        preferred,
                        preferred.min_history(),
                        series.len()
                    );
                    warnings.push(Warning::warning(
                        series.product_id.clone(),
                        format!("偏好方法 {preferred} 的歷史不足，改用自動選擇"),
                    ));
                }
                select_method(series, &self.config.candidates, self.config.holdout)?
            }
        };

        if report.reason == SelectionReason::Fallback {
            warnings.push(Warning::info(
                series.product_id.clone(),
                format!("歷史不足以回測，使用 {}", report.chosen),
            ));
        }

        Ok((report, warnings))
    }

    /// 預測單一產品：補齊缺漏、選擇方法、產生預測
    pub fn forecast_series(&self, series: &TimeSeries) -> Result<ForecastOutput> {
        let resolved = series.resolve(self.config.gap_policy)?;
        let mut warnings = Vec::new();

        if !resolved.filled.is_empty() {
            warnings.push(Warning::info(
                series.product_id(),
                format!(
                    "以 {:?} 補齊 {} 個缺漏月份",
                    self.config.gap_policy,
                    resolved.filled.len()
                ),
            ));
        }

        let (report, selection_warnings) = self.choose_method(&resolved)?;
        warnings.extend(selection_warnings);

        let mut output = self.forecast(&resolved, self.config.horizon, &report.chosen)?;
        warnings.append(&mut output.warnings);
        output.warnings = warnings;
        output.selection = Some(report);
        Ok(output)
    }

    /// 批次預測所有產品（平行）
    ///
    /// 單一產品失敗不影響其他產品，失敗記錄於 errors。
    pub fn forecast_all(&self, store: &TimeSeriesStore) -> ForecastBatch {
        info!("開始預測 {} 個產品，預測 {} 期", store.len(), self.config.horizon);

        let series: Vec<&TimeSeries> = store.iter().collect();
        let results: Vec<(String, Result<ForecastOutput>)> = series
            .par_iter()
            .map(|s| (s.product_id().to_string(), self.forecast_series(s)))
            .collect();

        let mut batch = ForecastBatch::default();
        for (product_id, result) in results {
            match result {
                Ok(output) => {
                    batch.forecasts.extend(output.forecasts);
                    batch.exceptions.extend(output.exceptions);
                    batch.warnings.extend(output.warnings);
                    batch.selections.extend(output.selection);
                }
                Err(err) => {
                    warn!("產品 {} 預測失敗: {}", product_id, err);
                    batch.errors.push(EntityError::new(product_id, &err));
                }
            }
        }

        info!(
            "預測完成: {} 筆預測, {} 個產品失敗",
            batch.forecasts.len(),
            batch.errors.len()
        );
        batch
    }
}
