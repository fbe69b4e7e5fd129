//! 預測評分：逐筆比對預測與實際出貨

use plan_core::quantity::DECIMAL_SCALE;
use plan_core::{AccuracyRecord, Forecast, ScoreStatus, TimeSeriesStore};
use rust_decimal::Decimal;

/// 以實際值評分單筆預測
///
/// 實際值為 0 時百分比誤差與偏差都無定義。
pub fn score_one(forecast: &Forecast, actual: Decimal) -> AccuracyRecord {
    let predicted = forecast.predicted_quantity;
    let (absolute_pct_error, bias, status) = if actual == Decimal::ZERO {
        (None, None, ScoreStatus::UndefinedZeroActual)
    } else {
        let error = (predicted - actual) / actual;
        (
            Some(error.abs().round_dp(DECIMAL_SCALE)),
            Some(error.round_dp(DECIMAL_SCALE)),
            ScoreStatus::Scored,
        )
    };

    AccuracyRecord {
        product_id: forecast.product_id.clone(),
        period: forecast.period,
        forecast_qty: predicted,
        actual_qty: actual,
        absolute_pct_error,
        bias,
        algorithm_id: forecast.algorithm_id.clone(),
        method: forecast.method,
        generated_at: forecast.generated_at,
        status,
    }
}

/// 評分所有有實際值的預測版本
///
/// 沒有實際值的預測（未來期間）略過。結果依產品、期間排序，同一期間保留版本順序。
pub fn score(forecasts: &[Forecast], actuals: &TimeSeriesStore) -> Vec<AccuracyRecord> {
    let mut records: Vec<AccuracyRecord> = forecasts
        .iter()
        .filter_map(|f| {
            actuals
                .actual(&f.product_id, f.period)
                .map(|actual| score_one(f, actual))
        })
        .collect();

    records.sort_by(|a, b| {
        a.product_id
            .cmp(&b.product_id)
            .then(a.period.cmp(&b.period))
    });

    tracing::debug!(
        "評分 {} 筆預測，{} 筆有實際值",
        forecasts.len(),
        records.len()
    );
    records
}
