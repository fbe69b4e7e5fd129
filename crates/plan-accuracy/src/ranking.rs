//! 演算法排名與產品偏好方法

use plan_core::forecast::MANUAL_ALGORITHM_ID;
use plan_core::{AccuracyRecord, ForecastMethod};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::summary::AccuracySummary;

/// 單一方法在某產品上的表現
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodScore {
    pub method: ForecastMethod,
    pub algorithm_id: String,
    pub summary: AccuracySummary,
}

fn compare(a: &MethodScore, b: &MethodScore) -> Ordering {
    let by_mape = match (a.summary.mape, b.summary.mape) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_mape
        .then_with(|| a.method.family().cmp(&b.method.family()))
        .then_with(|| a.method.to_string().cmp(&b.method.to_string()))
}

/// 各產品的演算法排名（MAPE 由低到高，平手時較簡單者優先）
///
/// 人工調整的預測不參與排名。
pub fn rank_methods(records: &[AccuracyRecord]) -> BTreeMap<String, Vec<MethodScore>> {
    let mut groups: BTreeMap<&str, Vec<(ForecastMethod, Vec<&AccuracyRecord>)>> = BTreeMap::new();

    for record in records.iter().filter(|r| r.algorithm_id != MANUAL_ALGORITHM_ID) {
        let methods = groups.entry(record.product_id.as_str()).or_default();
        match methods.iter_mut().find(|(m, _)| *m == record.method) {
            Some((_, group)) => group.push(record),
            None => methods.push((record.method, vec![record])),
        }
    }

    groups
        .into_iter()
        .map(|(product, methods)| {
            let mut scores: Vec<MethodScore> = methods
                .into_iter()
                .map(|(method, group)| MethodScore {
                    method,
                    algorithm_id: method.id().to_string(),
                    summary: AccuracySummary::from_records(group),
                })
                .collect();
            scores.sort_by(compare);
            (product.to_string(), scores)
        })
        .collect()
}

/// 每個產品排名第一且可評分的方法
pub fn preferred_methods(
    rankings: &BTreeMap<String, Vec<MethodScore>>,
) -> BTreeMap<String, ForecastMethod> {
    rankings
        .iter()
        .filter_map(|(product, scores)| {
            scores
                .first()
                .filter(|s| s.summary.mape.is_some())
                .map(|s| (product.clone(), s.method))
        })
        .collect()
}
