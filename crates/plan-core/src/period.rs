//! 計劃期間（月份桶）
//!
//! 所有時間運算都以 [`Period`] 進行，不直接操作日期。

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{PlanError, Result};

/// 日曆月份 (年, 月)
///
/// 欄位順序為 (year, month)，因此推導出的排序即為時間順序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// 創建新的期間（月份必須介於 1..=12）
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PlanError::InvalidPeriod(format!("{year}-{month}")));
        }
        if !(1..=9999).contains(&year) {
            return Err(PlanError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 連續月份序號（年 × 12 + 月 - 1）
    pub fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// 往後（或往前，n 為負）推算 n 個月
    pub fn add_months(&self, n: i64) -> Self {
        Self::from_index(self.index() + n)
    }

    /// 往前推算 n 個月
    pub fn sub_months(&self, n: i64) -> Self {
        self.add_months(-n)
    }

    /// 從 self 到 other 相差的月數（other 較早時為負）
    pub fn months_until(&self, other: Period) -> i64 {
        other.index() - self.index()
    }

    /// 下一個月
    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    /// 上一個月
    pub fn pred(&self) -> Self {
        self.add_months(-1)
    }

    /// 從 start 開始連續 count 個月
    pub fn range(start: Period, count: usize) -> Vec<Period> {
        (0..count as i64).map(|i| start.add_months(i)).collect()
    }

    /// 閉區間 [start, end] 內的所有月份；end 早於 start 時為空
    pub fn span(start: Period, end: Period) -> Vec<Period> {
        let count = start.months_until(end) + 1;
        if count <= 0 {
            return Vec::new();
        }
        Self::range(start, count as usize)
    }

    /// 日期所屬的月份
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// 月份第一天
    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| PlanError::InvalidPeriod(self.to_string()))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PlanError;

    /// 解析 `YYYY-MM`（亦接受 `YYYY-M`）
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PlanError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Period::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn test_period_ordering() {
        assert!(p(2024, 12) < p(2025, 1));
        assert!(p(2025, 2) > p(2025, 1));
    }

    #[rstest]
    #[case(p(2024, 11), 3, p(2025, 2))]
    #[case(p(2025, 1), -1, p(2024, 12))]
    #[case(p(2025, 6), -18, p(2023, 12))]
    #[case(p(2025, 6), 0, p(2025, 6))]
    fn test_add_months(#[case] start: Period, #[case] n: i64, #[case] expected: Period) {
        assert_eq!(start.add_months(n), expected);
        assert_eq!(start.months_until(expected), n);
    }

    #[test]
    fn test_parse_and_display() {
        let period: Period = "2025-03".parse().unwrap();
        assert_eq!(period, p(2025, 3));
        assert_eq!(period.to_string(), "2025-03");
        assert_eq!("2025-7".parse::<Period>().unwrap(), p(2025, 7));

        assert!("2025-13".parse::<Period>().is_err());
        assert!("2025".parse::<Period>().is_err());
        assert!("abcd-01".parse::<Period>().is_err());
    }

    #[test]
    fn test_span_and_range() {
        let span = Period::span(p(2024, 11), p(2025, 2));
        assert_eq!(span, vec![p(2024, 11), p(2024, 12), p(2025, 1), p(2025, 2)]);
        assert!(Period::span(p(2025, 2), p(2025, 1)).is_empty());
        assert_eq!(Period::range(p(2025, 1), 12).last(), Some(&p(2025, 12)));
    }

    #[test]
    fn test_date_conversion() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let period = Period::from_date(date);
        assert_eq!(period, p(2025, 11));
        assert_eq!(
            period.first_day().unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&p(2025, 4)).unwrap();
        assert_eq!(json, "\"2025-04\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p(2025, 4));
    }
}
