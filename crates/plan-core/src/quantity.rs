//! 數量工具

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::{PlanError, Result};

/// 由浮點運算轉回 Decimal 時保留的小數位數
pub const DECIMAL_SCALE: u32 = 4;

/// 檢查數量非負
pub fn ensure_non_negative(entity: &str, field: &'static str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(PlanError::NegativeQuantity {
            entity: entity.to_string(),
            field,
            value,
        });
    }
    Ok(value)
}

/// Decimal 轉 f64（供統計演算法使用）
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// f64 轉 Decimal，非有限值視為 0
pub fn from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(DECIMAL_SCALE))
        .unwrap_or(Decimal::ZERO)
}

/// 向上取整到倍數（倍數 <= 0 時不調整）
pub fn ceil_to_multiple(quantity: Decimal, multiple: Decimal) -> Decimal {
    if multiple <= Decimal::ZERO {
        return quantity;
    }
    let remainder = quantity % multiple;
    if remainder > Decimal::ZERO {
        quantity - remainder + multiple
    } else {
        quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("P-1", "quantity", Decimal::from(5)).is_ok());
        assert!(ensure_non_negative("P-1", "quantity", Decimal::ZERO).is_ok());
        let err = ensure_non_negative("P-1", "quantity", Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, PlanError::NegativeQuantity { field: "quantity", .. }));
    }

    #[test]
    fn test_from_f64_rounds_and_rejects_nan() {
        assert_eq!(from_f64(100.0), Decimal::from(100));
        assert_eq!(from_f64(1.0 / 3.0), Decimal::new(3333, 4));
        assert_eq!(from_f64(f64::NAN), Decimal::ZERO);
        assert_eq!(from_f64(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_ceil_to_multiple() {
        assert_eq!(ceil_to_multiple(Decimal::from(123), Decimal::from(25)), Decimal::from(125));
        assert_eq!(ceil_to_multiple(Decimal::from(200), Decimal::from(100)), Decimal::from(200));
        assert_eq!(ceil_to_multiple(Decimal::from(7), Decimal::ONE), Decimal::from(7));
        assert_eq!(ceil_to_multiple(Decimal::from(7), Decimal::ZERO), Decimal::from(7));
    }
}
