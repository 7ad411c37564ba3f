use crate::{AppError, AppResult};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

/// 1 USDT = 1_000_000 micro
pub const MICROS_PER_USDT: i64 = 1_000_000;
pub const AMOUNT_SCALE: u32 = 6;
pub const BPS_DENOMINATOR: i128 = 10_000;

/// 以 micro-USDT 为单位的整数金额
///
/// 数据库中直接存 i64，便于用 `$inc` 做原子加减；对外接口统一转换为 `Decimal`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_micros(micros: i64) -> Self {
        Amount(micros)
    }

    pub const fn from_usdt(units: i64) -> Self {
        Amount(units * MICROS_PER_USDT)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    /// 超过 6 位的小数部分直接截断
    pub fn from_decimal(value: Decimal) -> AppResult<Self> {
        if value.is_sign_negative() {
            return Err(AppError::BadRequest(format!("Amount {} must not be negative.", value)));
        }

        value
            .checked_mul(Decimal::from(MICROS_PER_USDT))
            .and_then(|micros| micros.trunc().to_i64())
            .map(Amount)
            .ok_or_else(|| AppError::BadRequest(format!("Amount {} is out of range.", value)))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, AMOUNT_SCALE).normalize()
    }

    /// 按基点(1/10000)计算比例金额，向下取整
    pub fn bps(self, bps: u32) -> Amount {
        Amount((self.0 as i128 * bps as i128 / BPS_DENOMINATOR) as i64)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0).max(0))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn negate(self) -> Amount {
        Amount(-self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_conversion_truncates() {
        let amount = Amount::from_decimal(Decimal::from_str("12.3456789").unwrap()).unwrap();
        assert_eq!(amount.micros(), 12_345_678);
        assert_eq!(amount.to_decimal(), Decimal::from_str("12.345678").unwrap());
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(Amount::from_decimal(Decimal::from_str("-1").unwrap()).is_err());
    }

    #[test]
    fn test_huge_amount_is_out_of_range() {
        assert!(matches!(Amount::from_decimal(Decimal::MAX), Err(AppError::BadRequest(_))));
        // 乘法不溢出但超过 i64
        let too_big = Decimal::from(i64::MAX / MICROS_PER_USDT + 1);
        assert!(Amount::from_decimal(too_big).is_err());
    }

    #[test]
    fn test_bps() {
        let deposit = Amount::from_usdt(100);
        assert_eq!(deposit.bps(1200), Amount::from_usdt(12));
        assert_eq!(deposit.bps(500), Amount::from_usdt(5));
        assert_eq!(Amount::from_micros(3).bps(5000), Amount::from_micros(1));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Amount::from_usdt(25).to_string(), "25");
        assert_eq!(Amount::from_micros(1_500_000).to_string(), "1.5");
    }
}
