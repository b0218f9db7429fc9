use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use super::AmountError;

const MIN_MANTISSA: i128 = 1_000_000_000_000_000;
const MAX_MANTISSA: i128 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const ZERO_EXPONENT: i32 = -100;

/// Issued currency value: a signed 16 digit decimal mantissa with a base 10
/// exponent. Non-zero values always keep the mantissa in
/// `[10^15, 10^16)`; zero is mantissa 0 with exponent -100.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IouAmount {
    mantissa: i64,
    exponent: i32,
}

impl IouAmount {
    pub const fn zero() -> Self {
        IouAmount {
            mantissa: 0,
            exponent: ZERO_EXPONENT,
        }
    }

    pub fn new(mantissa: i64, exponent: i32) -> Self {
        Self::normalize(mantissa as i128, exponent)
    }

    pub fn from_integer(value: i64) -> Self {
        Self::new(value, 0)
    }

    // Out of range exponents saturate: too small collapses to zero, too big
    // clamps to the largest representable magnitude.
    fn normalize(mut mantissa: i128, mut exponent: i32) -> Self {
        if mantissa == 0 {
            return Self::zero();
        }
        let negative = mantissa < 0;
        if negative {
            mantissa = -mantissa;
        }
        while mantissa < MIN_MANTISSA && exponent > MIN_EXPONENT {
            mantissa *= 10;
            exponent -= 1;
        }
        while mantissa > MAX_MANTISSA {
            mantissa /= 10;
            exponent += 1;
        }
        if exponent < MIN_EXPONENT || mantissa < MIN_MANTISSA {
            return Self::zero();
        }
        if exponent > MAX_EXPONENT {
            mantissa = MAX_MANTISSA;
            exponent = MAX_EXPONENT;
        }
        let mantissa = mantissa as i64;
        IouAmount {
            mantissa: if negative { -mantissa } else { mantissa },
            exponent,
        }
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    pub fn signum(&self) -> i32 {
        self.mantissa.signum() as i32
    }

    pub fn abs(&self) -> Self {
        IouAmount {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    pub fn multiply(&self, other: &IouAmount) -> IouAmount {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let product = self.mantissa as i128 * other.mantissa as i128;
        Self::normalize(product, self.exponent + other.exponent)
    }

    pub fn divide(&self, other: &IouAmount) -> Result<IouAmount, AmountError> {
        if other.is_zero() {
            return Err(AmountError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let numerator = self.mantissa as i128 * 100_000_000_000_000_000;
        Ok(Self::normalize(
            numerator / other.mantissa as i128,
            self.exponent - other.exponent - 17,
        ))
    }

    /// Scale by a rate expressed in billionths (1_000_000_000 is 1.0).
    pub fn multiply_rate(&self, rate: u32) -> IouAmount {
        self.multiply(&IouAmount::new(rate as i64, -9))
    }

    fn aligned(a: &IouAmount, b: &IouAmount) -> (i128, i128, i32) {
        let (mut ma, mut ea) = (a.mantissa as i128, a.exponent);
        let (mut mb, mut eb) = (b.mantissa as i128, b.exponent);
        while ea < eb {
            ma /= 10;
            ea += 1;
        }
        while eb < ea {
            mb /= 10;
            eb += 1;
        }
        (ma, mb, ea)
    }
}

impl Default for IouAmount {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for IouAmount {
    type Output = IouAmount;

    fn add(self, rhs: IouAmount) -> IouAmount {
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }
        let (a, b, exponent) = Self::aligned(&self, &rhs);
        Self::normalize(a + b, exponent)
    }
}

impl AddAssign for IouAmount {
    fn add_assign(&mut self, rhs: IouAmount) {
        *self = *self + rhs;
    }
}

impl Neg for IouAmount {
    type Output = IouAmount;

    fn neg(self) -> IouAmount {
        IouAmount {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Sub for IouAmount {
    type Output = IouAmount;

    fn sub(self, rhs: IouAmount) -> IouAmount {
        self + (-rhs)
    }
}

impl SubAssign for IouAmount {
    fn sub_assign(&mut self, rhs: IouAmount) {
        *self = *self - rhs;
    }
}

impl Ord for IouAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }
        let magnitude = self
            .exponent
            .cmp(&other.exponent)
            .then(self.mantissa.abs().cmp(&other.mantissa.abs()));
        if sa < 0 {
            magnitude.reverse()
        } else {
            magnitude
        }
    }
}

impl PartialOrd for IouAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for IouAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AmountError::BadValue(s.to_owned());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (number, exp) = match body.find(|c| c == 'e' || c == 'E') {
            Some(pos) => (
                &body[..pos],
                body[pos + 1..].parse::<i32>().map_err(|_| bad())?,
            ),
            None => (body, 0),
        };
        let (int_part, frac_part) = match number.find('.') {
            Some(pos) => (&number[..pos], &number[pos + 1..]),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let digits = format!("{}{}", int_part, frac_part);
        let digits = digits.trim_start_matches('0');
        let mut exponent = exp - frac_part.len() as i32;
        // Keep at most 19 significant digits so the mantissa fits
        let (kept, dropped) = if digits.len() > 19 {
            digits.split_at(19)
        } else {
            (digits, "")
        };
        exponent += dropped.len() as i32;
        let mantissa: i128 = if kept.is_empty() {
            0
        } else {
            kept.parse().map_err(|_| bad())?
        };
        let value = Self::normalize(mantissa, exponent);
        Ok(if negative { -value } else { value })
    }
}

impl fmt::Display for IouAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.exponent < -25 || self.exponent > 11 {
            return write!(f, "{}e{}", self.mantissa, self.exponent);
        }
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.abs().to_string();
        let point = digits.len() as i32 + self.exponent;
        let (int_part, frac_part) = if point <= 0 {
            ("0".to_string(), format!("{}{}", "0".repeat((-point) as usize), digits))
        } else if point as usize >= digits.len() {
            (
                format!("{}{}", digits, "0".repeat(point as usize - digits.len())),
                String::new(),
            )
        } else {
            (
                digits[..point as usize].to_string(),
                digits[point as usize..].to_string(),
            )
        };
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            write!(f, "{}{}", sign, int_part)
        } else {
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        }
    }
}

impl fmt::Debug for IouAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IouAmount({})", self)
    }
}

impl Serialize for IouAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for IouAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        IouAmount::from_str(&s).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iou(s: &str) -> IouAmount {
        IouAmount::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(iou("3").to_string(), "3");
        assert_eq!(iou("0.25").to_string(), "0.25");
        assert_eq!(iou("-1.02").to_string(), "-1.02");
        assert_eq!(iou("100").to_string(), "100");
        assert_eq!(iou("1e3"), iou("1000"));
        assert_eq!(iou("0").to_string(), "0");
        assert!(IouAmount::from_str("1.2.3").is_err());
        assert!(IouAmount::from_str("abc").is_err());
    }

    #[test]
    fn test_rate_multiplication() {
        assert_eq!(iou("1").multiply_rate(1_020_000_000), iou("1.02"));
        assert_eq!(iou("1").multiply_rate(2_750_000_000), iou("2.75"));
        assert_eq!(iou("3") - iou("1").multiply_rate(2_750_000_000), iou("0.25"));
    }

    #[test]
    fn test_ordering_with_signs() {
        assert!(iou("-5") < iou("-1"));
        assert!(iou("-1") < IouAmount::zero());
        assert!(iou("0.5") < iou("2"));
        assert!(iou("20") > iou("3"));
    }

    #[test]
    fn test_division() {
        assert_eq!(iou("1").divide(&iou("4")).unwrap(), iou("0.25"));
        assert_eq!(iou("1").divide(&IouAmount::zero()), Err(AmountError::DivisionByZero));
    }

    proptest! {
        #[test]
        fn prop_add_then_sub_restores_integers(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let x = IouAmount::from_integer(a);
            let y = IouAmount::from_integer(b);
            prop_assert_eq!((x + y) - y, x);
            prop_assert_eq!(x + y, IouAmount::from_integer(a + b));
        }

        #[test]
        fn prop_order_matches_integers(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            prop_assert_eq!(IouAmount::from_integer(a).cmp(&IouAmount::from_integer(b)), a.cmp(&b));
        }
    }
}
