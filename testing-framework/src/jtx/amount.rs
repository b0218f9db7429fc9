// File: testing-framework/src/jtx/amount.rs
//
// Amount shorthands: `xrp(100)`, `drops(10)`, `usd.amount(5)`.

use std::str::FromStr;
use trackable_common::{
    amount::{Amount, Drops, IouAmount, Issue},
    config::DROPS_PER_UNIT,
};

/// Whole native units.
pub fn xrp(units: i64) -> Amount {
    Amount::Native(Drops::units(units))
}

pub fn drops(n: i64) -> Amount {
    Amount::native(n)
}

/// Native amount from a fractional unit count, e.g. `xrp_frac("0.5")`.
///
/// # Panics
///
/// When `units` is not a decimal number of drops.
pub fn xrp_frac(units: &str) -> Amount {
    match IouAmount::from_str(units) {
        Ok(value) => {
            let scaled = value.multiply(&IouAmount::from_integer(DROPS_PER_UNIT));
            let mut mantissa = scaled.mantissa();
            for _ in 0..scaled.exponent().max(0) {
                mantissa *= 10;
            }
            for _ in scaled.exponent().min(0)..0 {
                mantissa /= 10;
            }
            drops(mantissa)
        }
        Err(e) => panic!("{} is not an amount: {}", units, e),
    }
}

/// An issued currency, used to build amounts of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iou {
    issue: Issue,
}

impl Iou {
    pub fn new(issue: Issue) -> Self {
        Self { issue }
    }

    pub fn issue(&self) -> Issue {
        self.issue
    }

    pub fn amount(&self, value: i64) -> Amount {
        self.value(IouAmount::from_integer(value))
    }

    pub fn value(&self, value: IouAmount) -> Amount {
        Amount::iou(value, self.issue)
    }

    /// Amount from decimal text such as `"1.5"`.
    ///
    /// # Panics
    ///
    /// When `value` is not a decimal number.
    pub fn parse(&self, value: &str) -> Amount {
        match IouAmount::from_str(value) {
            Ok(value) => self.value(value),
            Err(e) => panic!("{} is not an amount: {}", value, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackable_common::{amount::Currency, crypto::AccountId};

    #[test]
    fn test_native_shorthands() {
        assert_eq!(xrp(2), drops(2 * DROPS_PER_UNIT));
        assert_eq!(xrp_frac("0.5"), drops(DROPS_PER_UNIT / 2));
        assert_eq!(xrp_frac("3"), xrp(3));
    }

    #[test]
    fn test_iou_amounts() {
        let usd = Iou::new(Issue::new(Currency::from_str("USD").unwrap(), AccountId::no_account()));
        assert_eq!(usd.amount(3), usd.parse("3"));
        assert_eq!(usd.parse("1.5").iou_value(), Some(IouAmount::new(15, -1)));
    }
}
