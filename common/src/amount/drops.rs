use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use super::AmountError;
use crate::config::DROPS_PER_UNIT;

/// Native currency amount in drops. Signed so that deltas can be expressed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Drops(i64);

impl Drops {
    pub const fn new(drops: i64) -> Self {
        Drops(drops)
    }

    pub const fn zero() -> Self {
        Drops(0)
    }

    /// Whole native units.
    pub const fn units(units: i64) -> Self {
        Drops(units * DROPS_PER_UNIT)
    }

    pub const fn drops(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Drops) -> Option<Drops> {
        self.0.checked_add(other.0).map(Drops)
    }

    pub fn checked_sub(self, other: Drops) -> Option<Drops> {
        self.0.checked_sub(other.0).map(Drops)
    }
}

impl FromStr for Drops {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Drops)
            .map_err(|_| AmountError::BadNative(s.to_owned()))
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} drops", self.0)
    }
}

impl Add for Drops {
    type Output = Drops;
    fn add(self, rhs: Drops) -> Drops {
        Drops(self.0 + rhs.0)
    }
}

impl AddAssign for Drops {
    fn add_assign(&mut self, rhs: Drops) {
        self.0 += rhs.0;
    }
}

impl Sub for Drops {
    type Output = Drops;
    fn sub(self, rhs: Drops) -> Drops {
        Drops(self.0 - rhs.0)
    }
}

impl SubAssign for Drops {
    fn sub_assign(&mut self, rhs: Drops) {
        self.0 -= rhs.0;
    }
}

impl Neg for Drops {
    type Output = Drops;
    fn neg(self) -> Drops {
        Drops(-self.0)
    }
}
