use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;

use crate::{
    fixed_point::{self, DecimalRepr, FixedPointParseError},
    op,
};

/// Number of decimal places a [`Quantity`] can hold (grams, when the unit is kilograms).
pub const QUANTITY_DECIMALS: u32 = 3;

const UNIT: i64 = 10i64.pow(QUANTITY_DECIMALS);

//--------------------------------------      Quantity       ---------------------------------------------------------
/// An amount of product, stored as a whole number of thousandths of the listing's unit. Fractional amounts such as
/// 1.5 kg are exact.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Quantity(i64);

op!(binary Quantity, Add, add);
op!(binary Quantity, Sub, sub);
op!(inplace Quantity, AddAssign, add_assign);
op!(inplace Quantity, SubAssign, sub_assign);
op!(unary Quantity, Neg, neg);

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a value from its raw representation in thousandths.
    pub const fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// A whole number of units.
    pub const fn from_units(units: i64) -> Self {
        Self(units * UNIT)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl From<i64> for Quantity {
    fn from(units: i64) -> Self {
        Self::from_units(units)
    }
}

impl FromStr for Quantity {
    type Err = FixedPointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fixed_point::parse(s, QUANTITY_DECIMALS).map(Self)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&fixed_point::format(self.0, QUANTITY_DECIMALS, 0))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = DecimalRepr::deserialize(deserializer)?.into_text();
        text.parse().map_err(serde::de::Error::custom)
    }
}
