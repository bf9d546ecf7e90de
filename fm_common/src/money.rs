use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;

use crate::{
    fixed_point::{self, div_round_half_up, DecimalRepr, FixedPointParseError},
    op,
    Quantity,
    QUANTITY_DECIMALS,
};

/// Number of decimal places a [`Money`] value can hold. Unit prices may be quoted to this precision.
pub const MONEY_DECIMALS: u32 = 4;
/// Number of decimal places of the settlement currency. Line subtotals and order totals are rounded to this.
pub const CURRENCY_DECIMALS: u32 = 2;

const CENT: i64 = 10i64.pow(MONEY_DECIMALS - CURRENCY_DECIMALS);

//--------------------------------------        Money        ---------------------------------------------------------
/// A monetary amount, stored as a whole number of ten-thousandths of the currency unit.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a value from its raw representation in ten-thousandths.
    pub const fn from_raw(value: i64) -> Self {
        Self(value)
    }

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents * CENT)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_whole_cents(&self) -> bool {
        self.0 % CENT == 0
    }

    /// Rounds to the nearest cent, with halves rounded away from zero.
    pub fn round_to_cents(self) -> Self {
        // |self.0| / CENT always fits back into an i64
        #[allow(clippy::cast_possible_truncation)]
        let cents = div_round_half_up(i128::from(self.0), i128::from(CENT)) as i64;
        Self::from_cents(cents)
    }

    /// Multiplies a unit price by a quantity and rounds the product to whole cents (half-up) exactly once.
    ///
    /// The multiplication is carried out on the raw integers in `i128`, so no intermediate rounding occurs. Returns
    /// `None` if the rounded result does not fit in a `Money`.
    pub fn checked_extend(self, quantity: Quantity) -> Option<Self> {
        let raw = i128::from(self.0) * i128::from(quantity.value());
        let divisor = 10i128.pow(QUANTITY_DECIMALS + MONEY_DECIMALS - CURRENCY_DECIMALS);
        let cents = i64::try_from(div_round_half_up(raw, divisor)).ok()?;
        cents.checked_mul(CENT).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl FromStr for Money {
    type Err = FixedPointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fixed_point::parse(s, MONEY_DECIMALS).map(Self)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&fixed_point::format(self.0, MONEY_DECIMALS, CURRENCY_DECIMALS))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = DecimalRepr::deserialize(deserializer)?.into_text();
        text.parse().map_err(serde::de::Error::custom)
    }
}
