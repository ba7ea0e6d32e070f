use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A currency amount held at cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).round().to_i64().unwrap_or(i64::MAX)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(round_cents(decimal))
    }

    /// Converts a scanned floating-point amount. `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self::from_decimal)
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// `percent`% of this amount, rounded half-up to the cent.
    pub fn percent(self, percent: Decimal) -> Self {
        Self::from_decimal(self.0 * percent / Decimal::from(100))
    }

    /// Splits into `parts` equal shares rounded down to the cent, plus the
    /// leftover cents that did not divide evenly.
    pub fn split(self, parts: u32) -> Option<(Money, Money)> {
        if parts == 0 {
            return None;
        }
        let cents = self.to_cents();
        let parts = i64::from(parts);
        let share = cents.div_euclid(parts);
        let remainder = cents - share * parts;
        Some((Money::from_cents(share), Money::from_cents(remainder)))
    }
}

fn round_cents(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}
