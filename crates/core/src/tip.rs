use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::money::Money;

#[derive(Debug, Error, PartialEq)]
pub enum TipError {
    #[error("Split must be at least one person")]
    InvalidSplit,
    #[error("Tip percentage must be between 0 and 100, got {0}")]
    InvalidPercent(Decimal),
}

/// The emoji scale offered next to the custom-percentage field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Poor,
    Okay,
    Good,
    Great,
    Amazing,
}

impl Sentiment {
    pub const ALL: [Sentiment; 5] = [
        Sentiment::Poor,
        Sentiment::Okay,
        Sentiment::Good,
        Sentiment::Great,
        Sentiment::Amazing,
    ];

    pub fn percent(self) -> Decimal {
        match self {
            Sentiment::Poor => Decimal::from(10),
            Sentiment::Okay => Decimal::from(15),
            Sentiment::Good => Decimal::from(18),
            Sentiment::Great => Decimal::from(20),
            Sentiment::Amazing => Decimal::from(25),
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Sentiment::Poor => "😞",
            Sentiment::Okay => "🙂",
            Sentiment::Good => "😊",
            Sentiment::Great => "😄",
            Sentiment::Amazing => "🤩",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Poor => write!(f, "poor"),
            Sentiment::Okay => write!(f, "okay"),
            Sentiment::Good => write!(f, "good"),
            Sentiment::Great => write!(f, "great"),
            Sentiment::Amazing => write!(f, "amazing"),
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poor" => Ok(Sentiment::Poor),
            "okay" | "ok" => Ok(Sentiment::Okay),
            "good" => Ok(Sentiment::Good),
            "great" => Ok(Sentiment::Great),
            "amazing" => Ok(Sentiment::Amazing),
            other => Err(format!("Unknown sentiment: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipChoice {
    Preset(Sentiment),
    Custom(Decimal),
}

impl TipChoice {
    pub fn percent(self) -> Decimal {
        match self {
            TipChoice::Preset(s) => s.percent(),
            TipChoice::Custom(p) => p,
        }
    }
}

impl Default for TipChoice {
    fn default() -> Self {
        TipChoice::Preset(Sentiment::Good)
    }
}

/// Tip, total, and per-person share for one bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipBreakdown {
    pub bill: Money,
    pub tip_percent: Decimal,
    pub tip: Money,
    pub total: Money,
    pub split: u32,
    pub per_person: Money,
    /// Cents left over after an even split; `per_person * split + remainder == total`.
    pub remainder: Money,
    /// True when the tip came from gratuity already printed on the receipt.
    pub gratuity_included: bool,
}

impl TipBreakdown {
    pub fn compute(bill: Money, choice: TipChoice, split: u32) -> Result<Self, TipError> {
        let percent = choice.percent();
        if percent < Decimal::ZERO || percent > Decimal::from(100) {
            return Err(TipError::InvalidPercent(percent));
        }
        let tip = bill.percent(percent);
        Self::assemble(bill, percent, tip, split, false)
    }

    /// The receipt already carries a gratuity: no further tip is added and the
    /// included amount is reported as the tip.
    pub fn with_included_gratuity(
        bill: Money,
        gratuity: Money,
        split: u32,
    ) -> Result<Self, TipError> {
        let percent = if bill.is_zero() {
            Decimal::ZERO
        } else {
            (gratuity.as_decimal() * Decimal::from(100) / bill.as_decimal()).round_dp(2)
        };
        Self::assemble(bill, percent, gratuity, split, true)
    }

    fn assemble(
        bill: Money,
        tip_percent: Decimal,
        tip: Money,
        split: u32,
        gratuity_included: bool,
    ) -> Result<Self, TipError> {
        let total = bill + tip;
        let (per_person, remainder) = total.split(split).ok_or(TipError::InvalidSplit)?;
        Ok(Self {
            bill,
            tip_percent,
            tip,
            total,
            split,
            per_person,
            remainder,
            gratuity_included,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn preset_percentages() {
        assert_eq!(Sentiment::Good.percent(), Decimal::from(18));
        assert_eq!(TipChoice::Preset(Sentiment::Amazing).percent(), Decimal::from(25));
        assert_eq!(TipChoice::default().percent(), Decimal::from(18));
    }

    #[test]
    fn sentiment_from_str_roundtrip() {
        for s in Sentiment::ALL {
            assert_eq!(Sentiment::from_str(&s.to_string()).unwrap(), s);
        }
        assert!(Sentiment::from_str("meh").is_err());
    }

    #[test]
    fn compute_tip_and_split() {
        let b = TipBreakdown::compute(Money::from_cents(9000), TipChoice::Preset(Sentiment::Great), 3)
            .unwrap();
        assert_eq!(b.tip.to_cents(), 1800);
        assert_eq!(b.total.to_cents(), 10800);
        assert_eq!(b.per_person.to_cents(), 3600);
        assert!(b.remainder.is_zero());
        assert!(!b.gratuity_included);
    }

    #[test]
    fn uneven_split_keeps_remainder() {
        let b = TipBreakdown::compute(
            Money::from_cents(10000),
            TipChoice::Custom(Decimal::ZERO),
            3,
        )
        .unwrap();
        assert_eq!(b.per_person.to_cents() * 3 + b.remainder.to_cents(), b.total.to_cents());
    }

    #[test]
    fn zero_split_is_rejected() {
        let err = TipBreakdown::compute(Money::from_cents(1000), TipChoice::default(), 0).unwrap_err();
        assert_eq!(err, TipError::InvalidSplit);
    }

    #[test]
    fn out_of_range_percent_is_rejected() {
        let err = TipBreakdown::compute(
            Money::from_cents(1000),
            TipChoice::Custom(Decimal::from(150)),
            1,
        )
        .unwrap_err();
        assert_eq!(err, TipError::InvalidPercent(Decimal::from(150)));
    }

    #[test]
    fn included_gratuity_adds_nothing_more() {
        let b = TipBreakdown::with_included_gratuity(Money::from_cents(6700), Money::from_cents(1459), 2)
            .unwrap();
        assert_eq!(b.total.to_cents(), 8159);
        assert_eq!(b.tip_percent, Decimal::from_str("21.78").unwrap());
        assert!(b.gratuity_included);
    }
}
