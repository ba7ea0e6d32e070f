use serde::{Deserialize, Serialize};
use std::fmt;
use tipjar_core::{BillRecord, Money};

/// Normalized (0.0–1.0) position of a recognized token, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

fn full_confidence() -> f32 {
    1.0
}

/// One OCR-recognized line or token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    /// Recognizer confidence (0.0–1.0).
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

impl TextObservation {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), bounding_box: None, confidence: 1.0 }
    }

    pub fn with_box(text: impl Into<String>, bounding_box: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounding_box: Some(bounding_box),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// One box-less observation per non-blank line of `text`.
    pub fn from_lines(text: &str) -> Vec<Self> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Self::new)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    Subtotal,
    Total,
    Tax,
    Gratuity,
    Unlabeled,
}

impl fmt::Display for AmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountType::Subtotal => write!(f, "subtotal"),
            AmountType::Total => write!(f, "total"),
            AmountType::Tax => write!(f, "tax"),
            AmountType::Gratuity => write!(f, "gratuity"),
            AmountType::Unlabeled => write!(f, "unlabeled"),
        }
    }
}

/// A classified line with its positive amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedAmount {
    pub value: f64,
    #[serde(rename = "type")]
    pub amount_type: AmountType,
}

/// Gratuity or service charge already included in the receipt total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedGratuity {
    pub amount: f64,
    pub percentage: Option<f64>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannedBillAmounts {
    pub subtotal: Option<f64>,
    pub total: Option<f64>,
    pub gratuity: Option<DetectedGratuity>,
}

impl ScannedBillAmounts {
    /// Nothing has been determined yet ("scan not yet successful").
    pub fn is_empty(&self) -> bool {
        self.subtotal.is_none() && self.total.is_none() && self.gratuity.is_none()
    }

    /// The amount a tip is computed on: the subtotal when known, else the total.
    pub fn bill_amount(&self) -> Option<Money> {
        self.subtotal.or(self.total).and_then(Money::from_f64)
    }

    /// Equal at cent precision. Consensus centroids drift by fractions of a
    /// cent between frames; those are not changes worth reporting.
    pub fn same_as(&self, other: &ScannedBillAmounts) -> bool {
        fn cents(v: Option<f64>) -> Option<i64> {
            v.and_then(Money::from_f64).map(Money::to_cents)
        }
        let gratuity_eq = match (&self.gratuity, &other.gratuity) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                cents(Some(a.amount)) == cents(Some(b.amount))
                    && cents(a.percentage) == cents(b.percentage)
                    && a.label == b.label
            }
            _ => false,
        };
        cents(self.subtotal) == cents(other.subtotal)
            && cents(self.total) == cents(other.total)
            && gratuity_eq
    }

    /// Merges the scanned fields into a saved bill record. Fields this scan
    /// did not determine are left as they were.
    pub fn apply_to(&self, record: &mut BillRecord) {
        if let Some(s) = self.subtotal.and_then(Money::from_f64) {
            record.scanned_subtotal = Some(s);
        }
        if let Some(t) = self.total.and_then(Money::from_f64) {
            record.scanned_total = Some(t);
        }
        if let Some(g) = &self.gratuity {
            record.included_gratuity = Money::from_f64(g.amount);
            record.included_gratuity_percent = g
                .percentage
                .and_then(Money::from_f64)
                .map(Money::as_decimal);
        }
    }
}
