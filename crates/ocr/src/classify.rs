//! Label classification: which kind of amount a receipt line carries.
//!
//! Rules are tried in order against the ASCII-uppercased line and the first
//! match wins. Order is significant: `SUBTOTAL` contains `TOTAL`, and
//! `TOTAL TAX` must read as tax, so subtotal and tax come before total.
//! Tax still yields to the explicit total labels (`TOTAL DUE`, `GRAND TOTAL`)
//! so a total that mentions included tax keeps its meaning.

use regex::Regex;
use tracing::trace;

use crate::normalize::{self, money_amounts};
use crate::types::{AmountType, DetectedGratuity, ParsedAmount};

re!(re_subtotal,
    r"SUB[\s\-]*T[O0]T(?:AL|L|AI)?|F[O0]{2}D\s*T[O0]TAL|PRE[\s\-]*TAX|BEFORE\s+TAX");
re!(re_tax,
    r"TOTAL\s+TAX(?:ES)?|SALES\s+TAX|STATE\s+TAX|\bTAX(?:ES)?\b|\b(?:HST|GST|PST|QST|VAT)\b|SURCHARGE|CARD\s+FEE|CC\s+FEE");
re!(re_gratuity,
    r"AUTO[\s\-]*GRAT(?:UITY)?|GRATUITY|GRATUTIY|GRATU1TY|GRATUITV|\bGRAT\b|TIP\s+INCLUDED|TIP\s+ADDED|SERVICE\s+(?:CHARGE|FEE)|SVC\.?\s*(?:CHARGE|CHRG|FEE)");
re!(re_total_explicit,
    r"T[O0]TAL\s+DUE|AMOUNT\s+DUE|BALANCE\s+DUE|GRAND\s+T[O0]TAL|CREDIT\s+CARD\s+AUTH");
re!(re_total_bare, r"\bT[O0]TAL\b");
re!(re_total_generic,
    r"\bAMOUNT\b|\bBALANCE\b|\bDUE\b|TOTL|\bTTAL\b|TOTAI|AMMOUNT|AMONT|AM0UNT|\bAMT\b|BALANC|BALANSE|BAIANCE");
re!(re_contains_tax, r"TAX");

/// One entry of the ordered label cascade.
pub struct LabelRule {
    pub name: &'static str,
    pub amount_type: AmountType,
    pattern: fn() -> &'static Regex,
    /// The rule is skipped when this also matches the line.
    excluded_by: Option<fn() -> &'static Regex>,
    /// A keyword hit without a price on the line stops the cascade as
    /// unlabeled instead of falling through.
    requires_amount: bool,
}

impl LabelRule {
    fn find(&self, upper: &str) -> Option<(usize, usize)> {
        let m = (self.pattern)().find(upper)?;
        if self.excluded_by.is_some_and(|ex| ex().is_match(upper)) {
            return None;
        }
        Some((m.start(), m.end()))
    }
}

pub static RULES: [LabelRule; 6] = [
    LabelRule {
        name: "subtotal",
        amount_type: AmountType::Subtotal,
        pattern: re_subtotal,
        excluded_by: None,
        requires_amount: false,
    },
    LabelRule {
        name: "tax",
        amount_type: AmountType::Tax,
        pattern: re_tax,
        // "AMOUNT DUE (incl. VAT)" is the total, not the tax.
        excluded_by: Some(re_total_explicit as fn() -> &'static Regex),
        requires_amount: false,
    },
    LabelRule {
        name: "gratuity",
        amount_type: AmountType::Gratuity,
        pattern: re_gratuity,
        excluded_by: None,
        requires_amount: true,
    },
    LabelRule {
        name: "total-explicit",
        amount_type: AmountType::Total,
        pattern: re_total_explicit,
        excluded_by: None,
        requires_amount: false,
    },
    LabelRule {
        name: "total",
        amount_type: AmountType::Total,
        pattern: re_total_bare,
        excluded_by: Some(re_contains_tax as fn() -> &'static Regex),
        requires_amount: false,
    },
    LabelRule {
        name: "total-generic",
        amount_type: AmountType::Total,
        pattern: re_total_generic,
        excluded_by: None,
        requires_amount: false,
    },
];

/// Where a label sits in a line and what it means.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatch {
    pub amount_type: AmountType,
    pub rule: &'static str,
    /// Byte offsets of the label in the original line.
    pub start: usize,
    pub end: usize,
}

/// Runs the rule cascade. `None` means the line is unlabeled.
pub fn find_label(text: &str) -> Option<LabelMatch> {
    // ASCII uppercasing keeps byte offsets valid for the original text.
    let upper = text.to_ascii_uppercase();
    for rule in &RULES {
        let Some((start, end)) = rule.find(&upper) else {
            continue;
        };
        if rule.requires_amount && money_amounts(text).is_empty() {
            trace!(rule = rule.name, text, "label without amount");
            return None;
        }
        return Some(LabelMatch { amount_type: rule.amount_type, rule: rule.name, start, end });
    }
    None
}

pub fn classify(text: &str) -> AmountType {
    find_label(text).map_or(AmountType::Unlabeled, |m| m.amount_type)
}

/// Whether any label keyword occurs, ignoring the gratuity amount guard.
/// Used to notice labels that OCR split away from their values.
pub fn has_label_keyword(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    RULES.iter().any(|r| r.find(&upper).is_some())
}

pub fn mentions_gratuity(text: &str) -> bool {
    re_gratuity().is_match(&text.to_ascii_uppercase())
}

/// The amount belonging to `label`: the first price after the label, so
/// `"Gratuity 18%: $15.00"` reads 15.00 rather than 18. Falls back to the
/// normalizer on the line with its rates removed.
pub fn amount_after_label(text: &str, label: &LabelMatch) -> Option<f64> {
    money_amounts(&text[label.end..])
        .first()
        .map(|m| m.value)
        .or_else(|| normalize::normalize(&normalize::strip_percentages(text)))
}

/// Classifies and normalizes one line. Subtotals and totals under
/// `min_bill_amount` are dropped as implausible.
pub fn parse_line(text: &str, min_bill_amount: f64) -> Option<ParsedAmount> {
    let (value, amount_type) = match find_label(text) {
        Some(label) => (amount_after_label(text, &label)?, label.amount_type),
        None => (normalize::normalize(text)?, AmountType::Unlabeled),
    };
    if matches!(amount_type, AmountType::Subtotal | AmountType::Total) && value < min_bill_amount {
        trace!(%amount_type, value, "below minimum bill amount");
        return None;
    }
    Some(ParsedAmount { value, amount_type })
}

/// Reads an included gratuity line, e.g. `"Gratuity (20.00%) $14.59"`.
pub fn detect_gratuity(text: &str) -> Option<DetectedGratuity> {
    let label = find_label(text).filter(|m| m.amount_type == AmountType::Gratuity)?;
    let amount = amount_after_label(text, &label)?;
    Some(DetectedGratuity {
        amount,
        percentage: normalize::percentage(text),
        label: text[label.start..label.end].trim().to_string(),
    })
}
