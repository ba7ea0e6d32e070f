//! Lines that carry prices but are never the bill's subtotal, total, or
//! gratuity: printed "suggested additional tip" tables and menu items.

use crate::classify::mentions_gratuity;
use crate::normalize::money_amounts;

re!(re_tip_row, r"^\s*(?:15|18|20|22|25|30)\s*%");
re!(re_item_start, r"^\s*[1-9]\s+[A-Za-z]");
re!(re_trailing_price, r"\d+[.,]\d{2}\s*$");

/// Header of a suggested-tip table, e.g. `"TIP   AMOUNT   TOTAL"`.
pub fn is_tip_table_header(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    let columns = upper.contains("TIP") && upper.contains("AMOUNT") && upper.contains("TOTAL");
    let suggestion = upper.contains("SUGGESTED") && (upper.contains("TIP") || upper.contains("GRATUITY"));
    columns || suggestion || upper.contains("TIP GUIDE")
}

/// A row of a suggested-tip table, e.g. `"18%   $6.66   $44.78"`.
pub fn is_tip_table_row(text: &str) -> bool {
    let amounts = money_amounts(text);
    if amounts.is_empty() {
        return false;
    }
    // "18% Gratuity $15.00" is a real charge that happens to lead with its rate.
    if re_tip_row().is_match(text) && !mentions_gratuity(text) {
        return true;
    }
    amounts.len() >= 2 && text.contains('%')
}

pub fn is_decoy_line(text: &str) -> bool {
    is_tip_table_header(text) || is_tip_table_row(text)
}

/// A menu line such as `"2 Burger 24.00"`: small quantity, name, price.
pub fn is_item_line(text: &str) -> bool {
    re_item_start().is_match(text) && re_trailing_price().is_match(text)
}

/// Values seen on decoy lines within one frame.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    values: Vec<f64>,
}

impl Blacklist {
    /// Half a cent: two readings of the same printed value compare equal.
    const EPSILON: f64 = 0.005;

    pub fn add_line(&mut self, text: &str) {
        self.values.extend(money_amounts(text).iter().map(|m| m.value));
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values.iter().any(|v| (v - value).abs() < Self::EPSILON)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
