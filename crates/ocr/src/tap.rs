//! Tap-to-select: the user taps one recognized line instead of waiting for
//! the live scan to settle.

use crate::classify::parse_line;
use crate::config::ScannerConfig;
use crate::types::ParsedAmount;

/// Reads a tapped line with the default minimum bill amount.
pub fn parse_tapped(text: &str) -> Option<ParsedAmount> {
    parse_tapped_with(text, &ScannerConfig::default())
}

pub fn parse_tapped_with(text: &str, config: &ScannerConfig) -> Option<ParsedAmount> {
    parse_line(text.trim(), config.min_bill_amount)
}
