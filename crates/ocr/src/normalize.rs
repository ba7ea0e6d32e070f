use regex::Regex;
use std::sync::OnceLock;

const CURRENCY_SYMBOLS: [&str; 7] = ["$", "€", "£", "¥", "₹", "kr", "CHF"];

const LABEL_WORDS: &[&str] = &[
    "total", "subtotal", "sub total", "amount", "due", "balance", "grand", "food",
    "pretax", "gratuity", "service charge", "service fee", "svc", "auto grat", "tip",
    "included", "added",
];

// Thermal print + OCR swaps 0/O and 1/I/l and drops doubled letters.
const LABEL_MISREADS: &[&str] = &[
    "subt0tal", "subtotl", "t0tal", "totl", "ttal", "totai", "ammount", "am0unt",
    "amont", "balanse", "baiance", "balanc", "gratutiy", "gratu1ty", "f00d", "svc chrg",
];

fn re_label_words() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        let mut words: Vec<&str> = LABEL_WORDS.iter().chain(LABEL_MISREADS).copied().collect();
        // Longest first so "subtotal" is removed whole rather than leaving "sub".
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i)(?:{alternation}|:)")).expect("invalid regex")
    })
}

re!(re_number, r"\d+(?:\.\d+)?");
re!(re_money, r"((?:[$€£¥₹]|\b(?:kr|KR|Kr|CHF))\s*)?(\d[\d,]*(?:\.\d{1,2})?)");
re!(re_two_decimals, r"[.,]\d{2}$");
re!(re_percentage, r"(\d{1,3}(?:\.\d+)?)\s*%");

/// Converts a raw token such as `"Total: $45.50"` or `"€ 123,45"` into a
/// positive amount. Never panics; every failure is `None`.
pub fn normalize(text: &str) -> Option<f64> {
    let mut s = text.to_string();
    for symbol in CURRENCY_SYMBOLS {
        s = s.replace(symbol, "");
    }
    let s = re_label_words().replace_all(&s, "");
    let s = disambiguate_separators(s.trim());
    let m = re_number().find(&s)?;
    parse_positive(m.as_str())
}

/// A comma with no period is a decimal comma only for `"45,50"`-shaped
/// input; everywhere else commas are thousands separators.
fn disambiguate_separators(s: &str) -> String {
    if !s.contains(',') {
        return s.to_string();
    }
    if !s.contains('.') {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 2 {
            let fraction_digits = parts[1].chars().take_while(char::is_ascii_digit).count();
            if (1..=2).contains(&fraction_digits) {
                return s.replacen(',', ".", 1);
            }
        }
    }
    s.replace(',', "")
}

fn parse_positive(s: &str) -> Option<f64> {
    let value: f64 = s.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// A price-shaped token found inside a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountMatch {
    /// Byte offsets of the whole token, currency symbol included.
    pub start: usize,
    pub end: usize,
    pub value: f64,
    pub has_currency: bool,
}

/// Every price-shaped token in `text`, left to right: numbers carrying a
/// currency symbol, or numbers with exactly two decimals. Numbers followed
/// by `%` are rates, not prices, and are skipped, as are zero values.
pub fn money_amounts(text: &str) -> Vec<AmountMatch> {
    re_money()
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let number = c.get(2)?.as_str().trim_end_matches(',');
            let has_currency = c.get(1).is_some();
            if !has_currency && !re_two_decimals().is_match(number) {
                return None;
            }
            if text[whole.end()..].trim_start().starts_with('%') {
                return None;
            }
            let value = parse_positive(&disambiguate_separators(number))?;
            Some(AmountMatch { start: whole.start(), end: whole.end(), value, has_currency })
        })
        .collect()
}

/// The first `NN%` rate in `text`, e.g. `20.0` for `"Gratuity (20.00%)"`.
pub fn percentage(text: &str) -> Option<f64> {
    let c = re_percentage().captures(text)?;
    let value: f64 = c.get(1)?.as_str().parse().ok()?;
    (value > 0.0 && value <= 100.0).then_some(value)
}

/// `text` with every `NN%` rate removed.
pub fn strip_percentages(text: &str) -> String {
    re_percentage().replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn plain_and_labeled() {
        assert!(close(normalize("45.50"), 45.50));
        assert!(close(normalize("Total: $45.50"), 45.50));
        assert!(close(normalize("TOTAL DUE: $87.32"), 87.32));
        assert!(close(normalize("Subtotal 35.00"), 35.00));
    }

    #[test]
    fn ocr_misread_labels_are_stripped() {
        assert!(close(normalize("T0TAL: $87.32"), 87.32));
        assert!(close(normalize("T0TAL DUE: $87.32"), 87.32));
        assert!(close(normalize("AM0UNT 12.00"), 12.00));
        assert!(close(normalize("SUBT0TAL 9.99"), 9.99));
        assert!(close(normalize("F00D TOTAL 40.00"), 40.00));
    }

    #[test]
    fn every_currency_symbol() {
        for symbol in CURRENCY_SYMBOLS {
            assert!(close(normalize(&format!("{symbol}45.50")), 45.50), "symbol {symbol}");
        }
        assert!(close(normalize("€ 123,45"), 123.45));
    }

    #[test]
    fn separators() {
        assert!(close(normalize("45,50"), 45.50));
        assert!(close(normalize("1,234"), 1234.0));
        assert!(close(normalize("1,234.56"), 1234.56));
        assert!(close(normalize("1,234,567"), 1234567.0));
    }

    #[test]
    fn zero_and_garbage_rejected() {
        assert_eq!(normalize("0"), None);
        assert_eq!(normalize("0.00"), None);
        assert_eq!(normalize("Total:"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("!@#$%^&*()\n\0\x01"), None);
    }

    #[test]
    fn idempotent_on_clean_strings() {
        for s in ["0.01", "7", "45.5", "101.70", "1234.56"] {
            let once = normalize(s).unwrap();
            let twice = normalize(&once.to_string()).unwrap();
            assert_eq!(once, twice, "input {s}");
            assert_eq!(once, s.parse::<f64>().unwrap());
        }
    }

    #[test]
    fn absurdly_long_numbers_do_not_panic() {
        let long = "9".repeat(400);
        assert!(normalize(&long).map_or(true, |v| v.is_finite()));
    }

    // ── money_amounts ─────────────────────────────────────────────────────────

    #[test]
    fn money_amounts_skips_rates_and_bare_integers() {
        let found: Vec<f64> = money_amounts("Gratuity (20.00%) $14.59").iter().map(|m| m.value).collect();
        assert_eq!(found, vec![14.59]);

        let found: Vec<f64> = money_amounts("18%   $6.66   $44.78").iter().map(|m| m.value).collect();
        assert_eq!(found, vec![6.66, 44.78]);

        assert!(money_amounts("Table 12 Guests 4").is_empty());
        assert!(money_amounts("T0TAL").is_empty());
    }

    #[test]
    fn money_amounts_reads_decimal_comma_and_thousands() {
        let found: Vec<f64> = money_amounts("Summe 45,50").iter().map(|m| m.value).collect();
        assert_eq!(found, vec![45.50]);
        let found: Vec<f64> = money_amounts("TOTAL $1,234.56").iter().map(|m| m.value).collect();
        assert_eq!(found, vec![1234.56]);
    }

    #[test]
    fn money_amounts_reads_multi_letter_currencies() {
        let m = money_amounts("Service Charge CHF 45");
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].value, 45.0);
        assert!(m[0].has_currency);
        assert_eq!(money_amounts("Drikkepenger kr 30")[0].value, 30.0);
        assert!(money_amounts("Kraft 12").is_empty());
    }

    #[test]
    fn money_amounts_offsets_cover_symbol() {
        let text = "Total: $45.50";
        let m = money_amounts(text)[0];
        assert_eq!(&text[m.start..m.end], "$45.50");
        assert!(m.has_currency);
    }

    // ── percentage ────────────────────────────────────────────────────────────

    #[test]
    fn percentage_extraction() {
        assert_eq!(percentage("Gratuity (20.00%) $14.59"), Some(20.0));
        assert_eq!(percentage("Gratuity 18%: $15.00"), Some(18.0));
        assert_eq!(percentage("Gratuity $15.00"), None);
        assert_eq!(strip_percentages("Gratuity 18%: $15.00").trim(), "Gratuity  : $15.00");
    }
}
