use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse scanner config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid scanner config: {0}")]
    Invalid(String),
}

/// Tunable thresholds for receipt amount extraction.
///
/// The ratio bands were fitted by hand against a small set of sample
/// receipts. Every field can be overridden from TOML; missing keys keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Frames remembered per amount for consensus voting.
    pub history_capacity: usize,
    /// Absolute distance (currency units) within which readings share a cluster.
    pub cluster_tolerance: f64,
    /// Subtotal/total readings below this are discarded as line-item prices.
    pub min_bill_amount: f64,

    /// A subtotal larger than its total is treated as an OCR label swap when
    /// it lies within this fraction band of the total.
    pub swap_band_min: f64,
    pub swap_band_max: f64,

    /// Relative tolerance for `parts ≈ max` sums in the unlabeled fallback.
    pub sum_tolerance: f64,
    pub gratuity_rate_min: f64,
    pub gratuity_rate_max: f64,
    pub tax_rate_min: f64,
    pub tax_rate_max: f64,
    /// Open interval for subtotal / total when a gratuity triple is searched.
    pub subtotal_share_min: f64,
    pub subtotal_share_max: f64,
    /// Second-largest / largest above this (exclusive) reads as subtotal/total.
    pub pair_ratio_min: f64,
    /// Above this the two largest amounts are the same total read twice.
    pub duplicate_ratio: f64,

    /// Vertical distance (normalized units) within which boxes share a line.
    pub line_y_tolerance: f32,
    /// Members the winning cluster needs before a session reports a consensus.
    pub stable_frames: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 5,
            cluster_tolerance: 0.10,
            min_bill_amount: 5.0,
            swap_band_min: 0.80,
            swap_band_max: 1.50,
            sum_tolerance: 0.05,
            gratuity_rate_min: 0.10,
            gratuity_rate_max: 0.35,
            tax_rate_min: 0.03,
            tax_rate_max: 0.25,
            subtotal_share_min: 0.5,
            subtotal_share_max: 0.95,
            pair_ratio_min: 0.80,
            duplicate_ratio: 0.98,
            line_y_tolerance: 0.012,
            stable_frames: 3,
        }
    }
}

impl ScannerConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
        }
        if self.stable_frames == 0 || self.stable_frames > self.history_capacity {
            return Err(ConfigError::Invalid(format!(
                "stable_frames must be between 1 and history_capacity ({})",
                self.history_capacity
            )));
        }
        let bands = [
            ("swap_band", self.swap_band_min, self.swap_band_max),
            ("gratuity_rate", self.gratuity_rate_min, self.gratuity_rate_max),
            ("tax_rate", self.tax_rate_min, self.tax_rate_max),
            ("subtotal_share", self.subtotal_share_min, self.subtotal_share_max),
            ("pair_ratio", self.pair_ratio_min, self.duplicate_ratio),
        ];
        for (name, min, max) in bands {
            if !(min >= 0.0 && min < max) {
                return Err(ConfigError::Invalid(format!(
                    "{name} range is empty: {min}..{max}"
                )));
            }
        }
        if self.cluster_tolerance < 0.0 || self.sum_tolerance < 0.0 || self.line_y_tolerance < 0.0 {
            return Err(ConfigError::Invalid("tolerances must be non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ScannerConfig::default().validate().is_ok());
    }

    #[test]
    fn from_toml_overrides_only_given_keys() {
        let cfg = ScannerConfig::from_toml("tax_rate_max = 0.30\nstable_frames = 2\n").unwrap();
        assert_eq!(cfg.tax_rate_max, 0.30);
        assert_eq!(cfg.stable_frames, 2);
        assert_eq!(cfg.history_capacity, 5);
        assert_eq!(cfg.cluster_tolerance, 0.10);
    }

    #[test]
    fn from_toml_empty_is_default() {
        assert_eq!(ScannerConfig::from_toml("").unwrap(), ScannerConfig::default());
    }

    #[test]
    fn from_toml_rejects_bad_syntax() {
        assert!(matches!(
            ScannerConfig::from_toml("tax_rate_max = ="),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_band() {
        let err = ScannerConfig::from_toml("gratuity_rate_min = 0.5\ngratuity_rate_max = 0.2").unwrap_err();
        assert!(err.to_string().contains("gratuity_rate"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let cfg = ScannerConfig { history_capacity: 0, ..ScannerConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
