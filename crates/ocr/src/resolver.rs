//! Reconciles the classified lines of successive OCR frames of one receipt
//! into a single subtotal / total / included-gratuity answer.

use tracing::{debug, trace};

use crate::classify::{self, has_label_keyword, mentions_gratuity};
use crate::config::ScannerConfig;
use crate::consensus::HistoryBuffer;
use crate::lines::{group_into_lines, Line};
use crate::noise::{self, Blacklist};
use crate::normalize::{self, money_amounts};
use crate::types::{AmountType, DetectedGratuity, ScannedBillAmounts, TextObservation};

/// How a frame's reading was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMethod {
    /// At least one labeled subtotal, total, or gratuity.
    Labeled,
    /// Unlabeled `subtotal + gratuity + tax ≈ total`.
    GratuitySum,
    /// Unlabeled `subtotal + tax ≈ total`.
    TaxSum,
    /// The two largest unlabeled amounts read as subtotal and total.
    TopPair,
    /// The two largest unlabeled amounts are one total read twice.
    DuplicateTotal,
    Nothing,
}

/// The best guess from a single frame, before cross-frame voting.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReading {
    pub subtotal: Option<f64>,
    pub total: Option<f64>,
    pub tax: Option<f64>,
    pub gratuity: Option<DetectedGratuity>,
    pub method: FrameMethod,
}

impl FrameReading {
    fn nothing() -> Self {
        Self { subtotal: None, total: None, tax: None, gratuity: None, method: FrameMethod::Nothing }
    }
}

/// Everything collected from one frame's surviving lines.
#[derive(Debug, Default)]
struct FrameScan {
    subtotals: Vec<f64>,
    totals: Vec<f64>,
    taxes: Vec<f64>,
    gratuity: Option<DetectedGratuity>,
    unlabeled: Vec<f64>,
    /// A label keyword with no usable number on its line.
    orphan_label: bool,
    gratuity_keyword: bool,
    gratuity_rate: Option<f64>,
}

/// Per-session resolver. Each scanning session owns a fresh instance, or
/// calls [`BillAmountResolver::clear`] before reuse on another receipt.
#[derive(Debug, Clone)]
pub struct BillAmountResolver {
    config: ScannerConfig,
    subtotals: HistoryBuffer<f64>,
    totals: HistoryBuffer<f64>,
    gratuities: HistoryBuffer<DetectedGratuity>,
    current: ScannedBillAmounts,
    last_notified: ScannedBillAmounts,
}

impl Default for BillAmountResolver {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}

impl BillAmountResolver {
    pub fn new(config: ScannerConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            config,
            subtotals: HistoryBuffer::new(capacity),
            totals: HistoryBuffer::new(capacity),
            gratuities: HistoryBuffer::new(capacity),
            current: ScannedBillAmounts::default(),
            last_notified: ScannedBillAmounts::default(),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// The most recent consensus.
    pub fn current(&self) -> &ScannedBillAmounts {
        &self.current
    }

    /// Forgets every frame seen so far.
    pub fn clear(&mut self) {
        self.subtotals.clear();
        self.totals.clear();
        self.gratuities.clear();
        self.current = ScannedBillAmounts::default();
        self.last_notified = ScannedBillAmounts::default();
    }

    /// Members of the winning cluster backing the consensus total, or the
    /// subtotal when no total has been seen.
    pub fn support(&self) -> usize {
        let tol = self.config.cluster_tolerance;
        self.totals
            .consensus(tol)
            .or_else(|| self.subtotals.consensus(tol))
            .map_or(0, |c| c.support)
    }

    /// Folds one frame into the session history and returns the updated consensus.
    pub fn resolve(&mut self, observations: &[TextObservation]) -> ScannedBillAmounts {
        let reading = self.analyze_frame(observations);
        trace!(?reading, "frame reading");

        if let Some(s) = reading.subtotal {
            self.subtotals.push(s);
        }
        if let Some(t) = reading.total {
            self.totals.push(t);
        }
        if let Some(g) = reading.gratuity {
            self.gratuities.push(g);
        }
        self.current = self.consensus();
        self.current.clone()
    }

    /// Like [`resolve`](Self::resolve), but yields the consensus only when it
    /// differs (at cent precision) from the last one yielded.
    pub fn process_frame(&mut self, observations: &[TextObservation]) -> Option<ScannedBillAmounts> {
        let consensus = self.resolve(observations);
        if consensus.same_as(&self.last_notified) {
            return None;
        }
        self.last_notified = consensus.clone();
        Some(consensus)
    }

    fn consensus(&self) -> ScannedBillAmounts {
        let tol = self.config.cluster_tolerance;
        let mut subtotal = self.subtotals.consensus(tol).map(|c| c.value);
        let mut total = self.totals.consensus(tol).map(|c| c.value);
        let gratuity = self.gratuities.consensus(tol).map(|c| DetectedGratuity {
            amount: c.value,
            percentage: c.representative.percentage,
            label: c.representative.label.clone(),
        });

        // Subtotal and total voted on separately can cross.
        if let (Some(s), Some(t)) = (subtotal, total) {
            if s > t {
                debug!(subtotal = s, total = t, "consensus subtotal above total, swapping");
                std::mem::swap(&mut subtotal, &mut total);
            }
        }
        ScannedBillAmounts { subtotal, total, gratuity }
    }

    /// Reads one frame in isolation. Pure: history is untouched.
    pub fn analyze_frame(&self, observations: &[TextObservation]) -> FrameReading {
        let lines = group_into_lines(observations, self.config.line_y_tolerance);
        let scan = self.scan_lines(&lines);
        self.reading_from_scan(scan)
    }

    fn scan_lines(&self, lines: &[Line]) -> FrameScan {
        let min = self.config.min_bill_amount;

        let mut blacklist = Blacklist::default();
        let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
        for line in lines {
            let text = line.text.as_str();
            if noise::is_decoy_line(text) {
                debug!(text, "suppressing suggested-tip line");
                blacklist.add_line(text);
            } else if noise::is_item_line(text) {
                trace!(text, "skipping item line");
            } else {
                kept.push(text);
            }
        }

        let mut scan = FrameScan::default();
        for text in kept {
            if mentions_gratuity(text) {
                scan.gratuity_keyword = true;
                scan.gratuity_rate = scan.gratuity_rate.or_else(|| normalize::percentage(text));
            }

            let Some(label) = classify::find_label(text) else {
                scan.unlabeled.extend(
                    money_amounts(text)
                        .iter()
                        .map(|m| m.value)
                        .filter(|v| !blacklist.contains(*v)),
                );
                if has_label_keyword(text) {
                    scan.orphan_label = true;
                }
                continue;
            };

            let Some(value) = classify::amount_after_label(text, &label) else {
                scan.orphan_label = true;
                continue;
            };
            if blacklist.contains(value) {
                trace!(text, value, "amount belongs to a suggested-tip line");
                continue;
            }

            match label.amount_type {
                AmountType::Subtotal | AmountType::Total if value < min => {
                    trace!(text, value, "below minimum bill amount");
                }
                AmountType::Subtotal => scan.subtotals.push(value),
                AmountType::Total => scan.totals.push(value),
                AmountType::Tax => scan.taxes.push(value),
                AmountType::Gratuity => {
                    if scan.gratuity.is_none() {
                        scan.gratuity = Some(DetectedGratuity {
                            amount: value,
                            percentage: normalize::percentage(text),
                            label: text[label.start..label.end].trim().to_string(),
                        });
                    }
                }
                AmountType::Unlabeled => scan.unlabeled.push(value),
            }
        }
        scan
    }

    fn reading_from_scan(&self, scan: FrameScan) -> FrameReading {
        let cfg = &self.config;
        let mut subtotal = scan.subtotals.first().copied();
        let total = scan.totals.iter().copied().reduce(f64::max);

        if let (Some(s), Some(t)) = (subtotal, total) {
            if s > t {
                let single_pair = scan.subtotals.len() == 1 && scan.totals.len() == 1;
                let ratio = s / t;
                if single_pair && ratio >= cfg.swap_band_min && ratio <= cfg.swap_band_max {
                    debug!(subtotal = s, total = t, "labels look swapped, correcting");
                    return FrameReading {
                        subtotal: Some(t),
                        total: Some(s),
                        tax: scan.taxes.first().copied(),
                        gratuity: scan.gratuity,
                        method: FrameMethod::Labeled,
                    };
                }
                debug!(subtotal = s, total = t, "subtotal exceeds total, dropping subtotal");
                subtotal = None;
            }
        }

        if subtotal.is_some() || total.is_some() || scan.gratuity.is_some() {
            return FrameReading {
                subtotal,
                total,
                tax: scan.taxes.first().copied(),
                gratuity: scan.gratuity,
                method: FrameMethod::Labeled,
            };
        }

        if scan.orphan_label && !scan.unlabeled.is_empty() {
            return self.fallback(&scan);
        }
        FrameReading::nothing()
    }

    /// Labels were seen but OCR split them from their values. Infer roles
    /// from how the unlabeled amounts add up.
    fn fallback(&self, scan: &FrameScan) -> FrameReading {
        let cfg = &self.config;
        let readings = descending(&scan.unlabeled);
        let amounts = distinct(&readings);
        let Some(&max) = amounts.first() else {
            return FrameReading::nothing();
        };
        let rest = &amounts[1..];
        let within_sum = |sum: f64| ((sum - max) / max).abs() <= cfg.sum_tolerance;

        if scan.gratuity_keyword {
            let mut best: Option<(f64, f64, f64, f64)> = None;
            for (i, &s) in rest.iter().enumerate() {
                let share = s / max;
                if !(share > cfg.subtotal_share_min && share < cfg.subtotal_share_max) {
                    continue;
                }
                for (j, &g) in rest.iter().enumerate() {
                    let rate = g / s;
                    if i == j || rate < cfg.gratuity_rate_min || rate > cfg.gratuity_rate_max {
                        continue;
                    }
                    for (k, &t) in rest.iter().enumerate() {
                        if k == i || k == j {
                            continue;
                        }
                        let sum = s + g + t;
                        let err = ((sum - max) / max).abs();
                        if within_sum(sum) && best.map_or(true, |b| err < b.3) {
                            best = Some((s, g, t, err));
                        }
                    }
                }
            }
            if let Some((s, g, t, _)) = best {
                debug!(subtotal = s, gratuity = g, tax = t, total = max, "gratuity sum fallback");
                return FrameReading {
                    subtotal: Some(s),
                    total: Some(max),
                    tax: Some(t),
                    gratuity: Some(DetectedGratuity {
                        amount: g,
                        percentage: scan.gratuity_rate,
                        label: "Gratuity".to_string(),
                    }),
                    method: FrameMethod::GratuitySum,
                };
            }
        }

        let mut best: Option<(f64, f64, f64)> = None;
        for (i, &s) in rest.iter().enumerate() {
            for (j, &t) in rest.iter().enumerate() {
                let rate = t / s;
                if i == j || rate < cfg.tax_rate_min || rate > cfg.tax_rate_max {
                    continue;
                }
                let sum = s + t;
                let err = ((sum - max) / max).abs();
                if within_sum(sum) && best.map_or(true, |b| err < b.2) {
                    best = Some((s, t, err));
                }
            }
        }
        if let Some((s, t, _)) = best {
            if s >= cfg.min_bill_amount {
                debug!(subtotal = s, tax = t, total = max, "tax sum fallback");
                return FrameReading {
                    subtotal: Some(s),
                    total: Some(max),
                    tax: Some(t),
                    gratuity: None,
                    method: FrameMethod::TaxSum,
                };
            }
        }

        // Undeduplicated: a total read twice is two equal readings here.
        let Some(&second) = readings.get(1) else {
            return FrameReading::nothing();
        };
        if max < cfg.min_bill_amount {
            return FrameReading::nothing();
        }
        let ratio = second / max;
        if ratio > cfg.duplicate_ratio {
            debug!(total = max, "two largest amounts agree, reading as one total");
            FrameReading {
                total: Some(max),
                method: FrameMethod::DuplicateTotal,
                ..FrameReading::nothing()
            }
        } else if ratio > cfg.pair_ratio_min
            && ratio < cfg.duplicate_ratio
            && second >= cfg.min_bill_amount
        {
            debug!(subtotal = second, total = max, "top pair fallback");
            FrameReading {
                subtotal: Some(second),
                total: Some(max),
                method: FrameMethod::TopPair,
                ..FrameReading::nothing()
            }
        } else {
            FrameReading::nothing()
        }
    }
}

fn descending(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
}

/// `sorted` with near-identical readings (under half a cent apart) collapsed.
fn distinct(sorted: &[f64]) -> Vec<f64> {
    let mut out = sorted.to_vec();
    out.dedup_by(|a, b| (*a - *b).abs() < 0.005);
    out
}

/// Single-shot scan of one captured document image.
pub fn resolve_document(observations: &[TextObservation], config: ScannerConfig) -> ScannedBillAmounts {
    BillAmountResolver::new(config).resolve(observations)
}
