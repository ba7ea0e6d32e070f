use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::money::Money;
use crate::tip::TipBreakdown;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("History JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One saved calculation, as written to the host's key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub bill: Money,
    pub tip_percent: Decimal,
    pub tip: Money,
    pub total: Money,
    pub split: u32,
    pub per_person: Money,
    #[serde(default)]
    pub scanned_subtotal: Option<Money>,
    #[serde(default)]
    pub scanned_total: Option<Money>,
    #[serde(default)]
    pub included_gratuity: Option<Money>,
    #[serde(default)]
    pub included_gratuity_percent: Option<Decimal>,
}

impl BillRecord {
    pub fn from_breakdown(id: u64, created_at: DateTime<Utc>, b: &TipBreakdown) -> Self {
        Self {
            id,
            created_at,
            bill: b.bill,
            tip_percent: b.tip_percent,
            tip: b.tip,
            total: b.total,
            split: b.split,
            per_person: b.per_person,
            scanned_subtotal: None,
            scanned_total: None,
            included_gratuity: None,
            included_gratuity_percent: None,
        }
    }

    pub fn was_scanned(&self) -> bool {
        self.scanned_subtotal.is_some() || self.scanned_total.is_some()
    }
}

/// Bounded list of past calculations, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillHistory {
    capacity: usize,
    entries: VecDeque<BillRecord>,
}

impl Default for BillHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl BillHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Inserts at the front, evicting the oldest entry once full.
    pub fn push(&mut self, record: BillRecord) {
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &BillRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn next_id(&self) -> u64 {
        self.entries.iter().map(|r| r.id).max().map_or(1, |id| id + 1)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a stored history. A stored list longer than its capacity is
    /// trimmed to the newest entries.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let mut history: BillHistory = serde_json::from_str(json)?;
        history.capacity = history.capacity.max(1);
        history.entries.truncate(history.capacity);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tip::{Sentiment, TipChoice};
    use chrono::TimeZone;

    fn record(id: u64) -> BillRecord {
        let b = TipBreakdown::compute(Money::from_cents(5000), TipChoice::Preset(Sentiment::Okay), 2)
            .unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 19, 30, 0).unwrap();
        BillRecord::from_breakdown(id, at, &b)
    }

    #[test]
    fn push_keeps_newest_first_and_evicts() {
        let mut h = BillHistory::with_capacity(3);
        for id in 1..=5 {
            h.push(record(id));
        }
        let ids: Vec<u64> = h.entries().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(h.next_id(), 6);
    }

    #[test]
    fn json_roundtrip_preserves_entries() {
        let mut h = BillHistory::default();
        let mut r = record(1);
        r.scanned_total = Some(Money::from_cents(10170));
        h.push(r.clone());

        let back = BillHistory::from_json(&h.to_json().unwrap()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.entries().next().unwrap(), &r);
        assert!(back.entries().next().unwrap().was_scanned());
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(BillHistory::from_json("{not json").is_err());
    }

    #[test]
    fn empty_history_starts_at_one() {
        let mut h = BillHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.next_id(), 1);
        h.push(record(7));
        h.clear();
        assert!(h.is_empty());
    }
}
