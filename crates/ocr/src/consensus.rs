use std::collections::VecDeque;

use crate::types::DetectedGratuity;

/// Values that can be voted on by amount.
pub trait Reading {
    fn amount(&self) -> f64;
}

impl Reading for f64 {
    fn amount(&self) -> f64 {
        *self
    }
}

impl Reading for DetectedGratuity {
    fn amount(&self) -> f64 {
        self.amount
    }
}

/// The winning cluster of a history buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus<'a, T> {
    /// Running-average centroid of the cluster.
    pub value: f64,
    /// Number of readings in the cluster.
    pub support: usize,
    /// Earliest reading that founded the cluster.
    pub representative: &'a T,
}

/// Fixed-capacity FIFO of recent per-frame readings.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    capacity: usize,
    readings: VecDeque<T>,
}

impl<T: Reading> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, readings: VecDeque::with_capacity(capacity) }
    }

    /// Appends a reading, evicting the oldest once full.
    pub fn push(&mut self, reading: T) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.readings.iter()
    }

    /// Greedy clustering in arrival order: each reading joins the first
    /// cluster whose centroid is within `tolerance`, else founds a new one.
    /// The largest cluster wins; on a tie the earlier-founded one does.
    pub fn consensus(&self, tolerance: f64) -> Option<Consensus<'_, T>> {
        let mut clusters: Vec<(f64, usize, &T)> = Vec::new();
        for reading in &self.readings {
            let amount = reading.amount();
            let joined = clusters
                .iter()
                .position(|(centroid, _, _)| (amount - centroid).abs() <= tolerance + 1e-9);
            match joined {
                Some(i) => {
                    let (centroid, count, _) = &mut clusters[i];
                    *count += 1;
                    *centroid += (amount - *centroid) / *count as f64;
                }
                None => clusters.push((amount, 1, reading)),
            }
        }

        let mut best: Option<(f64, usize, &T)> = None;
        for &(value, support, representative) in &clusters {
            if best.map_or(true, |(_, count, _)| support > count) {
                best = Some((value, support, representative));
            }
        }
        best.map(|(value, support, representative)| Consensus { value, support, representative })
    }
}
