use std::fmt;

use tracing::{info, warn};

use crate::config::ScannerConfig;
use crate::resolver::BillAmountResolver;
use crate::types::{ScannedBillAmounts, TextObservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    /// The winning cluster has enough support to show to the user.
    ConsensusFound,
    Dismissed,
}

type ChangeCallback = Box<dyn FnMut(&ScannedBillAmounts) + Send>;

/// One receipt-scanning session: owns its resolver, tracks the scan state
/// and forwards change notifications.
pub struct ScanSession {
    resolver: BillAmountResolver,
    state: ScanState,
    on_change: Option<ChangeCallback>,
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("state", &self.state)
            .field("current", self.resolver.current())
            .finish_non_exhaustive()
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}

impl ScanSession {
    pub fn new(config: ScannerConfig) -> Self {
        Self { resolver: BillAmountResolver::new(config), state: ScanState::Idle, on_change: None }
    }

    /// Registers a callback run on every change notification.
    pub fn on_change(mut self, f: impl FnMut(&ScannedBillAmounts) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn current(&self) -> &ScannedBillAmounts {
        self.resolver.current()
    }

    pub fn start(&mut self) {
        if self.state == ScanState::Idle {
            self.transition(ScanState::Scanning);
        }
    }

    /// Feeds one OCR frame. Returns the new consensus when it changed.
    pub fn submit_frame(&mut self, observations: &[TextObservation]) -> Option<ScannedBillAmounts> {
        match self.state {
            ScanState::Dismissed => {
                warn!("frame submitted to a dismissed session, ignoring");
                return None;
            }
            ScanState::Idle => self.start(),
            ScanState::Scanning | ScanState::ConsensusFound => {}
        }

        let update = self.resolver.process_frame(observations);
        if self.state == ScanState::Scanning
            && self.resolver.support() >= self.resolver.config().stable_frames
        {
            self.transition(ScanState::ConsensusFound);
        }
        if let (Some(update), Some(callback)) = (&update, self.on_change.as_mut()) {
            callback(update);
        }
        update
    }

    /// User closed the scanner; later frames are ignored until [`reset`](Self::reset).
    pub fn dismiss(&mut self) {
        if self.state != ScanState::Dismissed {
            self.transition(ScanState::Dismissed);
        }
    }

    /// Forgets all history and returns to `Idle`.
    pub fn reset(&mut self) {
        self.resolver.clear();
        if self.state != ScanState::Idle {
            self.transition(ScanState::Idle);
        }
    }

    fn transition(&mut self, next: ScanState) {
        info!(from = ?self.state, to = ?next, "scan session state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn frame(text: &str) -> Vec<TextObservation> {
        TextObservation::from_lines(text)
    }

    // ── state machine ─────────────────────────────────────────────────────────

    #[test]
    fn submit_starts_idle_session() {
        let mut s = ScanSession::default();
        assert_eq!(s.state(), ScanState::Idle);
        s.submit_frame(&frame("Nothing here"));
        assert_eq!(s.state(), ScanState::Scanning);
    }

    #[test]
    fn consensus_found_after_stable_frames() {
        let mut s = ScanSession::default();
        s.start();
        s.submit_frame(&frame("SUB-TOTAL: $90.00\nTOTAL: $101.70"));
        s.submit_frame(&frame("SUB-TOTAL: $90.00\nTOTAL: $101.71"));
        assert_eq!(s.state(), ScanState::Scanning);
        s.submit_frame(&frame("SUB-TOTAL: $90.00\nTOTAL: $101.70"));
        assert_eq!(s.state(), ScanState::ConsensusFound);

        // Still listening after consensus.
        assert!(s.submit_frame(&frame("Subtotal $90.00\nGratuity $16.20\nTotal $101.70")).is_some());
        assert_eq!(s.state(), ScanState::ConsensusFound);
    }

    #[test]
    fn dismissed_session_ignores_frames() {
        let mut s = ScanSession::default();
        s.submit_frame(&frame("Total $40.00"));
        s.dismiss();
        assert_eq!(s.state(), ScanState::Dismissed);
        assert!(s.submit_frame(&frame("Total $99.00")).is_none());
        assert!((s.current().total.unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_history() {
        let mut s = ScanSession::default();
        s.submit_frame(&frame("Total $40.00"));
        s.dismiss();
        s.reset();
        assert_eq!(s.state(), ScanState::Idle);
        assert!(s.current().is_empty());
        assert!(s.submit_frame(&frame("Total $40.00")).is_some());
    }

    // ── notifications ─────────────────────────────────────────────────────────

    #[test]
    fn callback_sees_each_change_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut s = ScanSession::default().on_change(move |u| sink.lock().unwrap().push(u.total));

        s.submit_frame(&frame("Total $40.00"));
        s.submit_frame(&frame("Total $40.00"));
        s.submit_frame(&frame("Total $40.001"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
