use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::recognizer::{OcrBackend, OcrError};
use crate::session::ScanSession;
use crate::types::{ScannedBillAmounts, TextObservation};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Update channel closed")]
    ChannelClosed,
}

/// Orchestrates: camera frame → OCR → session → change notification.
pub struct ScanPipeline<R: OcrBackend> {
    recognizer: R,
    session: ScanSession,
}

impl<R: OcrBackend> ScanPipeline<R> {
    pub fn new(recognizer: R, session: ScanSession) -> Self {
        Self { recognizer, session }
    }

    /// Runs one frame. `Ok(None)` means the consensus did not change. An OCR
    /// failure skips the frame: the session is left untouched and the error
    /// is returned so the caller can keep feeding frames.
    pub fn process_image(&mut self, image: &[u8]) -> Result<Option<ScannedBillAmounts>, PipelineError> {
        let observations = match self.recognizer.recognize(image) {
            Ok(observations) => observations,
            Err(e) => {
                warn!(error = %e, "OCR failed, skipping frame");
                return Err(e.into());
            }
        };
        debug!(fragments = observations.len(), "frame recognized");
        Ok(self.session.submit_frame(&observations))
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ScanSession {
        &mut self.session
    }

    /// Ends the pipeline, handing back the session.
    pub fn finish(self) -> ScanSession {
        self.session
    }
}

// ── Frame worker ──────────────────────────────────────────────────────────────

/// Spawn a task that owns `session` and applies frames from `frames` one at
/// a time, sending each change notification on `updates`. The task ends
/// when the frame channel closes and returns the session.
///
/// If the update receiver is dropped the worker keeps consuming frames so
/// the capture side never blocks; notifications are then discarded.
pub fn spawn_frame_worker(
    mut session: ScanSession,
    mut frames: mpsc::Receiver<Vec<TextObservation>>,
    updates: mpsc::Sender<ScannedBillAmounts>,
) -> JoinHandle<ScanSession> {
    tokio::spawn(async move {
        let mut listening = true;
        while let Some(frame) = frames.recv().await {
            let Some(update) = session.submit_frame(&frame) else {
                continue;
            };
            if listening && updates.send(update).await.is_err() {
                warn!(error = %PipelineError::ChannelClosed, "dropping scan updates");
                listening = false;
            }
        }
        session
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use crate::session::ScanState;

    fn frame(text: &str) -> Vec<TextObservation> {
        TextObservation::from_lines(text)
    }

    #[test]
    fn process_image_notifies_then_settles() {
        let mut pipeline = ScanPipeline::new(
            MockRecognizer::from_lines("SUB-TOTAL: $90.00\nHst: $11.70\nTOTAL: $101.70"),
            ScanSession::default(),
        );

        let first = pipeline.process_image(b"frame-1").unwrap().unwrap();
        assert!((first.total.unwrap() - 101.70).abs() < 0.005);
        assert!(pipeline.process_image(b"frame-2").unwrap().is_none());
        pipeline.process_image(b"frame-3").unwrap();
        assert_eq!(pipeline.session().state(), ScanState::ConsensusFound);

        let session = pipeline.finish();
        assert!((session.current().subtotal.unwrap() - 90.0).abs() < 0.005);
    }

    #[test]
    fn ocr_failure_skips_the_frame() {
        let mut pipeline = ScanPipeline::new(MockRecognizer::from_lines("Total $40.00"), ScanSession::default());
        assert!(matches!(pipeline.process_image(b""), Err(PipelineError::Ocr(_))));
        assert_eq!(pipeline.session().state(), ScanState::Idle);
        assert!(pipeline.session().current().is_empty());

        // The next good frame is processed as if the failed one never came.
        let update = pipeline.process_image(b"frame").unwrap().unwrap();
        assert!((update.total.unwrap() - 40.0).abs() < 0.005);
        assert_eq!(pipeline.session().state(), ScanState::Scanning);
    }

    #[tokio::test]
    async fn worker_forwards_changes_in_order() {
        let (frames_tx, frames_rx) = mpsc::channel(8);
        let (updates_tx, mut updates_rx) = mpsc::channel(8);
        let worker = spawn_frame_worker(ScanSession::default(), frames_rx, updates_tx);

        frames_tx.send(frame("Total $40.00")).await.unwrap();
        frames_tx.send(frame("Total $40.00")).await.unwrap();
        frames_tx.send(frame("Subtotal $36.00\nTotal $40.00")).await.unwrap();
        drop(frames_tx);

        let session = worker.await.unwrap();
        let first = updates_rx.recv().await.unwrap();
        assert!(first.subtotal.is_none());
        let second = updates_rx.recv().await.unwrap();
        assert!((second.subtotal.unwrap() - 36.0).abs() < 0.005);
        assert!(updates_rx.recv().await.is_none());
        assert_eq!(session.state(), ScanState::ConsensusFound);
    }

    #[tokio::test]
    async fn worker_survives_dropped_listener() {
        let (frames_tx, frames_rx) = mpsc::channel(8);
        let (updates_tx, updates_rx) = mpsc::channel(1);
        drop(updates_rx);
        let worker = spawn_frame_worker(ScanSession::default(), frames_rx, updates_tx);

        frames_tx.send(frame("Total $40.00")).await.unwrap();
        frames_tx.send(frame("Total $55.00")).await.unwrap();
        drop(frames_tx);

        let session = worker.await.unwrap();
        assert!(session.current().total.is_some());
    }
}
