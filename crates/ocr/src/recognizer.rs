use thiserror::Error;

use crate::types::TextObservation;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Abstraction over a platform text recognizer.
/// Implementations accept raw camera frame bytes and return the recognized
/// text fragments, with bounding boxes when the engine provides them.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextObservation>, OcrError>;
}

// ── Mock backend (used for tests and replaying recorded frames) ───────────────

/// Returns preset observations regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    observations: Vec<TextObservation>,
}

impl MockRecognizer {
    pub fn new(observations: Vec<TextObservation>) -> Self {
        Self { observations }
    }

    /// One box-less observation per non-blank line.
    pub fn from_lines(text: &str) -> Self {
        Self::new(TextObservation::from_lines(text))
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextObservation>, OcrError> {
        if image.is_empty() {
            return Err(OcrError::ImageDecode("empty frame".into()));
        }
        Ok(self.observations.clone())
    }
}
