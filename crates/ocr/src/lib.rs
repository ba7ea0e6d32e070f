// Compiled regex cache shared by every module below.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod classify;
pub mod config;
pub mod consensus;
pub mod lines;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod recognizer;
pub mod resolver;
pub mod session;
pub mod tap;
pub mod types;

pub use classify::{classify, detect_gratuity, find_label, parse_line, LabelMatch};
pub use config::{ConfigError, ScannerConfig};
pub use consensus::{Consensus, HistoryBuffer};
pub use lines::{group_into_lines, Line};
pub use normalize::{money_amounts, normalize};
pub use pipeline::{spawn_frame_worker, PipelineError, ScanPipeline};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use resolver::{resolve_document, BillAmountResolver, FrameMethod, FrameReading};
pub use session::{ScanSession, ScanState};
pub use tap::parse_tapped;
pub use types::{
    AmountType, BoundingBox, DetectedGratuity, ParsedAmount, ScannedBillAmounts, TextObservation,
};
