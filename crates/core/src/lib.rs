pub mod money;
pub mod record;
pub mod tip;

pub use money::Money;
pub use record::{BillHistory, BillRecord, RecordError, DEFAULT_HISTORY_CAPACITY};
pub use tip::{Sentiment, TipBreakdown, TipChoice, TipError};
