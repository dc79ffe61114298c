pub mod daily;
pub mod history;

pub use daily::{DailyState, ToggleOutcome, TrackerError};
pub use history::{HistoryError, HistoryStore};
