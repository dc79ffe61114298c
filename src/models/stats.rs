use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub prayers_done: u8,
}

impl DailyCount {
    pub fn completion_ratio(&self) -> f64 {
        self.prayers_done as f64 / 5.0
    }

    /// Heat level used by the 28-day grid: 0, 1-2, 3-4, 5.
    pub fn level(&self) -> u8 {
        match self.prayers_done {
            0 => 0,
            1 | 2 => 1,
            3 | 4 => 2,
            _ => 3,
        }
    }
}

/// Whether today's five are all in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayProgress {
    InProgress,
    Complete,
}
