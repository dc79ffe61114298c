use chrono::NaiveDate;
use log::info;
use std::rc::Rc;
use thiserror::Error;

use crate::db::store::{keys, read, read_json, write, write_json, PersistedStore};
use crate::models::{DayProgress, PrayerType};
use crate::tracker::history::HistoryStore;
use crate::utils::Clock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("prayer index {0} is out of range (0..5)")]
    InvalidIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub prayer: PrayerType,
    pub completed: bool,
    pub count: u8,
    /// Set when this toggle brought the day to 5/5.
    pub all_complete: bool,
}

/// Today's five completion flags.
pub struct DailyState {
    store: Rc<dyn PersistedStore>,
    clock: Rc<dyn Clock>,
    date: NaiveDate,
    completed: [bool; 5],
}

impl DailyState {
    pub fn load(store: Rc<dyn PersistedStore>, clock: Rc<dyn Clock>) -> Self {
        let completed = read_json::<[bool; 5]>(&*store, keys::PRAYER_STATUS).unwrap_or_default();
        let date = read(&*store, keys::LAST_DATE)
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            .unwrap_or_else(|| clock.today());

        let mut state = Self {
            store,
            clock,
            date,
            completed,
        };
        state.check_rollover();
        write(&*state.store, keys::LAST_DATE, &state.date.format("%Y-%m-%d").to_string());
        state
    }

    /// Re-read the persisted flags and date, picking up toggles made by
    /// another process. Missing keys keep the in-memory values.
    pub fn reload(&mut self) {
        if let Some(completed) = read_json::<[bool; 5]>(&*self.store, keys::PRAYER_STATUS) {
            self.completed = completed;
        }
        if let Some(date) = read(&*self.store, keys::LAST_DATE)
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        {
            self.date = date;
        }
    }

    /// Reset the flags if the calendar day moved on. Returns true on reset.
    pub fn check_rollover(&mut self) -> bool {
        let today = self.clock.today();
        if self.date == today {
            return false;
        }
        info!("new day detected ({} -> {today}), resetting progress", self.date);
        self.completed = [false; 5];
        write_json(&*self.store, keys::PRAYER_STATUS, &self.completed);
        self.date = today;
        write(&*self.store, keys::LAST_DATE, &today.format("%Y-%m-%d").to_string());
        true
    }

    pub fn date(&mut self) -> NaiveDate {
        self.check_rollover();
        self.date
    }

    pub fn completed(&mut self) -> [bool; 5] {
        self.check_rollover();
        self.completed
    }

    pub fn count(&mut self) -> u8 {
        self.completed().iter().filter(|&&done| done).count() as u8
    }

    pub fn progress(&mut self) -> DayProgress {
        if self.count() as usize == PrayerType::COUNT {
            DayProgress::Complete
        } else {
            DayProgress::InProgress
        }
    }

    /// Flip one prayer and mirror the new count into `history`.
    pub fn toggle(&mut self, index: usize, history: &mut HistoryStore) -> Result<ToggleOutcome, TrackerError> {
        let prayer = PrayerType::from_index(index).ok_or(TrackerError::InvalidIndex(index))?;
        self.check_rollover();

        self.completed[index] = !self.completed[index];
        write_json(&*self.store, keys::PRAYER_STATUS, &self.completed);

        let count = self.count();
        history.record_today(count);

        let all_complete = count as usize == PrayerType::COUNT;
        if all_complete {
            info!("all five prayers complete for {}", self.date);
        }
        Ok(ToggleOutcome {
            prayer,
            completed: self.completed[index],
            count,
            all_complete,
        })
    }
}
