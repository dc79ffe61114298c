use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use thiserror::Error;

use crate::db::store::{keys, read_json, write_json, PersistedStore};
use crate::models::{DailyCount, PrayerType};
use crate::utils::Clock;

const DATE_FMT: &str = "%Y-%m-%d";
const STREAK_LOOKBACK_DAYS: i64 = 365;
/// Retroactive assignment is allowed from today through this many days ahead.
const ASSIGN_DAYS_AHEAD: i64 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("{date} is outside the assignable window {earliest}..={latest}")]
    OutsideWindow {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
}

/// Per-day completion counts, persisted as one JSON object per map.
pub struct HistoryStore {
    store: Rc<dyn PersistedStore>,
    clock: Rc<dyn Clock>,
    counts: BTreeMap<NaiveDate, u8>,
    details: BTreeMap<NaiveDate, BTreeSet<PrayerType>>,
}

impl HistoryStore {
    pub fn load(store: Rc<dyn PersistedStore>, clock: Rc<dyn Clock>) -> Self {
        let counts = read_json::<BTreeMap<String, serde_json::Value>>(&*store, keys::HISTORY)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(date, count)| {
                let date = NaiveDate::parse_from_str(&date, DATE_FMT).ok()?;
                let count = count.as_u64()?.min(5) as u8;
                Some((date, count))
            })
            .collect();

        let details = read_json::<BTreeMap<String, Vec<String>>>(&*store, keys::HISTORY_DETAILS)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(date, names)| {
                let date = NaiveDate::parse_from_str(&date, DATE_FMT).ok()?;
                let set = names.iter().filter_map(|n| n.parse().ok()).collect();
                Some((date, set))
            })
            .collect();

        Self {
            store,
            clock,
            counts,
            details,
        }
    }

    pub fn count_for(&self, date: NaiveDate) -> u8 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Prayers explicitly assigned to `date`, if any.
    pub fn details_for(&self, date: NaiveDate) -> Option<&BTreeSet<PrayerType>> {
        self.details.get(&date)
    }

    /// Overwrite today's count.
    pub fn record_today(&mut self, count: u8) {
        let today = self.clock.today();
        let count = count.min(5);
        self.counts.insert(today, count);
        debug!("history[{today}] = {count}");
        self.persist_counts();
    }

    /// Retroactively set which prayers were (or will be) done on `date`.
    ///
    /// Only today through two days ahead is accepted; anything else is
    /// rejected without touching the record.
    pub fn assign_day(&mut self, date: NaiveDate, prayers: &[PrayerType]) -> Result<(), HistoryError> {
        let earliest = self.clock.today();
        let latest = earliest + Duration::days(ASSIGN_DAYS_AHEAD);
        if date < earliest || date > latest {
            warn!("rejected assignment for {date}");
            return Err(HistoryError::OutsideWindow {
                date,
                earliest,
                latest,
            });
        }

        let set: BTreeSet<PrayerType> = prayers.iter().copied().collect();
        self.counts.insert(date, set.len() as u8);
        self.details.insert(date, set);
        self.persist_details();
        self.persist_counts();
        Ok(())
    }

    /// Consecutive days with at least one prayer, walking back from today.
    /// An empty today doesn't break the run.
    pub fn streak(&self) -> u32 {
        let today = self.clock.today();
        let mut streak = 0;
        for i in 0..STREAK_LOOKBACK_DAYS {
            let day = today - Duration::days(i);
            if self.count_for(day) > 0 {
                streak += 1;
            } else if i == 0 {
                continue;
            } else {
                break;
            }
        }
        streak
    }

    /// Days from `today - start_offset` to `today - end_offset`, oldest first.
    pub fn range_counts(&self, start_offset: u32, end_offset: u32) -> RangeCounts<'_> {
        let today = self.clock.today();
        RangeCounts {
            counts: &self.counts,
            next: today - Duration::days(start_offset as i64),
            last: today - Duration::days(end_offset as i64),
        }
    }

    pub fn weekly(&self) -> RangeCounts<'_> {
        self.range_counts(6, 0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().map(|&c| c as u32).sum()
    }

    fn persist_counts(&self) {
        let raw: BTreeMap<String, u8> = self
            .counts
            .iter()
            .map(|(d, c)| (d.format(DATE_FMT).to_string(), *c))
            .collect();
        write_json(&*self.store, keys::HISTORY, &raw);
    }

    fn persist_details(&self) {
        let raw: BTreeMap<String, Vec<&str>> = self
            .details
            .iter()
            .map(|(d, set)| {
                (
                    d.format(DATE_FMT).to_string(),
                    set.iter().map(|p| p.display_name()).collect(),
                )
            })
            .collect();
        write_json(&*self.store, keys::HISTORY_DETAILS, &raw);
    }
}

/// Lazy walk over a contiguous day window. Clone it to iterate again.
#[derive(Clone)]
pub struct RangeCounts<'a> {
    counts: &'a BTreeMap<NaiveDate, u8>,
    next: NaiveDate,
    last: NaiveDate,
}

impl Iterator for RangeCounts<'_> {
    type Item = DailyCount;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }
        let date = self.next;
        self.next = date.succ_opt()?;
        Some(DailyCount {
            date,
            prayers_done: self.counts.get(&date).copied().unwrap_or(0),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.last - self.next).num_days() + 1;
        let n = n.max(0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for RangeCounts<'_> {}
