use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::PrayerType;

/// Where today's times came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Cached,
    Default,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Cached => "cached",
            Provenance::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerSlot {
    pub prayer: PrayerType,
    pub time: Option<NaiveTime>,
}

impl PrayerSlot {
    /// Minutes since midnight, if the slot has a time.
    pub fn minutes(&self) -> Option<u32> {
        self.time.map(|t| t.hour() * 60 + t.minute())
    }
}

/// The five slots for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub date: NaiveDate,
    pub slots: [PrayerSlot; 5],
    pub provenance: Provenance,
}

impl Schedule {
    pub fn new(date: NaiveDate, times: [NaiveTime; 5], provenance: Provenance) -> Self {
        let all = PrayerType::all();
        let slots = std::array::from_fn(|i| PrayerSlot {
            prayer: all[i],
            time: Some(times[i]),
        });
        Self {
            date,
            slots,
            provenance,
        }
    }

    /// A schedule with no times at all ("--:--" everywhere).
    pub fn unresolved(date: NaiveDate) -> Self {
        let all = PrayerType::all();
        Self {
            date,
            slots: std::array::from_fn(|i| PrayerSlot {
                prayer: all[i],
                time: None,
            }),
            provenance: Provenance::Default,
        }
    }

    #[cfg(test)]
    pub fn time_of(&self, prayer: PrayerType) -> Option<NaiveTime> {
        self.slots[prayer.index()].time
    }

    pub fn is_well_formed(&self) -> bool {
        self.slots.iter().all(|s| s.time.is_some())
    }

    pub fn to_cached(&self) -> Vec<CachedSlot> {
        self.slots
            .iter()
            .map(|s| CachedSlot {
                name: s.prayer.display_name().to_string(),
                time: s
                    .time
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_else(|| "--:--".to_string()),
            })
            .collect()
    }

    /// Rebuild from a persisted slot list. Anything other than exactly five
    /// parseable times yields `None`.
    pub fn from_cached(date: NaiveDate, cached: &[CachedSlot]) -> Option<Self> {
        if cached.len() != PrayerType::COUNT {
            return None;
        }
        let mut times = [NaiveTime::MIN; 5];
        for (slot, entry) in times.iter_mut().zip(cached) {
            *slot = parse_clock(&entry.time)?;
        }
        Some(Self::new(date, times, Provenance::Cached))
    }
}

/// Persisted shape of a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSlot {
    pub name: String,
    pub time: String,
}

/// Parse a 24-hour `HH:MM` clock value. Anything after the first whitespace
/// (a timezone annotation like `"05:30 (EET)"`) is ignored.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let token = raw.split_whitespace().next()?;
    NaiveTime::parse_from_str(token, "%H:%M").ok()
}
