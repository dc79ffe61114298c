use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::parse_clock;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LocationFailure {
    #[error("GPS Permission Denied")]
    PermissionDenied,
    #[error("GPS Unavailable")]
    Unavailable,
    #[error("GPS Timeout")]
    Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeSourceError {
    #[error("prayer time request failed: {0}")]
    Request(String),
    #[error("malformed prayer time payload: {0}")]
    Malformed(String),
    #[error("prayer time request timed out")]
    Timeout,
}

/// The five clock values as delivered by a time source, still unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Timings {
    pub fajr: String,
    pub dhuhr: String,
    pub asr: String,
    pub maghrib: String,
    pub isha: String,
}

impl Timings {
    pub fn from_times(times: [NaiveTime; 5]) -> Self {
        let f = |t: NaiveTime| t.format("%H:%M").to_string();
        Self {
            fajr: f(times[0]),
            dhuhr: f(times[1]),
            asr: f(times[2]),
            maghrib: f(times[3]),
            isha: f(times[4]),
        }
    }

    /// Parse all five values, failing on the first one that isn't `HH:MM`.
    pub fn parse(&self) -> Result<[NaiveTime; 5], TimeSourceError> {
        let raw = [
            ("Fajr", &self.fajr),
            ("Dhuhr", &self.dhuhr),
            ("Asr", &self.asr),
            ("Maghrib", &self.maghrib),
            ("Isha", &self.isha),
        ];
        let mut out = [NaiveTime::MIN; 5];
        for (slot, (name, value)) in out.iter_mut().zip(raw) {
            *slot = parse_clock(value)
                .ok_or_else(|| TimeSourceError::Malformed(format!("{name} = {value:?}")))?;
        }
        Ok(out)
    }
}

/// Resolves the device position at a given precision tier.
#[async_trait(?Send)]
pub trait LocationSource {
    async fn resolve(&self, precision: Precision) -> Result<Coordinates, LocationFailure>;
}

/// Best-effort reverse lookup of a human-readable place label.
#[async_trait(?Send)]
pub trait PlaceNameSource {
    async fn place_name(&self, coords: Coordinates) -> anyhow::Result<String>;
}

/// Produces the day's five prayer clock times for a position.
#[async_trait(?Send)]
pub trait TimeSource {
    async fn fetch(&self, date: NaiveDate, coords: Coordinates) -> Result<Timings, TimeSourceError>;
}
