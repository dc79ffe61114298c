use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use salah::prelude::{Configuration, Madhab, Method, Prayer, PrayerSchedule};

use crate::config::CalculationConfig;
use crate::prayer_times::sources::{Coordinates, TimeSource, TimeSourceError, Timings};

/// Offline astronomical prayer times.
pub struct SalahTimeSource {
    pub method_str: String,
    pub madhab_str: String,
    pub tz_offset_minutes: i32,
}

impl SalahTimeSource {
    pub fn new(method: &str, madhab: &str, tz_offset_minutes: i32) -> Result<Self> {
        // Validate method + madhab early
        parse_method(method)?;
        parse_madhab(madhab)?;
        Ok(Self {
            method_str: method.to_string(),
            madhab_str: madhab.to_string(),
            tz_offset_minutes,
        })
    }

    pub fn from_config(config: &CalculationConfig) -> Result<Self> {
        Self::new(&config.method, &config.madhab, config.timezone_offset)
    }

    fn compute_times(&self, date: NaiveDate, coords: Coordinates) -> Result<[NaiveTime; 5]> {
        let location = salah::prelude::Coordinates::new(coords.latitude, coords.longitude);
        let method = parse_method(&self.method_str)?;
        let madhab = parse_madhab(&self.madhab_str)?;
        let params = Configuration::with(method, madhab);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(location)
            .with_configuration(params)
            .calculate()
            .map_err(|e| anyhow!("Prayer calculation failed: {}", e))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", self.tz_offset_minutes))?;

        let to_local = |utc: chrono::DateTime<chrono::Utc>| -> NaiveTime {
            utc.with_timezone(&offset).time()
        };

        Ok([
            to_local(times.time(Prayer::Fajr)),
            to_local(times.time(Prayer::Dhuhr)),
            to_local(times.time(Prayer::Asr)),
            to_local(times.time(Prayer::Maghrib)),
            to_local(times.time(Prayer::Isha)),
        ])
    }
}

#[async_trait(?Send)]
impl TimeSource for SalahTimeSource {
    async fn fetch(&self, date: NaiveDate, coords: Coordinates) -> Result<Timings, TimeSourceError> {
        self.compute_times(date, coords)
            .map(Timings::from_times)
            .map_err(|e| TimeSourceError::Request(format!("{e:#}")))
    }
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        "Other" => Ok(Method::Other),
        _ => Err(anyhow!(
            "Unknown calculation method: '{}' (expected one of {})",
            s,
            CALC_METHODS.join(", ")
        )),
    }
}

fn parse_madhab(s: &str) -> Result<Madhab> {
    match s {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(anyhow!("Unknown madhab: '{}'", s)),
    }
}

pub const CALC_METHODS: &[&str] = &[
    "MuslimWorldLeague",
    "Egyptian",
    "Karachi",
    "UmmAlQura",
    "Dubai",
    "MoonsightingCommittee",
    "NorthAmerica",
    "Kuwait",
    "Qatar",
    "Singapore",
    "Tehran",
    "Turkey",
    "Other",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_method() {
        assert!(SalahTimeSource::new("Martian", "Shafi", 0).is_err());
        assert!(SalahTimeSource::new("NorthAmerica", "Maliki", 0).is_err());
    }

    #[tokio::test]
    async fn computes_five_ordered_times() {
        // Makkah, UTC+3
        let source = SalahTimeSource::new("UmmAlQura", "Shafi", 180).unwrap();
        let coords = Coordinates {
            latitude: 21.4225,
            longitude: 39.8262,
        };
        let date = NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
        let times = source.fetch(date, coords).await.unwrap().parse().unwrap();
        assert!(times.windows(2).all(|w| w[0] < w[1]), "{times:?}");
    }
}
