pub mod prayer;
pub mod schedule;
pub mod stats;
pub mod theme;

pub use prayer::PrayerType;
pub use schedule::{parse_clock, CachedSlot, PrayerSlot, Provenance, Schedule};
pub use stats::{DailyCount, DayProgress};
pub use theme::Theme;
