use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::info;

use crate::models::{PrayerType, Schedule};
use crate::notify::NotificationRequest;
use crate::utils::format::format_countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextEvent {
    /// A prayer later today and the time left until it.
    Upcoming {
        prayer: PrayerType,
        at: NaiveTime,
        remaining: Duration,
    },
    /// Nothing left today (or no usable times): Fajr tomorrow, no countdown.
    Tomorrow,
}

impl NextEvent {
    pub fn prayer(&self) -> PrayerType {
        match self {
            NextEvent::Upcoming { prayer, .. } => *prayer,
            NextEvent::Tomorrow => PrayerType::Fajr,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            NextEvent::Upcoming { remaining, .. } => Some(*remaining),
            NextEvent::Tomorrow => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            NextEvent::Upcoming { prayer, .. } => prayer.display_name().to_string(),
            NextEvent::Tomorrow => "Fajr (Tomorrow)".to_string(),
        }
    }

    pub fn countdown(&self) -> String {
        match self {
            NextEvent::Upcoming { remaining, .. } => format_countdown(*remaining),
            NextEvent::Tomorrow => "See you tomorrow".to_string(),
        }
    }
}

/// Pick the closest slot strictly after the current minute. Slots without a
/// time are skipped; ties go to the lower index.
pub fn find_next(schedule: &Schedule, now: NaiveTime) -> NextEvent {
    let current = now.hour() * 60 + now.minute();

    let mut best: Option<(usize, u32)> = None;
    for (i, slot) in schedule.slots.iter().enumerate() {
        let Some(minutes) = slot.minutes() else {
            continue;
        };
        if minutes <= current {
            continue;
        }
        let diff = minutes - current;
        if best.is_none_or(|(_, d)| diff < d) {
            best = Some((i, diff));
        }
    }

    let Some((index, _)) = best else {
        return NextEvent::Tomorrow;
    };
    let slot = &schedule.slots[index];
    let Some(at) = slot.time.and_then(|t| NaiveTime::from_hms_opt(t.hour(), t.minute(), 0)) else {
        return NextEvent::Tomorrow;
    };
    NextEvent::Upcoming {
        prayer: slot.prayer,
        at,
        remaining: at - now,
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub event: NextEvent,
    pub highlighted: Option<PrayerType>,
    pub notification: Option<NotificationRequest>,
}

/// Re-evaluates the next prayer on every tick and reports each due
/// transition at most once.
pub struct NextEventScheduler {
    grace: Duration,
    highlighted: Option<PrayerType>,
    target: Option<(NaiveDate, PrayerType, NaiveTime)>,
    last_fired: Option<(NaiveDate, PrayerType)>,
}

impl NextEventScheduler {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            highlighted: None,
            target: None,
            last_fired: None,
        }
    }

    pub fn tick(&mut self, schedule: Option<&Schedule>, now: NaiveDateTime) -> Tick {
        let event = schedule
            .map(|s| find_next(s, now.time()))
            .unwrap_or(NextEvent::Tomorrow);

        let due = match event {
            NextEvent::Upcoming {
                prayer, remaining, ..
            } if remaining.num_seconds() == 0 => Some((now.date(), prayer)),
            _ => self.crossed_target(now),
        };

        let notification = match due {
            Some(key) if self.last_fired != Some(key) => {
                self.last_fired = Some(key);
                info!("{} is due", key.1);
                Some(NotificationRequest::prayer_due(key.1))
            }
            _ => None,
        };

        self.target = match event {
            NextEvent::Upcoming { prayer, at, .. } => Some((now.date(), prayer, at)),
            NextEvent::Tomorrow => None,
        };
        self.highlighted = match event {
            NextEvent::Upcoming { prayer, .. } => Some(prayer),
            NextEvent::Tomorrow => None,
        };

        Tick {
            event,
            highlighted: self.highlighted,
            notification,
        }
    }

    /// The slot targeted last tick has passed without a zero reading
    /// (a skipped or late tick).
    fn crossed_target(&self, now: NaiveDateTime) -> Option<(NaiveDate, PrayerType)> {
        let (date, prayer, at) = self.target?;
        let due_at = date.and_time(at);
        let late = now - due_at;
        (late >= Duration::zero() && late <= self.grace).then_some((date, prayer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn default_schedule() -> Schedule {
        Schedule::new(
            day(),
            [t(5, 30), t(13, 15), t(16, 45), t(18, 50), t(20, 15)],
            Provenance::Default,
        )
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn afternoon_selects_asr() {
        let event = find_next(&default_schedule(), t(14, 0));
        assert_eq!(event.prayer(), PrayerType::Asr);
        assert_eq!(event.countdown(), "02:45:00");
    }

    #[test]
    fn after_isha_rolls_to_tomorrow() {
        let event = find_next(&default_schedule(), t(21, 0));
        assert_eq!(event, NextEvent::Tomorrow);
        assert_eq!(event.label(), "Fajr (Tomorrow)");
        assert_eq!(event.remaining(), None);
    }

    #[test]
    fn same_minute_counts_as_passed() {
        let event = find_next(&default_schedule(), t(13, 15));
        assert_eq!(event.prayer(), PrayerType::Asr);
    }

    #[test]
    fn unresolved_schedule_degrades() {
        let event = find_next(&Schedule::unresolved(day()), t(3, 0));
        assert_eq!(event, NextEvent::Tomorrow);
    }

    #[test]
    fn tolerates_out_of_order_and_partial_times() {
        let mut s = default_schedule();
        s.slots[0].time = Some(t(17, 0));
        s.slots[2].time = None;
        s.slots[3].time = Some(t(17, 0));
        // closest is 17:00; Fajr wins the tie on index
        let event = find_next(&s, t(16, 0));
        assert_eq!(event.prayer(), PrayerType::Fajr);
        assert_eq!(event.remaining(), Some(Duration::hours(1)));
    }

    #[test]
    fn due_fires_once_on_zero() {
        let schedule = default_schedule();
        let mut scheduler = NextEventScheduler::new(Duration::seconds(60));

        let before = scheduler.tick(Some(&schedule), at(16, 44, 58));
        assert!(before.notification.is_none());
        assert_eq!(before.highlighted, Some(PrayerType::Asr));

        let zero = scheduler.tick(
            Some(&schedule),
            at(16, 44, 59) + Duration::milliseconds(400),
        );
        assert_eq!(zero.event.countdown(), "00:00:00");
        assert_eq!(
            zero.notification,
            Some(NotificationRequest::prayer_due(PrayerType::Asr))
        );

        for s in 0..5 {
            let after = scheduler.tick(Some(&schedule), at(16, 45, s));
            assert!(after.notification.is_none());
            assert_eq!(after.highlighted, Some(PrayerType::Maghrib));
        }
    }

    #[test]
    fn skipped_zero_still_fires_once() {
        let schedule = default_schedule();
        let mut scheduler = NextEventScheduler::new(Duration::seconds(60));

        scheduler.tick(Some(&schedule), at(18, 49, 59));
        let late = scheduler.tick(Some(&schedule), at(18, 50, 1));
        assert_eq!(
            late.notification,
            Some(NotificationRequest::prayer_due(PrayerType::Maghrib))
        );
        assert!(scheduler
            .tick(Some(&schedule), at(18, 50, 2))
            .notification
            .is_none());
    }

    #[test]
    fn stale_target_past_grace_is_ignored() {
        let schedule = default_schedule();
        let mut scheduler = NextEventScheduler::new(Duration::seconds(60));

        scheduler.tick(Some(&schedule), at(13, 0, 0));
        // process was suspended for an hour
        let resumed = scheduler.tick(Some(&schedule), at(14, 15, 0));
        assert!(resumed.notification.is_none());
    }

    #[test]
    fn after_last_prayer_highlight_clears() {
        let schedule = default_schedule();
        let mut scheduler = NextEventScheduler::new(Duration::seconds(60));
        let evening = scheduler.tick(Some(&schedule), at(20, 0, 0));
        assert_eq!(evening.highlighted, Some(PrayerType::Isha));
        let tick = scheduler.tick(Some(&schedule), at(22, 0, 0));
        assert_eq!(tick.event, NextEvent::Tomorrow);
        assert_eq!(tick.highlighted, None);
    }

    #[test]
    fn no_schedule_yet_is_not_an_error() {
        let mut scheduler = NextEventScheduler::new(Duration::seconds(60));
        let tick = scheduler.tick(None, at(10, 0, 0));
        assert_eq!(tick.event, NextEvent::Tomorrow);
        assert!(tick.notification.is_none());
    }
}
