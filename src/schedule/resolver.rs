//! Schedule resolution: same-day cache, then location + time source, then
//! built-in defaults.
//!
//! A watchdog sleeps alongside the pipeline. Whichever settles first makes
//! the initial publish. If the watchdog wins, the pipeline keeps running and
//! a later live result replaces the defaults; a later failure does not.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::fmt;
use std::rc::Rc;
use tokio::sync::watch;

use crate::config::ResolverConfig;
use crate::db::store::{keys, read, read_json, write, write_json, PersistedStore};
use crate::models::{CachedSlot, Provenance, Schedule};
use crate::prayer_times::{
    Coordinates, LocationFailure, LocationSource, PlaceNameSource, Precision, TimeSource,
    TimeSourceError,
};
use crate::utils::Clock;

const DATE_FMT: &str = "%Y-%m-%d";
const GENERIC_PLACE: &str = "Location Found";
const GENERIC_CACHED_PLACE: &str = "Cached Location";

/// Human-facing resolution status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStatus {
    Locating,
    TryingNetwork,
    /// Live times, labelled with the place name.
    Located(String),
    Cached(String),
    LocationFailed(LocationFailure),
    ApiError,
    TimedOut,
}

impl fmt::Display for ResolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveStatus::Locating => write!(f, "Locating (GPS)..."),
            ResolveStatus::TryingNetwork => write!(f, "Trying Network Loc..."),
            ResolveStatus::Located(label) | ResolveStatus::Cached(label) => write!(f, "{label}"),
            ResolveStatus::LocationFailed(reason) => write!(f, "{reason}"),
            ResolveStatus::ApiError => write!(f, "API Error - Using Defaults"),
            ResolveStatus::TimedOut => write!(f, "GPS Timeout. Using Defaults."),
        }
    }
}

/// What the rest of the app observes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverState {
    pub status: ResolveStatus,
    pub schedule: Option<Schedule>,
    /// Number of schedule publishes so far.
    pub generation: u32,
}

impl ResolverState {
    fn initial() -> Self {
        Self {
            status: ResolveStatus::Locating,
            schedule: None,
            generation: 0,
        }
    }
}

enum PipelineOutcome {
    Live { schedule: Schedule, label: String },
    Failed(ResolveStatus),
}

pub struct ScheduleResolver {
    store: Rc<dyn PersistedStore>,
    clock: Rc<dyn Clock>,
    location: Rc<dyn LocationSource>,
    place_names: Rc<dyn PlaceNameSource>,
    times: Rc<dyn TimeSource>,
    config: ResolverConfig,
    state: watch::Sender<ResolverState>,
}

impl ScheduleResolver {
    pub fn new(
        store: Rc<dyn PersistedStore>,
        clock: Rc<dyn Clock>,
        location: Rc<dyn LocationSource>,
        place_names: Rc<dyn PlaceNameSource>,
        times: Rc<dyn TimeSource>,
        config: ResolverConfig,
    ) -> Self {
        let (state, _) = watch::channel(ResolverState::initial());
        Self {
            store,
            clock,
            location,
            place_names,
            times,
            config,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ResolverState {
        self.state.borrow().clone()
    }

    /// Resolve today's schedule. `force_refresh` skips the same-day cache
    /// (user-initiated retry).
    pub async fn resolve(&self, force_refresh: bool) -> ResolverState {
        let today = self.clock.today();

        if !force_refresh {
            if let Some(schedule) = self.load_cached(today) {
                let label = read(&*self.store, keys::CACHED_LOCATION_NAME)
                    .unwrap_or_else(|| GENERIC_CACHED_PLACE.to_string());
                info!("using cached schedule for {today}");
                self.publish(schedule, ResolveStatus::Cached(label));
                return self.current();
            }
        }

        self.set_status(ResolveStatus::Locating);
        let watchdog = tokio::time::sleep(self.config.watchdog());
        let pipeline = self.run_pipeline(today);
        tokio::pin!(watchdog, pipeline);

        tokio::select! {
            biased;
            outcome = &mut pipeline => self.settle(today, outcome),
            () = &mut watchdog => {
                warn!("no schedule after {:?}, using defaults", self.config.watchdog());
                self.publish(self.default_schedule(today), ResolveStatus::TimedOut);
                match pipeline.await {
                    PipelineOutcome::Live { schedule, label } => {
                        info!("late live schedule replaces defaults");
                        self.publish(schedule, ResolveStatus::Located(label));
                    }
                    PipelineOutcome::Failed(status) => {
                        debug!("late resolution failure ignored: {status}");
                    }
                }
            }
        }
        self.current()
    }

    async fn run_pipeline(&self, today: NaiveDate) -> PipelineOutcome {
        let coords = match self.locate(Precision::High).await {
            Ok(coords) => coords,
            Err(high) => {
                warn!("high accuracy location failed: {high}");
                self.set_status(ResolveStatus::TryingNetwork);
                match self.locate(Precision::Low).await {
                    Ok(coords) => coords,
                    Err(low) => {
                        warn!("low accuracy location failed: {low}");
                        return PipelineOutcome::Failed(ResolveStatus::LocationFailed(low));
                    }
                }
            }
        };

        let (label, times) = tokio::join!(self.lookup_place(coords), self.fetch_times(today, coords));
        match times {
            Ok(times) => {
                let schedule = Schedule::new(today, times, Provenance::Live);
                self.store_cache(&schedule);
                PipelineOutcome::Live { schedule, label }
            }
            Err(e) => {
                warn!("prayer times unavailable: {e}");
                PipelineOutcome::Failed(ResolveStatus::ApiError)
            }
        }
    }

    async fn locate(&self, precision: Precision) -> Result<Coordinates, LocationFailure> {
        tokio::time::timeout(self.config.location_timeout(), self.location.resolve(precision))
            .await
            .unwrap_or(Err(LocationFailure::Timeout))
    }

    /// Best-effort label; bounded by the fetch timeout so it never holds
    /// back the times.
    async fn lookup_place(&self, coords: Coordinates) -> String {
        let lookup = self.place_names.place_name(coords);
        match tokio::time::timeout(self.config.fetch_timeout(), lookup).await {
            Ok(Ok(name)) => {
                write(&*self.store, keys::CACHED_LOCATION_NAME, &name);
                name
            }
            Ok(Err(e)) => {
                debug!("place name lookup failed: {e:#}");
                GENERIC_PLACE.to_string()
            }
            Err(_) => {
                debug!("place name lookup timed out");
                GENERIC_PLACE.to_string()
            }
        }
    }

    async fn fetch_times(
        &self,
        date: NaiveDate,
        coords: Coordinates,
    ) -> Result<[chrono::NaiveTime; 5], TimeSourceError> {
        let timings = tokio::time::timeout(self.config.fetch_timeout(), self.times.fetch(date, coords))
            .await
            .map_err(|_| TimeSourceError::Timeout)??;
        timings.parse()
    }

    fn settle(&self, today: NaiveDate, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Live { schedule, label } => {
                self.publish(schedule, ResolveStatus::Located(label));
            }
            PipelineOutcome::Failed(status) => {
                self.publish(self.default_schedule(today), status);
            }
        }
    }

    fn default_schedule(&self, date: NaiveDate) -> Schedule {
        Schedule::new(date, self.config.fallback_times(), Provenance::Default)
    }

    fn load_cached(&self, today: NaiveDate) -> Option<Schedule> {
        let cached_date = read(&*self.store, keys::CACHED_DATE)?;
        if cached_date != today.format(DATE_FMT).to_string() {
            return None;
        }
        let slots = read_json::<Vec<CachedSlot>>(&*self.store, keys::CACHED_SCHEDULE)?;
        let schedule = Schedule::from_cached(today, &slots).filter(Schedule::is_well_formed);
        if schedule.is_none() {
            warn!("cached schedule for {today} is malformed, ignoring");
        }
        schedule
    }

    fn store_cache(&self, schedule: &Schedule) {
        write_json(&*self.store, keys::CACHED_SCHEDULE, &schedule.to_cached());
        write(
            &*self.store,
            keys::CACHED_DATE,
            &schedule.date.format(DATE_FMT).to_string(),
        );
    }

    fn set_status(&self, status: ResolveStatus) {
        debug!("resolver status: {status}");
        self.state.send_modify(|s| s.status = status);
    }

    fn publish(&self, schedule: Schedule, status: ResolveStatus) {
        info!(
            "publishing {} schedule for {} ({status})",
            schedule.provenance.as_str(),
            schedule.date
        );
        self.state.send_modify(|s| {
            s.status = status;
            s.schedule = Some(schedule);
            s.generation += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::prayer_times::Timings;
    use crate::utils::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn here() -> Coordinates {
        Coordinates {
            latitude: 24.86,
            longitude: 67.0,
        }
    }

    struct ScriptedLocation {
        high: Result<Coordinates, LocationFailure>,
        low: Result<Coordinates, LocationFailure>,
        delay: Duration,
        calls: RefCell<Vec<Precision>>,
    }

    impl ScriptedLocation {
        fn new(
            high: Result<Coordinates, LocationFailure>,
            low: Result<Coordinates, LocationFailure>,
        ) -> Self {
            Self {
                high,
                low,
                delay: Duration::ZERO,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl LocationSource for ScriptedLocation {
        async fn resolve(&self, precision: Precision) -> Result<Coordinates, LocationFailure> {
            self.calls.borrow_mut().push(precision);
            tokio::time::sleep(self.delay).await;
            match precision {
                Precision::High => self.high,
                Precision::Low => self.low,
            }
        }
    }

    struct ScriptedTimes {
        result: Result<Timings, TimeSourceError>,
        delay: Duration,
        calls: Cell<u32>,
    }

    impl ScriptedTimes {
        fn ok() -> Self {
            Self::with(Ok(live_timings()))
        }

        fn with(result: Result<Timings, TimeSourceError>) -> Self {
            Self {
                result,
                delay: Duration::ZERO,
                calls: Cell::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl TimeSource for ScriptedTimes {
        async fn fetch(&self, _date: NaiveDate, _coords: Coordinates) -> Result<Timings, TimeSourceError> {
            self.calls.set(self.calls.get() + 1);
            tokio::time::sleep(self.delay).await;
            match &self.result {
                Ok(t) => Ok(t.clone()),
                Err(TimeSourceError::Request(m)) => Err(TimeSourceError::Request(m.clone())),
                Err(TimeSourceError::Malformed(m)) => Err(TimeSourceError::Malformed(m.clone())),
                Err(TimeSourceError::Timeout) => Err(TimeSourceError::Timeout),
            }
        }
    }

    struct FixedPlace(Option<&'static str>);

    #[async_trait(?Send)]
    impl PlaceNameSource for FixedPlace {
        async fn place_name(&self, _coords: Coordinates) -> anyhow::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("lookup failed"))
        }
    }

    struct SilentPlace;

    #[async_trait(?Send)]
    impl PlaceNameSource for SilentPlace {
        async fn place_name(&self, _coords: Coordinates) -> anyhow::Result<String> {
            std::future::pending().await
        }
    }

    fn live_timings() -> Timings {
        Timings {
            fajr: "05:12".into(),
            dhuhr: "12:40".into(),
            asr: "15:58".into(),
            maghrib: "18:21".into(),
            isha: "19:44".into(),
        }
    }

    struct Harness {
        store: Rc<MemoryStore>,
        clock: Rc<FixedClock>,
        location: Rc<ScriptedLocation>,
        times: Rc<ScriptedTimes>,
        place: Option<&'static str>,
    }

    impl Harness {
        fn new(location: ScriptedLocation, times: ScriptedTimes) -> Self {
            Self {
                store: Rc::new(MemoryStore::new()),
                clock: Rc::new(FixedClock::at(today(), 8, 0, 0)),
                location: Rc::new(location),
                times: Rc::new(times),
                place: Some("Karachi"),
            }
        }

        fn resolver(&self) -> ScheduleResolver {
            ScheduleResolver::new(
                self.store.clone(),
                self.clock.clone(),
                self.location.clone(),
                Rc::new(FixedPlace(self.place)),
                self.times.clone(),
                ResolverConfig::default(),
            )
        }
    }

    fn schedule_of(state: &ResolverState) -> &Schedule {
        state.schedule.as_ref().expect("schedule published")
    }

    #[tokio::test(start_paused = true)]
    async fn live_result_is_cached_and_reused() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        let first = h.resolver().resolve(false).await;
        assert_eq!(schedule_of(&first).provenance, Provenance::Live);
        assert_eq!(first.status, ResolveStatus::Located("Karachi".into()));
        assert_eq!(first.generation, 1);

        let second = h.resolver().resolve(false).await;
        let schedule = schedule_of(&second);
        assert_eq!(schedule.provenance, Provenance::Cached);
        assert_eq!(schedule.slots, schedule_of(&first).slots);
        assert_eq!(second.status.to_string(), "Karachi");
        assert_eq!(h.location.calls.borrow().len(), 1);
        assert_eq!(h.times.calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn yesterdays_cache_is_ignored() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        h.resolver().resolve(false).await;
        h.clock.advance_days(1);

        let state = h.resolver().resolve(false).await;
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
        assert_eq!(schedule_of(&state).date, today().succ_opt().unwrap());
        assert_eq!(h.times.calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_cache_falls_through_to_live() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        h.store.set(keys::CACHED_DATE, "2026-02-10").unwrap();
        h.store
            .set(keys::CACHED_SCHEDULE, r#"[{"name":"Fajr","time":"05:00"}]"#)
            .unwrap();
        let state = h.resolver().resolve(false).await;
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_refresh_skips_cache() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        h.resolver().resolve(false).await;
        let state = h.resolver().resolve(true).await;
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
        assert_eq!(h.times.calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn low_precision_is_tried_after_high_fails() {
        let h = Harness::new(
            ScriptedLocation::new(Err(LocationFailure::Timeout), Ok(here())),
            ScriptedTimes::ok(),
        );
        let state = h.resolver().resolve(false).await;
        assert_eq!(*h.location.calls.borrow(), vec![Precision::High, Precision::Low]);
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn both_tiers_failing_uses_defaults() {
        let h = Harness::new(
            ScriptedLocation::new(
                Err(LocationFailure::Unavailable),
                Err(LocationFailure::PermissionDenied),
            ),
            ScriptedTimes::ok(),
        );
        let state = h.resolver().resolve(false).await;
        let schedule = schedule_of(&state);
        assert_eq!(schedule.provenance, Provenance::Default);
        assert_eq!(
            schedule.time_of(crate::models::PrayerType::Fajr),
            NaiveTime::from_hms_opt(5, 30, 0)
        );
        assert_eq!(state.status.to_string(), "GPS Permission Denied");
        assert_eq!(h.times.calls.get(), 0);
        assert_eq!(h.store.get(keys::CACHED_DATE).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn time_source_errors_fall_back() {
        for err in [
            TimeSourceError::Request("HTTP 500".into()),
            TimeSourceError::Timeout,
        ] {
            let h = Harness::new(
                ScriptedLocation::new(Ok(here()), Ok(here())),
                ScriptedTimes::with(Err(err)),
            );
            let state = h.resolver().resolve(false).await;
            assert_eq!(state.status, ResolveStatus::ApiError);
            assert_eq!(schedule_of(&state).provenance, Provenance::Default);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_payload_falls_back() {
        let mut bad = live_timings();
        bad.asr = String::new();
        let h = Harness::new(
            ScriptedLocation::new(Ok(here()), Ok(here())),
            ScriptedTimes::with(Ok(bad)),
        );
        let state = h.resolver().resolve(false).await;
        assert_eq!(state.status, ResolveStatus::ApiError);
        assert_eq!(h.store.get(keys::CACHED_SCHEDULE).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out_before_watchdog() {
        let mut times = ScriptedTimes::ok();
        times.delay = Duration::from_secs(30);
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), times);
        let state = h.resolver().resolve(false).await;
        assert_eq!(state.status, ResolveStatus::ApiError);
        assert_eq!(state.generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn place_name_failure_uses_generic_label() {
        let mut h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        h.place = None;
        let state = h.resolver().resolve(false).await;
        assert_eq!(state.status.to_string(), "Location Found");
        assert_eq!(h.store.get(keys::CACHED_LOCATION_NAME).unwrap(), None);
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_place_lookup_does_not_hold_back_times() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        let resolver = ScheduleResolver::new(
            h.store.clone(),
            h.clock.clone(),
            h.location.clone(),
            Rc::new(SilentPlace),
            h.times.clone(),
            ResolverConfig::default(),
        );

        let state = tokio::time::timeout(Duration::from_secs(3600), resolver.resolve(false))
            .await
            .expect("resolve returns");
        assert_eq!(state.generation, 1);
        assert_eq!(state.status, ResolveStatus::Located("Location Found".into()));
        assert_eq!(schedule_of(&state).provenance, Provenance::Live);
        assert!(h.store.get(keys::CACHED_SCHEDULE).unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_publishes_defaults_then_live_replaces() {
        let mut location = ScriptedLocation::new(Ok(here()), Ok(here()));
        location.delay = Duration::from_secs(12);
        let mut times = ScriptedTimes::ok();
        times.delay = Duration::from_secs(9);
        let h = Harness::new(location, times);

        let resolver = h.resolver();
        let mut rx = resolver.subscribe();
        let observe = async {
            loop {
                rx.changed().await.unwrap();
                let state = rx.borrow_and_update().clone();
                if state.generation == 1 {
                    return state;
                }
            }
        };
        let (first, last) = tokio::join!(observe, resolver.resolve(false));

        assert_eq!(first.status, ResolveStatus::TimedOut);
        assert_eq!(schedule_of(&first).provenance, Provenance::Default);
        assert_eq!(last.generation, 2);
        assert_eq!(schedule_of(&last).provenance, Provenance::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn late_failure_does_not_republish() {
        let mut location = ScriptedLocation::new(Ok(here()), Ok(here()));
        location.delay = Duration::from_secs(14);
        let mut times = ScriptedTimes::with(Err(TimeSourceError::Request("HTTP 503".into())));
        times.delay = Duration::from_secs(8);
        let h = Harness::new(location, times);

        let state = h.resolver().resolve(false).await;
        assert_eq!(state.generation, 1);
        assert_eq!(state.status, ResolveStatus::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_is_disarmed_after_publish() {
        let h = Harness::new(ScriptedLocation::new(Ok(here()), Ok(here())), ScriptedTimes::ok());
        let resolver = h.resolver();
        let rx = resolver.subscribe();
        let state = resolver.resolve(false).await;
        assert_eq!(state.generation, 1);

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(rx.borrow().generation, 1);
        assert_eq!(rx.borrow().status, ResolveStatus::Located("Karachi".into()));
    }
}
