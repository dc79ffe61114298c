use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::future::Future;
use std::io::Write;
use tokio::time::MissedTickBehavior;

use crate::app::AppContext;
use crate::notify::{deliver, Notifier};
use crate::schedule::{NextEventScheduler, ResolverState, ScheduleResolver, Tick};
use crate::tracker::DailyState;

/// Per-tick work of the `watch` loop, kept free of I/O timing so it can be
/// driven directly.
pub struct Watcher<N: Notifier> {
    daily: DailyState,
    scheduler: NextEventScheduler,
    notifier: N,
}

impl<N: Notifier> Watcher<N> {
    pub fn new(daily: DailyState, notifier: N, grace: Duration) -> Self {
        Self {
            daily,
            scheduler: NextEventScheduler::new(grace),
            notifier,
        }
    }

    pub fn on_tick(&mut self, state: &ResolverState, now: NaiveDateTime) -> Tick {
        self.daily.reload();
        if self.daily.check_rollover() {
            info!("progress reset for {}", now.date());
        }
        // yesterday's times stay unused until today's resolution lands
        let today = state.schedule.as_ref().filter(|s| s.date == now.date());
        let tick = self.scheduler.tick(today, now);
        if let Some(request) = &tick.notification {
            deliver(&self.notifier, request);
        }
        tick
    }

    pub fn completed_count(&mut self) -> u8 {
        self.daily.reload();
        self.daily.count()
    }
}

pub fn status_line(tick: &Tick, state: &ResolverState, done: u8) -> String {
    format!(
        "{:<16} {:>16}  [{}/5]  {}",
        tick.event.label(),
        tick.event.countdown(),
        done,
        state.status
    )
}

/// Which day the in-flight (or last) resolution is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    day: NaiveDate,
    settled: bool,
}

impl Resolution {
    pub fn started(day: NaiveDate) -> Self {
        Self { day, settled: false }
    }

    pub fn settle(&mut self) {
        self.settled = true;
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Start over for `today` if the settled resolution belongs to an
    /// earlier day. An unsettled one is left to finish first.
    pub fn restart_if_stale(&mut self, today: NaiveDate) -> bool {
        if !self.settled || self.day == today {
            return false;
        }
        *self = Self::started(today);
        true
    }
}

/// Resolve today's schedule, then tick until Ctrl-C.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let resolver = ctx.resolver()?;
    let notifier = ctx.notifier();
    notifier.request_permission();

    let grace = Duration::seconds(ctx.config.scheduler.due_grace_secs);
    let mut watcher = Watcher::new(ctx.daily(), notifier, grace);
    let mut out = std::io::stdout();
    drive(ctx, &resolver, &mut watcher, tokio::signal::ctrl_c(), &mut out).await;
    info!("watch stopped");
    Ok(())
}

async fn drive<N, F, W>(
    ctx: &AppContext,
    resolver: &ScheduleResolver,
    watcher: &mut Watcher<N>,
    shutdown: F,
    out: &mut W,
) where
    N: Notifier,
    F: Future,
    W: Write,
{
    let rx = resolver.subscribe();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
        ctx.config.scheduler.tick_ms.max(1),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut resolving = Box::pin(resolver.resolve(false));
    let mut resolution = Resolution::started(ctx.clock.today());

    loop {
        tokio::select! {
            _ = &mut resolving, if !resolution.is_settled() => {
                resolution.settle();
                debug!("resolution settled");
            }
            _ = ticker.tick() => {
                let now = ctx.clock.now();
                if resolution.restart_if_stale(now.date()) {
                    info!("date changed to {}, resolving again", now.date());
                    resolving = Box::pin(resolver.resolve(false));
                }

                let state = rx.borrow().clone();
                let tick = watcher.on_tick(&state, now);
                let done = watcher.completed_count();
                if tick.notification.is_some() {
                    let _ = writeln!(out);
                }
                let _ = write!(out, "\r{}   ", status_line(&tick, &state, done));
                let _ = out.flush();
            }
            _ = &mut shutdown => {
                let _ = writeln!(out);
                break;
            }
        }
    }
}
