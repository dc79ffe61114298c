use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::str::FromStr;

use crate::app::{watch, AppContext};
use crate::models::{DailyCount, DayProgress, PrayerType, Schedule, Theme};
use crate::schedule::{find_next, NextEvent};
use crate::utils::format::{format_time_12h, progress_bar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Starting async runtime")
}

/// Accepts a prayer name or its position (0 = Fajr ... 4 = Isha).
fn parse_prayer_index(raw: &str) -> Result<usize> {
    if let Ok(index) = raw.trim().parse::<usize>() {
        return Ok(index);
    }
    let prayer = PrayerType::from_str(raw).with_context(|| {
        format!("Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha or 0-4", raw)
    })?;
    Ok(prayer.index())
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub fn handle_times(ctx: &AppContext, refresh: bool) -> Result<()> {
    let resolver = ctx.resolver()?;
    let state = runtime()?.block_on(resolver.resolve(refresh));

    let now = ctx.clock.now();
    let schedule = state
        .schedule
        .clone()
        .unwrap_or_else(|| Schedule::unresolved(now.date()));
    let completed = ctx.daily().completed();
    let next = find_next(&schedule, now.time());

    println!();
    println_colored!(
        GOLD,
        "  Prayer Times | {} ({})",
        state.status,
        schedule.date.format("%Y-%m-%d")
    );
    println_colored!(DIM, "  source: {}", schedule.provenance.as_str());
    println!();

    for slot in &schedule.slots {
        let mark = if completed[slot.prayer.index()] { "✓" } else { " " };
        let line = format!(
            "  {} {:<10}  {}",
            mark,
            slot.prayer.display_name(),
            format_time_12h(slot.time)
        );
        let is_next = next.remaining().is_some() && next.prayer() == slot.prayer;
        let is_past = slot.time.is_some_and(|t| t <= now.time());
        if is_next {
            println_colored!(AMBER, "{}", line);
        } else if is_past {
            println_colored!(DIM, "{}", line);
        } else {
            println_colored!(BOLD, "{}", line);
        }
    }

    println!();
    match next {
        NextEvent::Upcoming { .. } => {
            println_colored!(AMBER, "  Next: {} in {}", next.label(), next.countdown());
        }
        NextEvent::Tomorrow => {
            println_colored!(DIM, "  Next: {}. {}", next.label(), next.countdown());
        }
    }
    println!();
    Ok(())
}

// ─── Watch ───────────────────────────────────────────────────────────────────

pub fn handle_watch(ctx: &AppContext) -> Result<()> {
    runtime()?.block_on(watch::run(ctx))
}

// ─── Daily checklist ─────────────────────────────────────────────────────────

pub fn handle_toggle(ctx: &AppContext, prayer: &str) -> Result<()> {
    let index = parse_prayer_index(prayer)?;
    let mut daily = ctx.daily();
    let mut history = ctx.history();
    let outcome = daily.toggle(index, &mut history)?;

    if outcome.completed {
        println_colored!(
            GREEN,
            "  ✓ {} marked as done ({}/5)",
            outcome.prayer.display_name(),
            outcome.count
        );
    } else {
        println_colored!(
            DIM,
            "  {} marked as not done ({}/5)",
            outcome.prayer.display_name(),
            outcome.count
        );
    }
    if outcome.all_complete {
        println_colored!(GOLD, "  All five prayers complete today. Alhamdulillah!");
    }
    Ok(())
}

pub fn handle_status(ctx: &AppContext) -> Result<()> {
    let mut daily = ctx.daily();
    let completed = daily.completed();
    let count = daily.count();

    println!();
    println_colored!(GOLD, "  Today ({})", daily.date().format("%Y-%m-%d"));
    println!();
    for prayer in PrayerType::all() {
        if completed[prayer.index()] {
            println_colored!(GREEN, "  [✓] {}", prayer.display_name());
        } else {
            println_colored!(DIM, "  [ ] {}", prayer.display_name());
        }
    }
    println!();
    println!("  {} {}/5", progress_bar(count as u32, 5, 20), count);
    if daily.progress() == DayProgress::Complete {
        println_colored!(GOLD, "  All done for today");
    }
    println!();
    Ok(())
}

pub fn handle_assign(ctx: &AppContext, date: &str, prayers: &[String]) -> Result<()> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date))?;
    let chosen = prayers
        .iter()
        .map(|p| PrayerType::from_str(p))
        .collect::<Result<Vec<_>>>()?;

    let mut history = ctx.history();
    history.assign_day(date, &chosen)?;

    println_colored!(
        GREEN,
        "  ✓ Recorded {}/5 for {}",
        history.count_for(date),
        date.format("%Y-%m-%d")
    );
    Ok(())
}

// ─── Stats ───────────────────────────────────────────────────────────────────

fn level_color(level: u8) -> &'static str {
    match level {
        3 => GREEN,
        1 | 2 => AMBER,
        _ => DIM,
    }
}

pub fn handle_stats(ctx: &AppContext, week: bool, grid: bool) -> Result<()> {
    let history = ctx.history();
    let today = ctx.clock.today();

    println!();
    println_colored!(GOLD, "  Statistics");
    println!();
    println_colored!(BOLD, "  Streak:  {} days", history.streak());
    println!("  Total:   {} prayers", history.total());
    let today_count = DailyCount {
        date: today,
        prayers_done: history.count_for(today),
    };
    println!(
        "  Today:   {}/5 ({:.0}%)",
        today_count.prayers_done,
        today_count.completion_ratio() * 100.0
    );

    if week {
        println!();
        println_colored!(DIM, "  Last 7 days");
        println!();
        for day in history.weekly() {
            let names = history
                .details_for(day.date)
                .map(|set| set.iter().map(|p| p.display_name()).collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            let line = format!(
                "  {}  {}  {}/5  {}",
                day.date.format("%a %m-%d"),
                progress_bar(day.prayers_done as u32, 5, 10),
                day.prayers_done,
                names
            );
            println_colored!(level_color(day.level()), "{}", line);
        }
    }

    if grid {
        println!();
        println_colored!(DIM, "  Last 28 days  (● = 5/5, ◕ = 3-4, ◑ = 1-2, ○ = 0/5)");
        println!();
        let days: Vec<_> = history.range_counts(27, 0).collect();
        for row in days.chunks(7) {
            print!("  ");
            for day in row {
                let icon = match day.level() {
                    3 => "●",
                    2 => "◕",
                    1 => "◑",
                    _ => "○",
                };
                print!("{}{}\x1b[0m ", level_color(day.level()), icon);
            }
            println!();
        }
    }

    println!();
    Ok(())
}

// ─── Theme ───────────────────────────────────────────────────────────────────

pub fn handle_theme(ctx: &AppContext, value: Option<&str>) -> Result<()> {
    let theme = match value {
        None => {
            println!("  Theme: {}", ctx.theme());
            return Ok(());
        }
        Some(v) if v.trim().eq_ignore_ascii_case("toggle") => ctx.theme().toggled(),
        Some(v) => Theme::from_str(v)?,
    };
    ctx.set_theme(theme);
    println_colored!(GREEN, "  ✓ Theme set to {}", theme);
    Ok(())
}
