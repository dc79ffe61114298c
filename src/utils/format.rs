use chrono::{Duration, NaiveTime, Timelike};

/// Format a countdown as zero-padded "HH:MM:SS". Negative input renders as zero.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format an optional clock time as "h:MM AM/PM", or "--:--" when unset.
pub fn format_time_12h(t: Option<NaiveTime>) -> String {
    match t {
        None => "--:--".to_string(),
        Some(t) => {
            let (pm, hour) = t.hour12();
            format!("{}:{:02} {}", hour, t.minute(), if pm { "PM" } else { "AM" })
        }
    }
}

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u32, total: u32, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_is_zero_padded() {
        assert_eq!(format_countdown(Duration::minutes(165)), "02:45:00");
        assert_eq!(format_countdown(Duration::seconds(59)), "00:00:59");
        assert_eq!(format_countdown(Duration::seconds(-3)), "00:00:00");
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(format_time_12h(NaiveTime::from_hms_opt(0, 5, 0)), "12:05 AM");
        assert_eq!(format_time_12h(NaiveTime::from_hms_opt(13, 15, 0)), "1:15 PM");
        assert_eq!(format_time_12h(None), "--:--");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(5, 5, 5), "█████");
        assert_eq!(progress_bar(2, 5, 5), "██░░░");
        assert_eq!(progress_bar(0, 0, 3), "░░░");
    }
}
