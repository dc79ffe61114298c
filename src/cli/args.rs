use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sajjda", version, author, about = "Daily prayer schedule, countdown and progress tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show today's prayer times and the countdown to the next one
    Times {
        /// Ignore today's cached schedule and resolve again
        #[arg(long)]
        refresh: bool,
    },
    /// Live countdown with a notification when each prayer is due (Ctrl-C to stop)
    Watch,
    /// Toggle a prayer as done / not done for today
    Toggle {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha) or index 0-4
        prayer: String,
    },
    /// Show today's checklist
    Status,
    /// Record which prayers were prayed on a day (today up to two days ahead)
    Assign {
        /// Date as YYYY-MM-DD
        date: String,
        /// Prayer names; none clears the day
        prayers: Vec<String>,
    },
    /// Show streak and history
    Stats {
        /// Bar chart for the last 7 days
        #[arg(long)]
        week: bool,
        /// Heat grid for the last 28 days
        #[arg(long)]
        grid: bool,
    },
    /// Show, toggle or set the theme preference
    Theme {
        /// light, dark or toggle; omit to show the current one
        value: Option<String>,
    },
}
