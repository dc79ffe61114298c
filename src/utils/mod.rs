pub mod clock;
pub mod format;

pub use clock::{Clock, SystemClock};
