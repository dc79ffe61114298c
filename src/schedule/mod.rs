pub mod next_event;
pub mod resolver;

pub use next_event::{find_next, NextEvent, NextEventScheduler, Tick};
pub use resolver::{ResolveStatus, ResolverState, ScheduleResolver};
