pub mod context;
pub mod watch;

pub use context::AppContext;
