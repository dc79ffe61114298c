pub mod settings;

pub use settings::{
    AppConfig, CalculationConfig, LocationConfig, NotificationConfig, ResolverConfig,
    SchedulerConfig,
};
