pub mod calculator;
pub mod location;
pub mod sources;

pub use calculator::SalahTimeSource;
pub use location::{ConfiguredLocation, ConfiguredPlaceName};
pub use sources::{
    Coordinates, LocationFailure, LocationSource, PlaceNameSource, Precision, TimeSource,
    TimeSourceError, Timings,
};
