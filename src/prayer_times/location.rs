use anyhow::anyhow;
use async_trait::async_trait;

use crate::config::LocationConfig;
use crate::prayer_times::sources::{
    Coordinates, LocationFailure, LocationSource, PlaceNameSource, Precision,
};

/// Position taken from the `[location]` config section. Both precision tiers
/// yield the same configured point.
pub struct ConfiguredLocation {
    enabled: bool,
    coords: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn from_config(config: &LocationConfig) -> Self {
        let coords = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            enabled: config.enabled,
            coords,
        }
    }
}

#[async_trait(?Send)]
impl LocationSource for ConfiguredLocation {
    async fn resolve(&self, _precision: Precision) -> Result<Coordinates, LocationFailure> {
        if !self.enabled {
            return Err(LocationFailure::PermissionDenied);
        }
        self.coords.ok_or(LocationFailure::Unavailable)
    }
}

pub struct ConfiguredPlaceName {
    name: Option<String>,
}

impl ConfiguredPlaceName {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            name: config.name.clone().filter(|n| !n.trim().is_empty()),
        }
    }
}

#[async_trait(?Send)]
impl PlaceNameSource for ConfiguredPlaceName {
    async fn place_name(&self, _coords: Coordinates) -> anyhow::Result<String> {
        self.name.clone().ok_or_else(|| anyhow!("no place name configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_location_is_permission_denied() {
        let config = LocationConfig {
            enabled: false,
            latitude: Some(1.0),
            longitude: Some(2.0),
            name: None,
        };
        let source = ConfiguredLocation::from_config(&config);
        assert_eq!(
            source.resolve(Precision::High).await,
            Err(LocationFailure::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn missing_coordinates_are_unavailable() {
        let config = LocationConfig {
            latitude: Some(1.0),
            ..LocationConfig::default()
        };
        let source = ConfiguredLocation::from_config(&config);
        assert_eq!(
            source.resolve(Precision::Low).await,
            Err(LocationFailure::Unavailable)
        );
    }

    #[tokio::test]
    async fn blank_name_is_a_lookup_failure() {
        let config = LocationConfig {
            name: Some("  ".into()),
            ..LocationConfig::default()
        };
        let coords = Coordinates {
            latitude: 0.0,
            longitude: 0.0,
        };
        assert!(ConfiguredPlaceName::from_config(&config)
            .place_name(coords)
            .await
            .is_err());
    }
}
