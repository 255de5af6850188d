//! Location capability.
//!
//! Submission requires that the environment can report a location. The
//! probe answers that capability question and, when it can, supplies the
//! coordinates used for the optional approved-location query.

use async_trait::async_trait;

use crate::config::LocationConfig;
use crate::types::Coordinates;

/// Source of the user's position.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProbe: Send + Sync {
    /// Whether location access exists at all in this environment.
    fn is_available(&self) -> bool;

    /// Current position, if one can be determined.
    async fn current_position(&self) -> Option<Coordinates>;
}

/// Position fixed by configuration (or unavailable when disabled).
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    enabled: bool,
    coordinates: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(enabled: bool, coordinates: Option<Coordinates>) -> Self {
        Self {
            enabled,
            coordinates,
        }
    }

    /// Location access is present but no position is known.
    pub fn available() -> Self {
        Self::new(true, None)
    }

    pub fn unavailable() -> Self {
        Self::new(false, None)
    }

    pub fn from_config(cfg: &LocationConfig) -> Self {
        let coordinates = match (cfg.latitude, cfg.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        Self::new(cfg.enabled, coordinates)
    }
}

#[async_trait]
impl LocationProbe for ConfiguredLocation {
    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn current_position(&self) -> Option<Coordinates> {
        if self.enabled {
            self.coordinates
        } else {
            None
        }
    }
}
