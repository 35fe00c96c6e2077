use std::time::Duration;

use serde::Deserialize;
use transight_transit::Position;

use crate::markers::InterpolatorConfig;

/// Temple Meads, used when the device cannot produce a fix
pub const FALLBACK_POSITION: Position = Position::new(51.4496, -2.5811);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("nearby radius ladder must be non-empty and strictly increasing")]
    RadiusLadder,
    #[error("ease fraction must be in (0, 1], got {0}")]
    EaseFraction(f64),
    #[error("fallback position is not a valid coordinate")]
    FallbackPosition,
}

/// Client tuning. Every field has a default, so `{}` is a valid config.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    pub request_timeout_ms: u64,

    /// Radii (km) tried in order while the nearby-stops query comes back empty
    pub nearby_radii_km: Vec<f64>,
    /// Radius (km) for the live-vehicles layer shown before a stop is picked
    pub live_buses_radius_km: f64,

    pub stop_buses_interval_ms: u64,
    pub route_buses_interval_ms: u64,
    pub live_buses_interval_ms: u64,

    pub search_debounce_ms: u64,
    pub search_min_chars: usize,

    pub location_timeout_ms: u64,
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,

    pub ease_fraction: f64,
    pub ease_epsilon_deg: f64,
    pub frame_interval_ms: u64,
    pub missed_polls_before_removal: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_owned(),
            request_timeout_ms: 8_000,
            nearby_radii_km: vec![1.0, 2.0],
            live_buses_radius_km: 2.0,
            stop_buses_interval_ms: 12_000,
            route_buses_interval_ms: 10_000,
            live_buses_interval_ms: 15_000,
            search_debounce_ms: 350,
            search_min_chars: 2,
            location_timeout_ms: 10_000,
            fallback_latitude: FALLBACK_POSITION.latitude,
            fallback_longitude: FALLBACK_POSITION.longitude,
            ease_fraction: 0.1,
            ease_epsilon_deg: 1e-6,
            frame_interval_ms: 33,
            missed_polls_before_removal: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("stop_buses_interval_ms", self.stop_buses_interval_ms),
            ("route_buses_interval_ms", self.route_buses_interval_ms),
            ("live_buses_interval_ms", self.live_buses_interval_ms),
            ("location_timeout_ms", self.location_timeout_ms),
            ("frame_interval_ms", self.frame_interval_ms),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { field: *field });
        }
        if !(self.live_buses_radius_km > 0.0) {
            return Err(ConfigError::NotPositive {
                field: "live_buses_radius_km",
            });
        }

        let ladder_ok = !self.nearby_radii_km.is_empty()
            && self.nearby_radii_km.iter().all(|r| r.is_finite() && *r > 0.0)
            && self.nearby_radii_km.windows(2).all(|w| w[0] < w[1]);
        if !ladder_ok {
            return Err(ConfigError::RadiusLadder);
        }

        if !(self.ease_fraction > 0.0 && self.ease_fraction <= 1.0) {
            return Err(ConfigError::EaseFraction(self.ease_fraction));
        }
        if !self.fallback_position().is_valid() {
            return Err(ConfigError::FallbackPosition);
        }
        Ok(())
    }

    pub fn fallback_position(&self) -> Position {
        Position::new(self.fallback_latitude, self.fallback_longitude)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stop_buses_interval(&self) -> Duration {
        Duration::from_millis(self.stop_buses_interval_ms)
    }

    pub fn route_buses_interval(&self) -> Duration {
        Duration::from_millis(self.route_buses_interval_ms)
    }

    pub fn live_buses_interval(&self) -> Duration {
        Duration::from_millis(self.live_buses_interval_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn interpolator(&self) -> InterpolatorConfig {
        InterpolatorConfig {
            ease_fraction: self.ease_fraction,
            epsilon_deg: self.ease_epsilon_deg,
            missed_polls_before_removal: self.missed_polls_before_removal,
        }
    }
}
