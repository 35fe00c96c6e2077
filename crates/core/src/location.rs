//! One-shot device position with a fixed fallback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use transight_transit::Position;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("no position available")]
    Unavailable,
    #[error("location provider failed: {0}")]
    Provider(String),
}

/// The device geolocation sensor.
pub trait PositionSensor: Send + Sync {
    fn current_position<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Position, SensorError>> + Send + 'a>>;
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error("timed out")]
    Timeout,
    #[error("invalid coordinate")]
    InvalidPosition,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocationFix {
    Located(Position),
    Fallback {
        position: Position,
        reason: FallbackReason,
    },
}

impl LocationFix {
    pub fn position(&self) -> Position {
        match self {
            Self::Located(position) | Self::Fallback { position, .. } => *position,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

pub struct LocationSource {
    sensor: Arc<dyn PositionSensor>,
    timeout: Duration,
    fallback: Position,
    error: AtomicBool,
}

impl LocationSource {
    pub fn new(sensor: Arc<dyn PositionSensor>, timeout: Duration, fallback: Position) -> Self {
        Self {
            sensor,
            timeout,
            fallback,
            error: AtomicBool::new(false),
        }
    }

    /// Whether the last acquisition fell back to the fixed coordinate
    pub fn location_error(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }

    pub async fn acquire(&self) -> LocationFix {
        let outcome = tokio::time::timeout(self.timeout, self.sensor.current_position()).await;

        let reason = match outcome {
            Ok(Ok(position)) if position.is_valid() => {
                self.error.store(false, Ordering::Relaxed);
                tracing::info!(
                    lat = position.latitude,
                    lon = position.longitude,
                    "location acquired"
                );
                return LocationFix::Located(position);
            }
            Ok(Ok(_)) => FallbackReason::InvalidPosition,
            Ok(Err(error)) => FallbackReason::Sensor(error),
            Err(_) => FallbackReason::Timeout,
        };

        self.error.store(true, Ordering::Relaxed);
        tracing::warn!(%reason, "location unavailable, using fallback position");
        LocationFix::Fallback {
            position: self.fallback,
            reason,
        }
    }
}
