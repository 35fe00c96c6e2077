use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use transight_core::location::{PositionSensor, SensorError};
use transight_core::transit::Position;

use super::records::GeoPoint;

#[derive(Clone, Debug, thiserror::Error, uniffi::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("no position available")]
    Unavailable,
    #[error("{message}")]
    Failed { message: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for LocationError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Failed {
            message: error.reason,
        }
    }
}

impl From<LocationError> for SensorError {
    fn from(error: LocationError) -> Self {
        match error {
            LocationError::PermissionDenied => Self::PermissionDenied,
            LocationError::Unavailable => Self::Unavailable,
            LocationError::Failed { message } => Self::Provider(message),
        }
    }
}

/// Platform location provider. Called from a blocking worker, so the
/// implementation may wait for the first fix.
#[uniffi::export(with_foreign)]
pub trait DeviceLocation: Send + Sync {
    fn current_position(&self) -> Result<GeoPoint, LocationError>;
}

pub(crate) struct DeviceSensor {
    device: Arc<dyn DeviceLocation>,
}

impl DeviceSensor {
    pub(crate) fn new(device: Arc<dyn DeviceLocation>) -> Self {
        Self { device }
    }
}

impl PositionSensor for DeviceSensor {
    fn current_position<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Position, SensorError>> + Send + 'a>> {
        let device = Arc::clone(&self.device);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || device.current_position())
                .await
                .map_err(|e| SensorError::Provider(e.to_string()))?
                .map(Position::from)
                .map_err(SensorError::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<GeoPoint, LocationError>);

    impl DeviceLocation for Fixed {
        fn current_position(&self) -> Result<GeoPoint, LocationError> {
            self.0.clone()
        }
    }

    fn sensor(answer: Result<GeoPoint, LocationError>) -> DeviceSensor {
        DeviceSensor::new(Arc::new(Fixed(answer)))
    }

    #[tokio::test]
    async fn device_fix_becomes_position() {
        let point = GeoPoint {
            latitude: 51.4545,
            longitude: -2.5879,
        };
        let position = sensor(Ok(point)).current_position().await.unwrap();
        assert_eq!(position, Position::new(51.4545, -2.5879));
    }

    #[tokio::test]
    async fn denial_is_reported_as_sensor_error() {
        let result = sensor(Err(LocationError::PermissionDenied))
            .current_position()
            .await;
        assert_eq!(result, Err(SensorError::PermissionDenied));
    }

    #[tokio::test]
    async fn provider_failure_keeps_message() {
        let result = sensor(Err(LocationError::Failed {
            message: "gps off".into(),
        }))
        .current_position()
        .await;
        assert_eq!(result, Err(SensorError::Provider("gps off".into())));
    }
}
