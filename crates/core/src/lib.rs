//! Live transit map client.
//!
//! [`LiveMapSession`] is the entry point: it acquires the device location,
//! polls the prediction service through one [`PollingDataSource`] per feed,
//! tracks navigation in a [`ViewStateMachine`] and publishes animated
//! vehicle markers.

pub mod backend;
pub mod camera;
pub mod color;
pub mod config;
pub mod feed;
pub mod issue;
pub mod location;
pub mod markers;
pub mod nearby;
pub mod search;
pub mod session;
pub mod view;

pub use backend::{HttpBackend, ReqwestFetcher};
pub use camera::{CameraController, CameraEvent, CameraMove, Zoom};
pub use color::route_color;
pub use config::{ClientConfig, ConfigError};
pub use feed::{FeedState, PollSnapshot, PollingDataSource, Schedule};
pub use issue::ClientIssue;
pub use location::{FallbackReason, LocationFix, LocationSource, PositionSensor, SensorError};
pub use markers::{Marker, MarkerFrame, MarkerInterpolator, VehicleLayer};
pub use nearby::{AreaQuery, NearbyStops};
pub use search::{SearchIndexClient, SearchOutcome};
pub use session::{BusesPanel, LiveMapSession, SessionSnapshot, StopsPanel};
pub use view::{Transition, ViewError, ViewEvent, ViewLevel, ViewState, ViewStateMachine};

// Re-export transit from the transit crate
pub use transight_transit as transit;
