//! Smoothly animated vehicle markers.

pub mod animation;
pub mod interpolate;

pub use animation::{MarkerFrame, VehicleFeeds, VehicleLayer, spawn_animation};
pub use interpolate::{InterpolatorConfig, Marker, MarkerInterpolator, SnapshotDelta, interpolate};
