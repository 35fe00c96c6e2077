mod logging;
pub mod state;

pub use state::view::location::{DeviceLocation, LocationError};
pub use state::view::{LiveMap, MapError};

uniffi::setup_scaffolding!();

/// Install logging and the panic hook.
/// Safe to call more than once; [`LiveMap::new`] calls it too.
#[uniffi::export]
pub fn init_logging() {
    logging::setup_logging();
}
