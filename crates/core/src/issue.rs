use transight_transit::TransitError;

/// Non-blocking problems the UI may hint at. None of these stop the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ClientIssue {
    /// Showing the fallback coordinate
    LocationUnavailable,
    /// Last poll failed; older data still shown
    NetworkTransient,
    /// Valid response with nothing in it
    EmptyResult,
}

impl ClientIssue {
    /// Classify a feed failure. Anything other than a missing resource is
    /// shown as transient: the next tick retries regardless.
    pub fn from_error(error: &TransitError) -> Self {
        if error.is_not_found() {
            Self::EmptyResult
        } else {
            Self::NetworkTransient
        }
    }
}
