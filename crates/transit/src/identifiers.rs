//! Typed identifiers for stops, vehicles and routes.
//!
//! The service hands out ids as plain strings. Each kind gets its own type so
//! a bus id can never be passed where a stop id is expected, while all of
//! them share one `Arc<str>` representation: the same id is held by a feed
//! snapshot, the view state and a marker at once, and cloning it must not
//! copy the string.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Names an identifier kind for debug output.
pub trait IdentifierKind {
    const NAME: &'static str;
}

pub enum StopKind {}
pub enum VehicleKind {}
pub enum RouteKind {}

impl IdentifierKind for StopKind {
    const NAME: &'static str = "StopIdentifier";
}

impl IdentifierKind for VehicleKind {
    const NAME: &'static str = "VehicleIdentifier";
}

impl IdentifierKind for RouteKind {
    const NAME: &'static str = "RouteIdentifier";
}

pub struct Identifier<K> {
    value: Arc<str>,
    kind: PhantomData<fn() -> K>,
}

/// NaPTAN/ATCO code of a stop
pub type StopIdentifier = Identifier<StopKind>;
/// Operator-assigned vehicle reference
pub type VehicleIdentifier = Identifier<VehicleKind>;
/// Public route number, e.g. `72` or `N1`
pub type RouteIdentifier = Identifier<RouteKind>;

impl<K> Identifier<K> {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self {
            value: s.as_ref().into(),
            kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Blank ids come from records the service could not match; they are
    /// never shown.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl<K> Clone for Identifier<K> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            kind: PhantomData,
        }
    }
}

impl<K> PartialEq for Identifier<K> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value) || self.value == other.value
    }
}

impl<K> Eq for Identifier<K> {}

impl<K> PartialOrd for Identifier<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Identifier<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<K> Hash for Identifier<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: IdentifierKind> fmt::Debug for Identifier<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(K::NAME).field(&self.value).finish()
    }
}

impl<K> fmt::Display for Identifier<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> AsRef<str> for Identifier<K> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<K> From<String> for Identifier<K> {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl<K> From<&str> for Identifier<K> {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
