//! Stable colour per route.

use palette::{FromColor, Hsl, Srgb};
use transight_transit::RouteIdentifier;
use twox_hash::XxHash64;

const ROUTE_COLOR_SEED: u64 = 0x7261_6e73;
const SATURATION: f32 = 0.65;
const LIGHTNESS: f32 = 0.45;

/// The same route always maps to the same colour, on every device.
pub fn route_rgb(route: &RouteIdentifier) -> Srgb<u8> {
    let key = route.as_str().trim().to_uppercase();
    let hash = XxHash64::oneshot(ROUTE_COLOR_SEED, key.as_bytes());
    let hue = (hash % 360) as f32;

    Srgb::from_color(Hsl::new(hue, SATURATION, LIGHTNESS)).into_format::<u8>()
}

/// `#rrggbb`
pub fn route_color(route: &RouteIdentifier) -> String {
    let rgb = route_rgb(route);
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}
