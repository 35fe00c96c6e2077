//! Degree-space radii for the R-tree pre-filter.
//!
//! Exact distances come from [`Position::distance_m`](crate::models::Position::distance_m).

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Convert meters to degrees at equator (for bounding box queries)
pub fn meters_to_degrees_approx(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Radius in degrees that covers `meters` in every direction at `latitude`.
///
/// A degree of longitude shrinks with cos(latitude), so the radius is scaled
/// up to match; the haversine pass trims the extra candidates.
pub fn search_radius_degrees(latitude: f64, meters: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    meters_to_degrees_approx(meters) / cos_lat
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_one_degree_of_latitude() {
        assert_relative_eq!(meters_to_degrees_approx(111_320.0), 1.0);
    }

    #[test]
    fn test_search_radius_widens_with_latitude() {
        let equator = search_radius_degrees(0.0, 1000.0);
        let bristol = search_radius_degrees(51.45, 1000.0);

        assert_relative_eq!(equator, meters_to_degrees_approx(1000.0));
        assert!(bristol > equator * 1.5);
    }
}
