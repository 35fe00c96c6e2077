//! R-tree nodes for spatial indexing.
//!
//! Wraps stops with their coordinates for nearby-stop queries.
//!
//! ## Two-Stage Filtering
//!
//! The spatial queries use a two-stage filtering approach:
//! 1. **R-tree filter**: Euclidean distance in degrees, with the search radius
//!    widened for the latitude so no candidate is dropped east or west
//! 2. **Haversine filter**: accurate geodesic distance on the candidates

use std::sync::Arc;
use rstar::{RTreeObject, AABB, PointDistance};

use crate::models::Stop;

// ============================================================================
// Stop Spatial Node
// ============================================================================

#[derive(Clone)]
pub struct StopNode {
    pub stop: Arc<Stop>,
    point: [f64; 2],
}

impl StopNode {
    pub fn new(stop: Arc<Stop>) -> Self {
        let point = [stop.position.longitude, stop.position.latitude];
        Self { stop, point }
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

#[cfg(test)]
mod tests {
    use rstar::RTree;

    use super::*;
    use crate::identifiers::StopIdentifier;
    use crate::models::Position;

    fn stop(id: &str, latitude: f64, longitude: f64) -> Arc<Stop> {
        Arc::new(Stop {
            id: StopIdentifier::new(id),
            name: id.into(),
            locality: "".into(),
            indicator: "".into(),
            position: Position::new(latitude, longitude),
            distance_km: None,
        })
    }

    #[test]
    fn test_nodes_are_indexed_lon_lat() {
        let tree = RTree::bulk_load(vec![
            StopNode::new(stop("far", 51.50, -2.58)),
            StopNode::new(stop("near", 51.455, -2.588)),
        ]);

        let nearest = tree.nearest_neighbor(&[-2.5879, 51.4545]).unwrap();
        assert_eq!(nearest.stop.id.as_str(), "near");
    }
}
