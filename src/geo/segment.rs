//! Closest-point-on-polyline / closest-point-on-segment.

use super::bearing::{bearing_degrees, from_local_meters, to_local_meters};
use super::point::LatLon;

/// A hit from projecting a query point onto a polyline edge.
#[derive(Debug, Clone, Copy)]
pub struct PolylineHit {
    pub snapped: LatLon,
    pub distance_meters: f64,
    /// Bearing of the edge `(a, b)` the hit landed on — not the bearing from
    /// the query point to the snap point.
    pub bearing_degrees: f64,
}

/// Closest point on a polyline to `point`. Polylines shorter than 2 points
/// have no hit. Zero-length edges are skipped, not fatal. Ties (equal
/// distance) are broken by first-encountered edge.
pub fn closest_point_on_polyline(point: LatLon, polyline: &[LatLon]) -> Option<PolylineHit> {
    if polyline.len() < 2 {
        return None;
    }

    let mut best: Option<PolylineHit> = None;

    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(hit) = closest_point_on_edge(point, a, b) {
            match &best {
                Some(b) if b.distance_meters <= hit.distance_meters => {}
                _ => best = Some(hit),
            }
        }
    }

    best
}

/// Closest point on a single edge `(a, b)` to `point`, or `None` if the edge
/// has zero length.
fn closest_point_on_edge(point: LatLon, a: LatLon, b: LatLon) -> Option<PolylineHit> {
    let (ax, ay) = to_local_meters(point, a);
    let (bx, by) = to_local_meters(point, b);

    let ex = bx - ax;
    let ey = by - ay;
    let len_sq = ex * ex + ey * ey;
    if len_sq == 0.0 {
        return None;
    }

    // point is the origin of the local frame, so p - a = (-ax, -ay).
    let t = ((-ax) * ex + (-ay) * ey) / len_sq;
    let t = t.clamp(0.0, 1.0);

    let qx = ax + t * ex;
    let qy = ay + t * ey;
    let distance = (qx * qx + qy * qy).sqrt();
    let snapped = from_local_meters(point, qx, qy);

    Some(PolylineHit {
        snapped,
        distance_meters: distance,
        bearing_degrees: bearing_degrees(a, b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_polyline_has_no_hit() {
        assert!(closest_point_on_polyline(LatLon::new(0.0, 0.0), &[]).is_none());
        assert!(closest_point_on_polyline(LatLon::new(0.0, 0.0), &[LatLon::new(1.0, 1.0)])
            .is_none());
    }

    #[test]
    fn projects_onto_nearest_edge() {
        let poly = [
            LatLon::new(40.0, -73.0),
            LatLon::new(40.001, -73.0),
            LatLon::new(40.002, -73.001),
        ];
        let hit = closest_point_on_polyline(LatLon::new(40.0005, -72.9995), &poly).unwrap();
        assert!(hit.distance_meters < 50.0);
    }

    #[test]
    fn zero_length_edge_is_skipped() {
        let poly = [
            LatLon::new(40.0, -73.0),
            LatLon::new(40.0, -73.0),
            LatLon::new(40.001, -73.0),
        ];
        let hit = closest_point_on_polyline(LatLon::new(40.0005, -73.0), &poly);
        assert!(hit.is_some());
    }

    #[test]
    fn bearing_is_of_the_edge_not_the_snap_vector() {
        // Edge running due north; query point is well east of it.
        let a = LatLon::new(40.0, -73.0);
        let b = LatLon::new(40.001, -73.0);
        let hit = closest_point_on_edge(LatLon::new(40.0005, -72.99), a, b).unwrap();
        assert!(hit.bearing_degrees.abs() < 1.0 || (hit.bearing_degrees - 360.0).abs() < 1.0);
    }
}
