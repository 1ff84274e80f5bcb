//! Geometric matcher: snap to segment, score by distance + bearing.

use crate::chunk::Chunk;
use crate::config::MatcherConfig;
use crate::geo::{angular_difference, closest_point_on_polyline, LatLon};
use crate::grid::{cell_for_point, neighborhood_cell_ids, segments_in_cell};

/// A match result: the accepted segment, its containing chunk, and the
/// geometry/bearing that produced it.
#[derive(Debug, Clone)]
pub struct RoadIndexMatch {
    pub chunk_index: usize,
    pub segment_index: usize,
    pub name: String,
    pub distance_meters: f64,
    pub bearing_degrees: f64,
    pub snapped_location: LatLon,
    pub score: f64,
}

/// Score every candidate segment in the 3×3 cell neighborhood across the
/// given chunks, and return the best (lowest-score) match, or `None`.
///
/// Pure function: no state is read or mutated. Ties are broken by
/// first-encountered candidate.
pub fn match_on(
    location: LatLon,
    heading: Option<f64>,
    chunks: &[&Chunk],
    config: &MatcherConfig,
) -> Option<RoadIndexMatch> {
    let mut best: Option<RoadIndexMatch> = None;

    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let (cx, cy) = cell_for_point(chunk, location);
        for id in neighborhood_cell_ids(chunk, cx, cy) {
            for &segment_index in segments_in_cell(chunk, id) {
                let segment = &chunk.segments[segment_index as usize];
                let Some(polyline) = chunk.segment_polyline(segment) else {
                    continue;
                };
                let Some(hit) = closest_point_on_polyline(location, &polyline) else {
                    continue;
                };
                if hit.distance_meters > config.search_radius_meters {
                    continue;
                }

                let bearing_diff = match heading {
                    Some(h) => angular_difference(h, hit.bearing_degrees),
                    None => 0.0,
                };
                if heading.is_some() && bearing_diff > config.max_bearing_difference {
                    continue;
                }

                let score = hit.distance_meters + config.bearing_weight * bearing_diff;

                let is_better = match &best {
                    Some(b) => score < b.score,
                    None => true,
                };
                if is_better {
                    best = Some(RoadIndexMatch {
                        chunk_index,
                        segment_index: segment_index as usize,
                        name: chunk.segment_name(segment).to_string(),
                        distance_meters: hit.distance_meters,
                        bearing_degrees: hit.bearing_degrees,
                        snapped_location: hit.snapped,
                        score,
                    });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{CellEntry, Node, Segment};
    use crate::grid::cell_id;

    fn two_parallel_segments_chunk() -> Chunk {
        // A at ~42m east of origin, B at ~170m east — A should win.
        let nodes = vec![
            Node { lat_e7: 400_000_000, lon_e7: -730_005_000, edge_start: 0, edge_count: 0 },
            Node { lat_e7: 400_010_000, lon_e7: -730_005_000, edge_start: 0, edge_count: 0 },
            Node { lat_e7: 400_000_000, lon_e7: -730_020_000, edge_start: 0, edge_count: 0 },
            Node { lat_e7: 400_010_000, lon_e7: -730_020_000, edge_start: 0, edge_count: 0 },
        ];
        let segments = vec![
            Segment { name_index: 0, node_a: 0, node_b: 1, shape_start: 0, shape_count: 0, flags: 0, bearing_ab: 0, bearing_ba: 180 },
            Segment { name_index: 1, node_a: 2, node_b: 3, shape_start: 0, shape_count: 0, flags: 0, bearing_ab: 0, bearing_ba: 180 },
        ];
        Chunk {
            origin_lat: 40.0,
            origin_lon: -73.0,
            cell_size_meters: 500.0,
            grid_width: 4,
            grid_height: 4,
            strings: vec!["A".to_string(), "B".to_string()],
            nodes,
            segments,
            shapes: vec![],
            node_edges: vec![],
            cell_entries: vec![CellEntry { cell_id: cell_id(0, 0), seg_start: 0, seg_count: 2 }],
            cell_segments: vec![0, 1],
        }
    }

    #[test]
    fn closer_parallel_segment_wins() {
        let chunk = two_parallel_segments_chunk();
        let q = LatLon::new(40.0, -73.0);
        let m = match_on(q, None, &[&chunk], &MatcherConfig::default()).unwrap();
        assert_eq!(m.name, "A");
    }

    #[test]
    fn no_candidate_within_radius_returns_none() {
        let chunk = two_parallel_segments_chunk();
        let far = LatLon::new(41.0, -73.0);
        let tight = MatcherConfig {
            search_radius_meters: 10.0,
            ..Default::default()
        };
        assert!(match_on(far, None, &[&chunk], &tight).is_none());
    }

    #[test]
    fn heading_outside_tolerance_drops_candidate() {
        let chunk = two_parallel_segments_chunk();
        let q = LatLon::new(40.0, -73.0);
        // Segment runs north-south (bearing 0/180); a due-east heading is 90
        // degrees off, beyond the default 60 degree tolerance.
        let m = match_on(q, Some(90.0), &[&chunk], &MatcherConfig::default());
        assert!(m.is_none());
    }

    #[test]
    fn scoring_monotonic_in_distance_and_bearing() {
        let config = MatcherConfig::default();
        let near_aligned = 5.0 + config.bearing_weight * 0.0;
        let far_aligned = 20.0 + config.bearing_weight * 0.0;
        assert!(near_aligned < far_aligned);

        let near_misaligned = 5.0 + config.bearing_weight * 30.0;
        assert!(near_aligned < near_misaligned);
    }

    #[test]
    fn cell_neighborhood_locality() {
        // A segment placed far outside the 3x3 neighborhood of q must not
        // affect the result.
        let mut chunk = two_parallel_segments_chunk();
        chunk.nodes.push(Node { lat_e7: 405_000_000, lon_e7: -735_000_000, edge_start: 0, edge_count: 0 });
        chunk.nodes.push(Node { lat_e7: 405_010_000, lon_e7: -735_000_000, edge_start: 0, edge_count: 0 });
        chunk.segments.push(Segment { name_index: 0, node_a: 4, node_b: 5, shape_start: 0, shape_count: 0, flags: 0, bearing_ab: 0, bearing_ba: 180 });
        chunk.cell_segments.push(2);
        chunk.cell_entries.push(CellEntry { cell_id: cell_id(3, 3), seg_start: 2, seg_count: 1 });

        let q = LatLon::new(40.0, -73.0);
        let m = match_on(q, None, &[&chunk], &MatcherConfig::default()).unwrap();
        assert_eq!(m.name, "A");
    }
}
