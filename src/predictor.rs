//! Next-road predictor: forward-node traversal across the node-edge graph.

use crate::chunk::{Chunk, Node};
use crate::config::PredictorConfig;
use crate::geo::{
    angular_difference, bearing_degrees, haversine_distance, point_along_heading, to_local_meters,
};
use crate::matcher::RoadIndexMatch;

/// The most plausible next segment given heading and the forward node.
#[derive(Debug, Clone)]
pub struct RoadIndexNext {
    pub name: String,
    pub segment_index: usize,
    /// Carries the candidate's score, not a true distance — preserved
    /// verbatim as a determinism-ensuring design choice.
    pub distance_meters: f64,
    pub confidence: f64,
}

/// Predict the next road given an accepted match, a heading, and the chunk
/// that match's segment lives in. Pure function; expresses "no result"
/// instead of erroring.
pub fn match_next(
    current: &RoadIndexMatch,
    heading: Option<f64>,
    chunk: &Chunk,
    config: &PredictorConfig,
) -> Option<RoadIndexNext> {
    let heading = heading?;
    let seg = chunk.segments.get(current.segment_index)?;

    // Forward node: whichever end's reference bearing is closer to heading.
    // `<=` biases toward node B on exact ties, for determinism.
    let diff_ab = angular_difference(heading, seg.bearing_ab as f64);
    let diff_ba = angular_difference(heading, seg.bearing_ba as f64);
    let forward_is_b = diff_ab <= diff_ba;
    let forward_index = if forward_is_b { seg.node_b } else { seg.node_a };
    let forward: &Node = chunk.nodes.get(forward_index as usize)?;
    let forward_location = forward.lat_lon();

    let d_node = haversine_distance(current.snapped_location, forward_location);
    if d_node > config.next_distance_meters {
        return None;
    }

    let bearing_to_forward = bearing_degrees(current.snapped_location, forward_location);
    if angular_difference(heading, bearing_to_forward) > config.next_heading_tolerance {
        return None;
    }

    // Forward test: the heading probe and the forward node must point the
    // same way from the snapped location.
    let probe = point_along_heading(current.snapped_location, heading, config.forward_probe_meters);
    let (probe_x, probe_y) = to_local_meters(current.snapped_location, probe);
    let (fwd_x, fwd_y) = to_local_meters(current.snapped_location, forward_location);
    if probe_x * fwd_x + probe_y * fwd_y <= 0.0 {
        return None;
    }

    let edge_start = forward.edge_start as usize;
    let edge_count = forward.edge_count as usize;
    let edges = chunk.node_edges.get(edge_start..edge_start + edge_count)?;

    let mut best: Option<RoadIndexNext> = None;
    for &candidate_index in edges {
        if candidate_index as usize == current.segment_index {
            continue;
        }
        let candidate = &chunk.segments[candidate_index as usize];
        if chunk.segment_name(candidate) == current.name {
            continue;
        }

        let bearing_away = if candidate.node_a == forward_index {
            candidate.bearing_ab
        } else {
            candidate.bearing_ba
        } as f64;
        let diff = angular_difference(heading, bearing_away);
        if diff > config.next_heading_tolerance {
            continue;
        }

        let link_penalty = if candidate.is_link() { config.link_penalty } else { 0.0 };
        let score = d_node + 0.8 * diff + link_penalty;
        let confidence = (1.0 - diff / config.next_heading_tolerance).max(0.0);

        let is_better = match &best {
            Some(b) => score < b.distance_meters,
            None => true,
        };
        if is_better {
            best = Some(RoadIndexNext {
                name: chunk.segment_name(candidate).to_string(),
                segment_index: candidate_index as usize,
                distance_meters: score,
                confidence,
            });
        }
    }

    best
}
