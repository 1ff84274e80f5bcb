//! Update controller: rate limiting, chunk loading, and switch hysteresis.

use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::cache::ChunkCache;
use crate::chunk::Chunk;
use crate::config::{ControllerConfig, MatcherConfig, PredictorConfig};
use crate::error::{Error, Result};
use crate::fetcher::ChunkFetcher;
use crate::geo::LatLon;
use crate::matcher::{match_on, RoadIndexMatch};
use crate::predictor::{match_next, RoadIndexNext};
use crate::region::RegionDirectory;
use crate::tile::TileId;

/// The accepted match retained across `update()` calls. Carries only names
/// and coordinates plus a round-invariant `(tile, segment_index)` identity
/// pair — never a chunk reference or a this-round chunk-list position,
/// since neither outlives the update that produced it.
#[derive(Debug, Clone)]
pub struct AcceptedMatch {
    pub name: String,
    pub distance_meters: f64,
    pub bearing_degrees: f64,
    pub snapped_location: LatLon,
    pub score: f64,
    tile: TileId,
    segment_index: u32,
}

impl AcceptedMatch {
    fn same_segment(&self, other: &AcceptedMatch) -> bool {
        self.tile == other.tile && self.segment_index == other.segment_index
    }

    fn from_match(tile: TileId, m: &RoadIndexMatch) -> Self {
        AcceptedMatch {
            name: m.name.clone(),
            distance_meters: m.distance_meters,
            bearing_degrees: m.bearing_degrees,
            snapped_location: m.snapped_location,
            score: m.score,
            tile,
            segment_index: m.segment_index as u32,
        }
    }
}

/// Observable controller state, useful for distinguishing the three distinct
/// reasons `update()` can return `(None, None)`: outside any region, no
/// candidate within radius, or a rate-limited call returning stale state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSnapshot {
    OutsideRegion,
    NoCandidate,
    RateLimited,
    Matched,
}

struct ControllerState {
    last_update_time: Option<f64>,
    last_match: Option<AcceptedMatch>,
    stability_counter: u32,
    snapshot: ControllerSnapshot,
}

/// Single-receiver update controller. Not reentrant: callers must serialize
/// `update()` calls externally, e.g. one controller per receiver behind a
/// task-local queue.
pub struct Controller {
    regions: RegionDirectory,
    cache: ChunkCache,
    fetcher: Arc<dyn ChunkFetcher>,
    matcher_config: MatcherConfig,
    predictor_config: PredictorConfig,
    controller_config: ControllerConfig,
    state: ControllerState,
}

impl Controller {
    pub fn new(
        regions: RegionDirectory,
        cache: ChunkCache,
        fetcher: Arc<dyn ChunkFetcher>,
        matcher_config: MatcherConfig,
        predictor_config: PredictorConfig,
        controller_config: ControllerConfig,
    ) -> Self {
        Self {
            regions,
            cache,
            fetcher,
            matcher_config,
            predictor_config,
            controller_config,
            state: ControllerState {
                last_update_time: None,
                last_match: None,
                stability_counter: 0,
                snapshot: ControllerSnapshot::NoCandidate,
            },
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.state.snapshot
    }

    /// Process one `(location, heading)` observation at time `now_secs`
    /// (seconds since an arbitrary but monotonic epoch, supplied by the
    /// caller rather than read from a system clock — mirrors the explicit
    /// `timestamp` parameter real map-matchers pass through).
    pub async fn update(
        &mut self,
        location: LatLon,
        heading: Option<f64>,
        now_secs: f64,
    ) -> Result<(Option<AcceptedMatch>, Option<RoadIndexNext>)> {
        let _span = info_span!("road_index.update").entered();

        if let Some(last) = self.state.last_update_time {
            if now_secs - last < self.controller_config.min_update_interval_secs {
                self.state.snapshot = ControllerSnapshot::RateLimited;
                return Ok((self.state.last_match.clone(), None));
            }
        }
        self.state.last_update_time = Some(now_secs);

        let Some(region) = self.regions.find(location).cloned() else {
            self.state.snapshot = ControllerSnapshot::OutsideRegion;
            return Ok((None, None));
        };

        let mut tiles = TileId::neighborhood(
            location,
            region.chunk_zoom,
            self.controller_config.chunk_radius_meters,
        );
        tiles.sort_by_key(|t| (t.x, t.y));

        let mut chunks: Vec<(TileId, Chunk)> = Vec::with_capacity(tiles.len());
        for tile in tiles {
            match self.cache.load(&region, tile).await? {
                Some(chunk) => chunks.push((tile, chunk)),
                None => match self.fetcher.fetch_bytes(&region, tile).await {
                    Ok(bytes) => {
                        self.cache.save(&region, tile, &bytes).await?;
                        let chunk = crate::chunk::parse_container(&bytes)?;
                        chunks.push((tile, chunk));
                    }
                    Err(e) => {
                        warn!(error = %e, "chunk fetch failed, aborting update");
                        return Err(Error::FetchFailed(e));
                    }
                },
            }
        }

        let chunk_refs: Vec<&Chunk> = chunks.iter().map(|(_, c)| c).collect();
        let candidate = match_on(location, heading, &chunk_refs, &self.matcher_config);

        let Some(candidate) = candidate else {
            self.state.last_match = None;
            self.state.stability_counter = 0;
            self.state.snapshot = ControllerSnapshot::NoCandidate;
            return Ok((None, None));
        };

        let candidate_tile = chunks[candidate.chunk_index].0;
        let candidate_accepted = AcceptedMatch::from_match(candidate_tile, &candidate);

        let accepted = self.apply_hysteresis(candidate_accepted);
        self.state.last_match = Some(accepted.clone());
        self.state.snapshot = ControllerSnapshot::Matched;

        let next = chunks
            .iter()
            .find(|(tile, _)| *tile == accepted.tile)
            .and_then(|(_, chunk)| {
                let transient = RoadIndexMatch {
                    chunk_index: 0,
                    segment_index: accepted.segment_index as usize,
                    name: accepted.name.clone(),
                    distance_meters: accepted.distance_meters,
                    bearing_degrees: accepted.bearing_degrees,
                    snapped_location: accepted.snapped_location,
                    score: accepted.score,
                };
                match_next(&transient, heading, chunk, &self.predictor_config)
            });

        Ok((Some(accepted), next))
    }

    /// Apply switch hysteresis and update the stability counter, given the
    /// best candidate scored this round.
    fn apply_hysteresis(&mut self, candidate: AcceptedMatch) -> AcceptedMatch {
        let Some(prev) = self.state.last_match.clone() else {
            self.state.stability_counter = 1;
            return candidate;
        };

        if candidate.same_segment(&prev) {
            self.state.stability_counter += 1;
            debug!(counter = self.state.stability_counter, "same segment, stable");
            return candidate;
        }

        if candidate.score + self.controller_config.switch_score_delta < prev.score {
            self.state.stability_counter = 1;
            debug!("new segment accepted via score delta");
            return candidate;
        }

        if self.state.stability_counter >= self.controller_config.stable_count {
            self.state.stability_counter = 1;
            debug!("new segment accepted via stability count");
            return candidate;
        }

        self.state.stability_counter += 1;
        prev
    }
}
