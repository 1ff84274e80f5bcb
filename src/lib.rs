//! `road-index`: near-real-time map-matching and next-road prediction over
//! a compressed, spatially-gridded road network.
//!
//! The public surface is deliberately small: decode chunk containers with
//! [`chunk::parse_container`], cache them on disk with [`cache::ChunkCache`],
//! and drive both the geometric matcher and the next-road predictor through
//! one [`controller::Controller`] per tracked receiver.

pub mod cache;
pub mod chunk;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod geo;
pub mod grid;
pub mod matcher;
pub mod predictor;
pub mod region;
pub mod tile;

pub use cache::{CacheStats, ChunkCache};
pub use chunk::Chunk;
pub use config::{CacheConfig, ControllerConfig, MatcherConfig, PredictorConfig};
pub use controller::{AcceptedMatch, Controller, ControllerSnapshot};
pub use error::{Error, Result};
pub use fetcher::ChunkFetcher;
pub use geo::LatLon;
pub use matcher::RoadIndexMatch;
pub use predictor::RoadIndexNext;
pub use region::{Region, RegionDirectory};
pub use tile::TileId;
