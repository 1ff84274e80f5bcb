//! The external fetcher capability boundary.
//!
//! `road-index` never implements this trait itself — HTTP transport, retry,
//! and deadline policy belong to the integrator.

use crate::region::Region;
use crate::tile::TileId;
use async_trait::async_trait;

/// Given `(region, tileId)`, returns the chunk's raw container bytes or a
/// fatal error. The controller neither retries nor rate-limits fetches
/// beyond its own `minUpdateInterval`.
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    async fn fetch_bytes(&self, region: &Region, tile: TileId) -> Result<Vec<u8>, String>;
}
