//! Slippy-map tile identifiers.

use crate::geo::LatLon;

/// `(z, x, y)` over the standard web-mercator tiling. For zoom `z`,
/// `x, y ∈ [0, 2^z − 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Canonical slippy-map projection of a point at a given zoom.
    pub fn from_point(p: LatLon, z: u8) -> Self {
        let n = 2f64.powi(z as i32);
        let lat_rad = p.lat.to_radians();

        let x = ((p.lon + 180.0) / 360.0) * n;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
            * n;

        let max = (n as u32).saturating_sub(1);
        TileId {
            z,
            x: (x.floor().max(0.0) as u32).min(max),
            y: (y.floor().max(0.0) as u32).min(max),
        }
    }

    /// All tiles within `radius_m` meters of `p` at this tile's zoom,
    /// including `p`'s own tile. Used to build the chunk-tile neighborhood
    /// for a controller update.
    pub fn neighborhood(p: LatLon, z: u8, radius_m: f64) -> Vec<TileId> {
        let center = TileId::from_point(p, z);
        let n = 2u32.pow(z as u32);

        // Tile edge length in meters at this latitude, used to bound how many
        // rings of tiles the radius could possibly reach.
        let meters_per_tile = crate::geo::meters_per_degree_lat(p.lat) * 360.0
            / 2f64.powi(z as i32);
        let ring = ((radius_m / meters_per_tile.max(1.0)).ceil() as i64).max(1);

        let mut out = Vec::new();
        for dy in -ring..=ring {
            for dx in -ring..=ring {
                let nx = center.x as i64 + dx;
                let ny = center.y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= n as i64 || ny >= n as i64 {
                    continue;
                }
                out.push(TileId::new(z, nx as u32, ny as u32));
            }
        }
        out
    }
}
