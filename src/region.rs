//! Regions and the region directory.

use crate::geo::LatLon;

/// A bounding box covering a chunk origin, with the zoom at which its chunks
/// are tiled.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub base_url: String,
    pub chunk_zoom: u8,
}

impl Region {
    /// Inclusive on all four sides.
    pub fn contains(&self, p: LatLon) -> bool {
        p.lat >= self.min_lat
            && p.lat <= self.max_lat
            && p.lon >= self.min_lon
            && p.lon <= self.max_lon
    }
}

/// Ordered list of regions. The first region containing a point wins.
/// Regions are disjoint in practice, so this tie-break rarely matters.
pub struct RegionDirectory {
    regions: Vec<Region>,
}

impl RegionDirectory {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn find(&self, p: LatLon) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, bounds: (f64, f64, f64, f64)) -> Region {
        Region {
            id: id.to_string(),
            min_lat: bounds.0,
            min_lon: bounds.1,
            max_lat: bounds.2,
            max_lon: bounds.3,
            base_url: format!("https://chunks.example/{id}"),
            chunk_zoom: 12,
        }
    }

    #[test]
    fn first_matching_region_wins_on_overlap() {
        let dir = RegionDirectory::new(vec![
            region("a", (40.0, -74.0, 41.0, -73.0)),
            region("b", (40.5, -73.5, 41.5, -72.5)),
        ]);
        let p = LatLon::new(40.6, -73.6);
        assert_eq!(dir.find(p).unwrap().id, "a");
    }

    #[test]
    fn bounds_are_inclusive() {
        let r = region("a", (40.0, -74.0, 41.0, -73.0));
        assert!(r.contains(LatLon::new(40.0, -74.0)));
        assert!(r.contains(LatLon::new(41.0, -73.0)));
        assert!(!r.contains(LatLon::new(39.999, -74.0)));
    }

    #[test]
    fn no_region_contains_point_outside_all() {
        let dir = RegionDirectory::new(vec![region("a", (40.0, -74.0, 41.0, -73.0))]);
        assert!(dir.find(LatLon::new(10.0, 10.0)).is_none());
    }
}
