//! Bearing, distance, and local-projection primitives.

use super::point::LatLon;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Normalize a heading (possibly negative, possibly >360) into `[0, 360)`.
pub fn normalize_heading(deg: f64) -> f64 {
    let r = deg % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

/// Smallest angular distance between two headings, in `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let a = normalize_heading(a);
    let b = normalize_heading(b);
    let d = (a - b).abs();
    d.min(360.0 - d)
}

/// Meters per degree of latitude at a given latitude (degrees).
pub fn meters_per_degree_lat(lat_deg: f64) -> f64 {
    let lat = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat).cos() + 1.175 * (4.0 * lat).cos()
}

/// Meters per degree of longitude at a given latitude (degrees).
pub fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    let lat = lat_deg.to_radians();
    111_132.954 * lat.cos()
}

/// Haversine great-circle distance in meters.
pub fn haversine_distance(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Standard great-circle initial bearing from `from` to `to`, in `[0, 360)`.
pub fn bearing_degrees(from: LatLon, to: LatLon) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_heading(y.atan2(x).to_degrees())
}

/// Project `point` onto a local equirectangular meter plane centered at `origin`.
/// Returns `(dx, dy)` meters east/north of origin.
pub fn to_local_meters(origin: LatLon, point: LatLon) -> (f64, f64) {
    let m_lat = meters_per_degree_lat(origin.lat);
    let m_lon = meters_per_degree_lon(origin.lat);
    let dx = (point.lon - origin.lon) * m_lon;
    let dy = (point.lat - origin.lat) * m_lat;
    (dx, dy)
}

/// Inverse of [`to_local_meters`]: recover a `LatLon` from local meter offsets.
pub fn from_local_meters(origin: LatLon, dx: f64, dy: f64) -> LatLon {
    let m_lat = meters_per_degree_lat(origin.lat);
    let m_lon = meters_per_degree_lon(origin.lat);
    LatLon::new(origin.lat + dy / m_lat, origin.lon + dx / m_lon)
}

/// The point `distance_m` meters from `origin` along `heading_deg`, using the
/// local equirectangular scales at `origin`.
pub fn point_along_heading(origin: LatLon, heading_deg: f64, distance_m: f64) -> LatLon {
    let m_lat = meters_per_degree_lat(origin.lat);
    let m_lon = meters_per_degree_lon(origin.lat);
    let h = heading_deg.to_radians();
    let dlat = (h.cos() * distance_m) / m_lat;
    let dlon = (h.sin() * distance_m) / m_lon;
    LatLon::new(origin.lat + dlat, origin.lon + dlon)
}
