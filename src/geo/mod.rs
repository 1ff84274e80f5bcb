//! Geodesy primitives and segment geometry.

mod bearing;
mod point;
mod segment;

pub use bearing::{
    angular_difference, bearing_degrees, from_local_meters, haversine_distance,
    meters_per_degree_lat, meters_per_degree_lon, normalize_heading, point_along_heading,
    to_local_meters, EARTH_RADIUS_METERS,
};
pub use point::LatLon;
pub use segment::{closest_point_on_polyline, PolylineHit};
