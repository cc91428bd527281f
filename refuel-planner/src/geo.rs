//! Great-circle and corridor geometry.
//!
//! These are straight-line estimates used to pick candidate stations before
//! any road distance is requested.

use crate::domain::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points (haversine formula).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let delta_lat = (b.lat() - a.lat()).to_radians();
    let delta_lon = (b.lon() - a.lon()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Approximate distance from `point` to the line through `line_start` and
/// `line_end`.
///
/// The local patch is treated as planar in radian space, so this is only
/// meaningful for corridors up to a few hundred kilometers. When the line
/// degenerates to a single point, the distance to that point is returned.
pub fn perpendicular_distance_km(line_start: GeoPoint, line_end: GeoPoint, point: GeoPoint) -> f64 {
    let dx12 = (line_end.lon() - line_start.lon()).to_radians();
    let dy12 = (line_end.lat() - line_start.lat()).to_radians();
    let dx13 = (point.lon() - line_start.lon()).to_radians();
    let dy13 = (point.lat() - line_start.lat()).to_radians();

    let length = (dx12 * dx12 + dy12 * dy12).sqrt();
    if length == 0.0 {
        return haversine_km(line_start, point);
    }

    let cross = (dx12 * dy13 - dy12 * dx13).abs();
    cross / length * EARTH_RADIUS_KM
}

/// Width of the acceptable detour corridor around a straight line.
///
/// `max(line_length * fraction, min_km)`.
pub fn detour_radius_km(line_length_km: f64, fraction: f64, min_km: f64) -> f64 {
    (line_length_km * fraction).max(min_km)
}
