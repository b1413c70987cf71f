//! Geographic helpers shared by the tracking loop and the heatmap renderer.
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees),
//! the standard used by GPS receivers and mapping services.

use crate::{Bounds, GpsPoint};
use geo::{Distance, Haversine, Point};

/// Kilometers per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.0;

/// Calculate the great-circle distance between two GPS points using the
/// Haversine formula.
///
/// Returns the distance in meters along the Earth's surface (assuming a
/// spherical Earth with radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use heatpath::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Half the diagonal of a bounding box, in kilometers.
///
/// Flat-earth approximation good enough for fitting a map region around a
/// neighborhood-scale point set: latitude spans convert at 111 km/°,
/// longitude spans are additionally scaled by the cosine of the center
/// latitude.
pub fn half_diagonal_km(bounds: &Bounds) -> f64 {
    let center = bounds.center();
    let lat_km = (bounds.max_lat - bounds.min_lat) * KM_PER_DEGREE;
    let lng_km =
        (bounds.max_lng - bounds.min_lng) * KM_PER_DEGREE * center.latitude.to_radians().cos();
    (lat_km * lat_km + lng_km * lng_km).sqrt() / 2.0
}
