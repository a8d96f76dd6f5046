//! Great-circle distance with a home dead zone

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;
const MILES_PER_KM: f64 = 0.621371;

/// Coordinate delta, in degrees, under which two points count as the same place
pub const DEAD_ZONE_DEGREES: f64 = 0.0008;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both deltas fall within the dead zone
    pub fn same_location(&self, other: &GeoPoint) -> bool {
        (self.latitude - other.latitude).abs() <= DEAD_ZONE_DEGREES
            && (self.longitude - other.longitude).abs() <= DEAD_ZONE_DEGREES
    }

    /// Distance in miles, exactly 0 inside the dead zone
    pub fn distance_miles(&self, other: &GeoPoint) -> f64 {
        distance_miles(*self, *other)
    }
}

/// Haversine distance in miles between `a` and `b`
pub fn distance_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    if a.same_location(&b) {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c * MILES_PER_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_zone_is_zero() {
        let home = GeoPoint::new(37.0, -122.0);
        let car = GeoPoint::new(37.00005, -122.00005);
        assert_eq!(distance_miles(home, car), 0.0);
        assert_eq!(home.distance_miles(&home), 0.0);
    }

    #[test]
    fn test_outside_dead_zone_is_positive() {
        let home = GeoPoint::new(37.0, -122.0);
        let car = GeoPoint::new(37.001, -122.001);
        let d = distance_miles(home, car);
        assert!(d > 0.0);
        assert!(d < 0.1, "expected roughly 0.09 mi, got {}", d);
    }

    #[test]
    fn test_one_degree_latitude() {
        // 6371 km * pi / 180 * 0.621371
        let d = distance_miles(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 69.093).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = GeoPoint::new(52.37, 4.89);
        let b = GeoPoint::new(51.92, 4.48);
        assert!((distance_miles(a, b) - distance_miles(b, a)).abs() < 1e-9);
    }
}
