use crate::types::Coordinate;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const EARTH_RADIUS_KM: f64 = 6371.0;
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Distance unit for haversine calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    pub fn earth_radius(self) -> f64 {
        match self {
            Self::Meters => EARTH_RADIUS_METERS,
            Self::Kilometers => EARTH_RADIUS_KM,
            Self::Miles => EARTH_RADIUS_MILES,
        }
    }
}

/// Haversine great-circle distance between two coordinates in the given unit.
pub fn haversine_distance(a: Coordinate, b: Coordinate, unit: DistanceUnit) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding near antipodes can push h a hair past 1.0.
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    unit.earth_radius() * c
}

/// Haversine great-circle distance between two coordinates in meters.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance(a, b, DistanceUnit::Meters)
}
