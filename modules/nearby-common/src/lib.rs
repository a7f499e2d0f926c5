pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use config::LocatorConfig;
pub use error::{ErrorCode, ErrorKind, NearbyError};
pub use geo::{distance_meters, haversine_distance, DistanceUnit, EARTH_RADIUS_METERS};
pub use types::*;
