use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geo::distance_meters;

// --- Geo Types ---

/// A point on the earth's surface, in decimal degrees.
///
/// Ranges are not validated here; coordinates come from the platform's
/// location service and are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// A new coordinate shifted by the given number of degrees.
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lng)
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(*self, *other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Park,
    Restaurant,
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceCategory::Park => write!(f, "park"),
            PlaceCategory::Restaurant => write!(f, "restaurant"),
        }
    }
}

// --- Places ---

/// An unranked point of interest, as handed to the ranker by a candidate source.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub coordinate: Coordinate,
    pub category: PlaceCategory,
}

impl Candidate {
    pub fn new(name: impl Into<String>, coordinate: Coordinate, category: PlaceCategory) -> Self {
        Self {
            name: name.into(),
            coordinate,
            category,
        }
    }
}

/// A ranked point of interest. Serializes to the wire shape the UI expects:
/// `{id, name, latitude, longitude, category, distanceMeters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub category: PlaceCategory,
    pub distance_meters: f64,
}
