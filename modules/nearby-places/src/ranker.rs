//! Distance ranking of candidate places.

use anyhow::Result;
use async_trait::async_trait;
use nearby_common::{distance_meters, Candidate, Coordinate, Place, PlaceCategory};

/// Rank candidates by great-circle distance from `origin`, nearest first.
///
/// Ids are `place_<index>` in input order, assigned before sorting. The sort
/// is stable, so equidistant candidates keep their input order.
pub fn rank(origin: Coordinate, candidates: impl IntoIterator<Item = Candidate>) -> Vec<Place> {
    let mut places: Vec<Place> = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| Place {
            id: format!("place_{index}"),
            distance_meters: distance_meters(origin, candidate.coordinate),
            name: candidate.name,
            coordinate: candidate.coordinate,
            category: candidate.category,
        })
        .collect();

    places.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    places
}

// ---------------------------------------------------------------------------
// Candidate sources
// ---------------------------------------------------------------------------

/// Supplies unranked places around a coordinate.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates_near(&self, origin: Coordinate) -> Result<Vec<Candidate>>;
}

/// Fixed synthetic neighbourhood: six places at constant degree offsets from
/// the origin, parks at even positions and restaurants at odd ones.
pub struct SyntheticCandidates;

const SYNTHETIC_OFFSETS: [(&str, f64, f64); 6] = [
    ("Central Park", 0.003, 0.002),
    ("Sunrise Cafe", -0.002, 0.005),
    ("City Library", 0.005, -0.003),
    ("Metro Station", -0.004, -0.001),
    ("Sports Complex", 0.007, 0.004),
    ("Night Market", -0.006, 0.007),
];

impl SyntheticCandidates {
    pub fn around(origin: Coordinate) -> Vec<Candidate> {
        SYNTHETIC_OFFSETS
            .iter()
            .enumerate()
            .map(|(index, (name, d_lat, d_lng))| {
                let category = if index % 2 == 0 {
                    PlaceCategory::Park
                } else {
                    PlaceCategory::Restaurant
                };
                Candidate::new(*name, origin.offset(*d_lat, *d_lng), category)
            })
            .collect()
    }
}

#[async_trait]
impl CandidateSource for SyntheticCandidates {
    async fn candidates_near(&self, origin: Coordinate) -> Result<Vec<Candidate>> {
        Ok(Self::around(origin))
    }
}
