use nearby_common::{ErrorCode, Place};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::session::{SessionPhase, SessionState};

/// Result payload handed to the UI. Field names are fixed by the UI contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacesResult {
    pub user_lat: f64,
    pub user_lng: f64,
    pub places: Vec<Place>,
}

impl PlacesResult {
    /// Payload for a settled state: the ranked places, or the error code.
    pub fn from_state(state: &SessionState) -> Result<Self, ErrorCode> {
        if let Some(code) = &state.error {
            return Err(code.clone());
        }
        match (state.phase, state.user_location) {
            (SessionPhase::Resolved, Some(location)) => Ok(Self {
                user_lat: location.latitude,
                user_lng: location.longitude,
                places: state.places.clone(),
            }),
            _ => Err(ErrorCode::UnknownError),
        }
    }
}
