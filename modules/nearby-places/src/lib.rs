//! Nearby places.
//!
//! Resolve the user's location (`nearby-locator`), rank candidate places by
//! distance, and expose the result as an observable session.

pub mod bridge;
pub mod payload;
pub mod ranker;
pub mod session;

pub use bridge::{BridgeError, PlacesBridge};
pub use payload::PlacesResult;
pub use ranker::{rank, CandidateSource, SyntheticCandidates};
pub use session::{LoadHandle, PlacesSession, SessionPhase, SessionState};
