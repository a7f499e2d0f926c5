//! Observable places session.
//!
//! `Idle → Loading → {Resolved, Failed}`, re-enterable. Each `load()` runs
//! resolve → candidates → rank on a spawned task and publishes the result as
//! a new immutable `SessionState` snapshot on a watch channel.
//!
//! Reloading while a load is in flight cancels and supersedes it: the old
//! task is aborted (dropping its platform registration) and a generation
//! check keeps anything it might still publish out of the state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use nearby_common::{Coordinate, ErrorCode, Place};
use nearby_locator::{LocationOutcome, LocationPlatform, LocationResolver};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::payload::PlacesResult;
use crate::ranker::{rank, CandidateSource, SyntheticCandidates};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Loading,
    Resolved,
    Failed,
}

/// Snapshot of a session, as seen by observers.
///
/// `is_loading` implies `error` is `None`. A `Failed` snapshot carries an
/// error and no places; a `Resolved` one carries no error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub is_loading: bool,
    pub user_location: Option<Coordinate>,
    pub places: Vec<Place>,
    pub error: Option<ErrorCode>,
    /// Incremented once per transition.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            phase: SessionPhase::Idle,
            is_loading: false,
            user_location: None,
            places: Vec::new(),
            error: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Resolved or Failed.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase, SessionPhase::Resolved | SessionPhase::Failed)
    }

    // Last places and location stay visible while reloading.
    fn loading(&self) -> Self {
        Self {
            phase: SessionPhase::Loading,
            is_loading: true,
            error: None,
            ..self.clone()
        }
    }

    fn resolved(&self, location: Coordinate, places: Vec<Place>) -> Self {
        Self {
            phase: SessionPhase::Resolved,
            is_loading: false,
            user_location: Some(location),
            places,
            error: None,
            ..self.clone()
        }
    }

    fn failed(&self, code: ErrorCode) -> Self {
        Self {
            phase: SessionPhase::Failed,
            is_loading: false,
            user_location: None,
            places: Vec::new(),
            error: Some(code),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct SessionInner {
    id: Uuid,
    resolver: LocationResolver,
    source: Arc<dyn CandidateSource>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl SessionInner {
    /// Apply a transition unless a newer load (or a cancel) has happened
    /// since `generation` was issued. Returns the published snapshot.
    fn publish(
        &self,
        generation: u64,
        next: impl FnOnce(&SessionState) -> SessionState,
    ) -> Option<SessionState> {
        let mut published = None;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            let mut snapshot = next(state);
            snapshot.version = state.version + 1;
            snapshot.updated_at = Utc::now();
            *state = snapshot.clone();
            published = Some(snapshot);
            true
        });
        published
    }

    /// End `generation` if it is still the newest load.
    fn retire(&self, generation: u64) -> bool {
        self.generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn run(self: Arc<Self>, generation: u64) -> Option<SessionState> {
        let transition: Box<dyn FnOnce(&SessionState) -> SessionState + Send> =
            match self.resolver.resolve().await {
                LocationOutcome::Success(origin) => match self.source.candidates_near(origin).await {
                    Ok(candidates) if candidates.is_empty() => {
                        warn!(lat = origin.latitude, lng = origin.longitude, "No candidate places near location");
                        Box::new(|s| s.failed(ErrorCode::UnknownError))
                    }
                    Ok(candidates) => {
                        let places = rank(origin, candidates);
                        info!(
                            lat = origin.latitude,
                            lng = origin.longitude,
                            count = places.len(),
                            "Ranked nearby places"
                        );
                        Box::new(move |s| s.resolved(origin, places))
                    }
                    Err(e) => {
                        warn!(error = %e, "Candidate source failed");
                        Box::new(|s| s.failed(ErrorCode::UnknownError))
                    }
                },
                LocationOutcome::PermissionDenied => {
                    info!("Location permission denied");
                    Box::new(|s| s.failed(ErrorCode::PermissionDenied))
                }
                LocationOutcome::ServiceDisabled => {
                    info!("Location services disabled");
                    Box::new(|s| s.failed(ErrorCode::LocationDisabled))
                }
                LocationOutcome::Failure(reason) => {
                    let code = ErrorCode::from_reason(&reason);
                    info!(reason = reason.as_str(), code = %code, "Location resolution failed");
                    Box::new(move |s| s.failed(code))
                }
            };

        let published = self.publish(generation, transition);
        if published.is_none() {
            info!(session_id = %self.id, generation, "Load superseded, result dropped");
        }
        published
    }
}

/// A started load. Dropping the handle detaches the load; it still runs to
/// completion. Dropping a pending `settled()` future cancels it.
pub struct LoadHandle {
    generation: u64,
    handle: JoinHandle<Option<SessionState>>,
    inner: Arc<SessionInner>,
}

/// Aborts the load if the caller stops waiting for it.
struct AbandonGuard {
    inner: Arc<SessionInner>,
    generation: u64,
    abort: AbortHandle,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.inner.retire(self.generation) {
            info!(session_id = %self.inner.id, generation = self.generation, "Load abandoned by caller");
        }
        self.abort.abort();
    }
}

impl LoadHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for this load to settle. `None` if it was superseded or cancelled.
    pub async fn settled(self) -> Option<SessionState> {
        let LoadHandle {
            generation,
            handle,
            inner,
        } = self;
        let mut guard = AbandonGuard {
            inner,
            generation,
            abort: handle.abort_handle(),
            armed: true,
        };
        let joined = handle.await;
        guard.armed = false;

        match joined {
            Ok(state) => state,
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                warn!(error = %e, "Load task failed");
                None
            }
        }
    }
}

pub struct PlacesSession {
    inner: Arc<SessionInner>,
    inflight: Mutex<Option<AbortHandle>>,
}

impl PlacesSession {
    pub fn new(resolver: LocationResolver, source: Arc<dyn CandidateSource>) -> Self {
        let (state, _) = watch::channel(SessionState::idle());
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                resolver,
                source,
                state,
                generation: AtomicU64::new(0),
            }),
            inflight: Mutex::new(None),
        }
    }

    /// A session over the synthetic candidate neighbourhood.
    pub fn synthetic(resolver: LocationResolver) -> Self {
        Self::new(resolver, Arc::new(SyntheticCandidates))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn platform(&self) -> &Arc<dyn LocationPlatform> {
        self.inner.resolver.platform()
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Start a load, superseding any load still in flight.
    ///
    /// Publishes `Loading` before returning. Must be called inside a tokio
    /// runtime.
    pub fn load(&self) -> LoadHandle {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = inflight.take() {
            previous.abort();
        }
        self.inner.publish(generation, SessionState::loading);

        let span = info_span!("places_load", session_id = %self.inner.id, generation);
        let handle = tokio::spawn(Arc::clone(&self.inner).run(generation).instrument(span));
        *inflight = Some(handle.abort_handle());

        LoadHandle {
            generation,
            handle,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Load and wait for the result. Dropping the future cancels the load.
    pub async fn query(&self) -> Result<PlacesResult, ErrorCode> {
        match self.load().settled().await {
            Some(state) => PlacesResult::from_state(&state),
            None => Err(ErrorCode::UnknownError),
        }
    }

    /// Abort the in-flight load, if any. The state is left as it is.
    pub fn cancel(&self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = inflight.take() {
            handle.abort();
            info!(session_id = %self.inner.id, "Load cancelled");
        }
    }
}

impl Drop for PlacesSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_keeps_previous_places_and_clears_error() {
        let origin = Coordinate::new(1.0, 1.0);
        let resolved = SessionState::idle().resolved(origin, Vec::new());
        let failed = resolved.failed(ErrorCode::LocationUnavailable);

        let loading = failed.loading();
        assert!(loading.is_loading);
        assert_eq!(loading.error, None);
        assert!(!loading.is_settled());

        let reloading = resolved.loading();
        assert_eq!(reloading.user_location, Some(origin));
    }

    #[test]
    fn failed_clears_places_and_location() {
        let origin = Coordinate::new(1.0, 1.0);
        let place = Place {
            id: "place_0".into(),
            name: "Central Park".into(),
            coordinate: origin,
            category: nearby_common::PlaceCategory::Park,
            distance_meters: 0.0,
        };
        let failed = SessionState::idle()
            .resolved(origin, vec![place])
            .failed(ErrorCode::PermissionDenied);

        assert_eq!(failed.phase, SessionPhase::Failed);
        assert!(failed.places.is_empty());
        assert_eq!(failed.user_location, None);
        assert_eq!(failed.error, Some(ErrorCode::PermissionDenied));
        assert!(failed.is_settled());
    }
}
