//! One-shot fresh fix.
//!
//! The platform pushes updates into a registered sink. `request_one_update`
//! wraps one registration in a future that resolves once and always removes
//! the registration: on delivery, on error, and when the future is dropped
//! (timeout or cancellation).

use std::sync::{Arc, Mutex, PoisonError};

use nearby_common::Coordinate;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::platform::{AccuracyTier, LocationPlatform, PlatformError, SubscriptionId, UpdateRequest};

pub type FixResult = Result<Coordinate, PlatformError>;

/// Receiving end of a single update registration, held by the platform.
///
/// Resolves at most once. Anything delivered after the first result, or after
/// the waiting future is gone, is dropped.
pub struct FixSink {
    tier: AccuracyTier,
    tx: Mutex<Option<oneshot::Sender<FixResult>>>,
}

impl FixSink {
    fn new(tier: AccuracyTier, tx: oneshot::Sender<FixResult>) -> Self {
        Self {
            tier,
            tx: Mutex::new(Some(tx)),
        }
    }

    pub fn tier(&self) -> AccuracyTier {
        self.tier
    }

    /// Hand a result to the waiter. Returns `true` if someone received it.
    pub fn deliver(&self, result: FixResult) -> bool {
        let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            trace!(tier = %self.tier, "Fix already settled, dropping update");
            return false;
        };
        match &result {
            Ok(c) => debug!(tier = %self.tier, lat = c.latitude, lng = c.longitude, "Got location"),
            Err(e) => debug!(tier = %self.tier, error = %e, "Location update failed"),
        }
        tx.send(result).is_ok()
    }

    /// Deliver a platform location result, where `None` is a null fix.
    pub fn deliver_location(&self, location: Option<Coordinate>) -> bool {
        self.deliver(location.ok_or(PlatformError::NoFix))
    }

    /// Provider availability changed. Informational only.
    pub fn report_availability(&self, available: bool) {
        debug!(tier = %self.tier, available, "Location availability changed");
    }

    /// No further delivery can reach a waiter.
    pub fn is_settled(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }
}

/// Removes the registration when dropped.
struct Registration<'a, P: LocationPlatform + ?Sized> {
    platform: &'a P,
    id: SubscriptionId,
}

impl<P: LocationPlatform + ?Sized> Drop for Registration<'_, P> {
    fn drop(&mut self) {
        trace!(subscription = %self.id, "Removing location updates");
        self.platform.remove_location_updates(self.id);
    }
}

/// Register for exactly one update and wait for it.
///
/// Cancel-safe: dropping the returned future removes the registration.
pub async fn request_one_update<P>(platform: &P, request: UpdateRequest) -> FixResult
where
    P: LocationPlatform + ?Sized,
{
    let tier = request.tier;
    let (tx, rx) = oneshot::channel();
    let sink = Arc::new(FixSink::new(tier, tx));

    let id = platform.request_location_updates(request, sink)?;
    let _registration = Registration { platform, id };
    debug!(tier = %tier, subscription = %id, "Requested location updates");

    match rx.await {
        Ok(result) => result,
        Err(_) => Err(PlatformError::Other(
            "location callback released without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (FixSink, oneshot::Receiver<FixResult>) {
        let (tx, rx) = oneshot::channel();
        (FixSink::new(AccuracyTier::HighAccuracy, tx), rx)
    }

    #[tokio::test]
    async fn sink_resolves_only_once() {
        let (sink, rx) = sink();
        let first = Coordinate::new(1.0, 2.0);

        assert!(!sink.is_settled());
        assert!(sink.deliver(Ok(first)));
        assert!(!sink.deliver(Ok(Coordinate::new(3.0, 4.0))));
        assert!(sink.is_settled());

        assert_eq!(rx.await.unwrap(), Ok(first));
    }

    #[tokio::test]
    async fn null_location_becomes_no_fix() {
        let (sink, rx) = sink();
        assert!(sink.deliver_location(None));
        assert_eq!(rx.await.unwrap(), Err(PlatformError::NoFix));
    }

    #[test]
    fn delivery_after_waiter_dropped_is_not_received() {
        let (sink, rx) = sink();
        drop(rx);
        assert!(sink.is_settled());
        assert!(!sink.deliver(Ok(Coordinate::new(1.0, 2.0))));
    }
}
