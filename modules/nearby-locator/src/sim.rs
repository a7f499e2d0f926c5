// Scripted, in-process location platform.
//
// SimPlatform: answers permission/service checks from flags, serves a
//   scripted cached fix, and delivers one scripted result per accuracy tier
//   after a delay on the tokio clock. Records every request, registration and
//   removal so tests can assert on them.
// SimPrompter: answers the permission dialog and flips the platform's grant.
//
// Used by the integration tests and by the `nearby` CLI.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use nearby_common::Coordinate;
use tracing::debug;

use crate::fix::FixSink;
use crate::platform::{
    AccuracyTier, LocationPlatform, PermissionPrompter, PermissionStatus, PlatformError,
    SubscriptionId, UpdateRequest,
};

/// What the platform does when a tier is requested.
#[derive(Debug, Clone, PartialEq)]
pub enum FixScript {
    /// Deliver `coordinate` after `after`.
    Fix { after: Duration, coordinate: Coordinate },
    /// Deliver a null location after `after`.
    NoFix { after: Duration },
    /// Deliver `error` after `after`.
    Error { after: Duration, error: PlatformError },
    /// Refuse the registration outright.
    Reject(PlatformError),
    /// Accept the registration and never deliver.
    Silent,
}

type ActiveMap = Arc<Mutex<HashMap<SubscriptionId, Arc<FixSink>>>>;

#[derive(Debug, Default)]
struct SimLog {
    requests: Vec<UpdateRequest>,
    removed: Vec<SubscriptionId>,
    cache_lookups: usize,
}

pub struct SimPlatform {
    permission: AtomicBool,
    service_enabled: AtomicBool,
    cached: Result<Option<Coordinate>, PlatformError>,
    scripts: HashMap<AccuracyTier, FixScript>,
    next_id: AtomicU64,
    active: ActiveMap,
    log: Mutex<SimLog>,
}

impl SimPlatform {
    /// Permission granted, services on, no cached fix, both tiers silent.
    pub fn new() -> Self {
        Self {
            permission: AtomicBool::new(true),
            service_enabled: AtomicBool::new(true),
            cached: Ok(None),
            scripts: HashMap::new(),
            next_id: AtomicU64::new(1),
            active: Arc::new(Mutex::new(HashMap::new())),
            log: Mutex::new(SimLog::default()),
        }
    }

    pub fn with_permission(self, granted: bool) -> Self {
        self.permission.store(granted, Ordering::SeqCst);
        self
    }

    pub fn with_service_enabled(self, enabled: bool) -> Self {
        self.service_enabled.store(enabled, Ordering::SeqCst);
        self
    }

    pub fn with_cached(mut self, coordinate: Coordinate) -> Self {
        self.cached = Ok(Some(coordinate));
        self
    }

    pub fn with_cached_error(mut self, error: PlatformError) -> Self {
        self.cached = Err(error);
        self
    }

    pub fn on_tier(mut self, tier: AccuracyTier, script: FixScript) -> Self {
        self.scripts.insert(tier, script);
        self
    }

    pub fn on_high_accuracy(self, script: FixScript) -> Self {
        self.on_tier(AccuracyTier::HighAccuracy, script)
    }

    pub fn on_low_power(self, script: FixScript) -> Self {
        self.on_tier(AccuracyTier::LowPower, script)
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Withdraw permission and fail every in-flight registration with a
    /// permission error, the way a platform reports a mid-flight revocation.
    pub fn revoke_permission(&self) {
        self.set_permission(false);
        let sinks: Vec<Arc<FixSink>> = lock(&self.active).values().cloned().collect();
        for sink in sinks {
            sink.deliver(Err(PlatformError::Permission("revoked".to_string())));
        }
    }

    // --- Assertions ---

    pub fn requests(&self) -> Vec<UpdateRequest> {
        lock(&self.log).requests.clone()
    }

    pub fn requested_tiers(&self) -> Vec<AccuracyTier> {
        lock(&self.log).requests.iter().map(|r| r.tier).collect()
    }

    pub fn removed(&self) -> Vec<SubscriptionId> {
        lock(&self.log).removed.clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.active).len()
    }

    pub fn cache_lookups(&self) -> usize {
        lock(&self.log).cache_lookups
    }

    fn schedule(&self, id: SubscriptionId, after: Duration, result: Result<Coordinate, PlatformError>) {
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Removed registrations never hear back.
            let sink = lock(&active).get(&id).cloned();
            if let Some(sink) = sink {
                sink.deliver(result);
            }
        });
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationPlatform for SimPlatform {
    fn has_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn is_location_service_enabled(&self) -> bool {
        self.service_enabled.load(Ordering::SeqCst)
    }

    async fn cached_location(&self) -> Result<Option<Coordinate>, PlatformError> {
        lock(&self.log).cache_lookups += 1;
        self.cached.clone()
    }

    fn request_location_updates(
        &self,
        request: UpdateRequest,
        sink: Arc<FixSink>,
    ) -> Result<SubscriptionId, PlatformError> {
        let tier = request.tier;
        lock(&self.log).requests.push(request);

        if !self.has_permission() {
            return Err(PlatformError::Permission(
                "location permission not granted".to_string(),
            ));
        }

        let script = self.scripts.get(&tier).cloned().unwrap_or(FixScript::Silent);
        if let FixScript::Reject(error) = script {
            return Err(error);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.active).insert(id, sink);
        debug!(tier = %tier, subscription = %id, "Sim registration added");

        match script {
            FixScript::Fix { after, coordinate } => self.schedule(id, after, Ok(coordinate)),
            FixScript::NoFix { after } => self.schedule(id, after, Err(PlatformError::NoFix)),
            FixScript::Error { after, error } => self.schedule(id, after, Err(error)),
            FixScript::Reject(_) | FixScript::Silent => {}
        }

        Ok(id)
    }

    fn remove_location_updates(&self, id: SubscriptionId) {
        if lock(&self.active).remove(&id).is_some() {
            lock(&self.log).removed.push(id);
            debug!(subscription = %id, "Sim registration removed");
        }
    }
}

// ---------------------------------------------------------------------------
// SimPrompter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Grant,
    Deny,
    /// The dialog could not be shown.
    Fail,
}

pub struct SimPrompter {
    platform: Arc<SimPlatform>,
    answer: PromptAnswer,
    prompts: AtomicUsize,
}

impl SimPrompter {
    pub fn new(platform: Arc<SimPlatform>, answer: PromptAnswer) -> Self {
        Self {
            platform,
            answer,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionPrompter for SimPrompter {
    async fn prompt(&self) -> Result<PermissionStatus, PlatformError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            PromptAnswer::Grant => {
                self.platform.set_permission(true);
                Ok(PermissionStatus::Granted)
            }
            PromptAnswer::Deny => Ok(PermissionStatus::Denied),
            PromptAnswer::Fail => Err(PlatformError::Other("activity unavailable".to_string())),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
