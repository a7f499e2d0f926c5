//! UI-facing module surface.
//!
//! Mirrors what the mobile bridge exposes to the UI layer: a permission
//! request, a one-shot "nearby places" query that resolves to the payload or
//! rejects with an error code, and teardown.

use std::sync::Arc;

use nearby_common::ErrorCode;
use nearby_locator::{PermissionPrompter, PermissionStatus};
use thiserror::Error;
use tracing::{info, warn};

use crate::payload::PlacesResult;
use crate::session::PlacesSession;

/// Rejection handed back to the UI.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ErrorCode> for BridgeError {
    fn from(code: ErrorCode) -> Self {
        let message = code.to_string();
        Self { code, message }
    }
}

pub struct PlacesBridge {
    session: PlacesSession,
    prompter: Arc<dyn PermissionPrompter>,
}

impl PlacesBridge {
    pub fn new(session: PlacesSession, prompter: Arc<dyn PermissionPrompter>) -> Self {
        Self { session, prompter }
    }

    pub fn session(&self) -> &PlacesSession {
        &self.session
    }

    /// Granted immediately if permission is already held, otherwise prompts once.
    pub async fn request_permission(&self) -> Result<PermissionStatus, BridgeError> {
        if self.session.platform().has_permission() {
            return Ok(PermissionStatus::Granted);
        }

        match self.prompter.prompt().await {
            Ok(PermissionStatus::Granted) => {
                info!("Location permission granted");
                Ok(PermissionStatus::Granted)
            }
            Ok(PermissionStatus::Denied) => {
                info!("Location permission denied by user");
                Err(BridgeError::new(ErrorCode::PermissionDenied, "User denied"))
            }
            Err(e) => {
                warn!(error = %e, "Permission prompt unavailable");
                Err(BridgeError::new(ErrorCode::UnknownError, e.to_string()))
            }
        }
    }

    /// Resolve the user's location and rank nearby places.
    pub async fn get_nearby_places(&self) -> Result<PlacesResult, BridgeError> {
        if !self.session.platform().has_permission() {
            return Err(BridgeError::new(
                ErrorCode::PermissionDenied,
                "Location permission not granted",
            ));
        }

        self.session.query().await.map_err(BridgeError::from)
    }

    /// Tear down: cancel any in-flight load.
    pub fn invalidate(&self) {
        self.session.cancel();
    }
}
