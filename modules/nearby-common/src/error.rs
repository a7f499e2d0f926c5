use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code surfaced to the UI collaborator.
///
/// The four recognised codes have fixed string forms. Any other failure
/// reason travels verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    PermissionDenied,
    LocationDisabled,
    LocationUnavailable,
    UnknownError,
    Other(String),
}

/// Substrings that mark a failure reason as "no fix could be obtained".
const UNAVAILABLE_MARKERS: &[&str] = &["LOCATION_UNAVAILABLE", "null", "unavailable", "timed out"];

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::LocationDisabled => "LOCATION_DISABLED",
            ErrorCode::LocationUnavailable => "LOCATION_UNAVAILABLE",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    /// Normalize a resolver failure reason into an error code.
    ///
    /// Reasons that describe a missing fix collapse to `LOCATION_UNAVAILABLE`,
    /// an empty reason is `UNKNOWN_ERROR`, anything unrecognised passes
    /// through verbatim.
    pub fn from_reason(reason: &str) -> Self {
        let reason = reason.trim();
        if reason.is_empty() {
            return ErrorCode::UnknownError;
        }
        if UNAVAILABLE_MARKERS.iter().any(|m| reason.contains(m)) {
            return ErrorCode::LocationUnavailable;
        }
        match reason {
            "PERMISSION_DENIED" => ErrorCode::PermissionDenied,
            "LOCATION_DISABLED" => ErrorCode::LocationDisabled,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::PermissionDenied => ErrorKind::Permission,
            ErrorCode::LocationDisabled => ErrorKind::ServiceDisabled,
            ErrorCode::LocationUnavailable => ErrorKind::TransientUnavailable,
            ErrorCode::UnknownError | ErrorCode::Other(_) => ErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        ErrorCode::from_reason(&value)
    }
}

impl From<ErrorCode> for String {
    fn from(value: ErrorCode) -> Self {
        value.as_str().to_string()
    }
}

/// Coarse classification of a failure, used to decide how the UI may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User or system denied access. Needs a new permission prompt.
    Permission,
    /// OS-level location is off. Needs the user to turn it back on.
    ServiceDisabled,
    /// Timeout or no fix. Retry immediately.
    TransientUnavailable,
    /// Unexpected platform failure. Retry, details are in the logs.
    Unknown,
}

impl ErrorKind {
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::TransientUnavailable | ErrorKind::Unknown)
    }

    pub fn needs_user_action(self) -> bool {
        !self.is_retriable()
    }
}

#[derive(Error, Debug)]
pub enum NearbyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
