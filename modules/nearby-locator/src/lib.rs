//! Location acquisition.
//!
//! `LocationResolver` turns a device that may deny permission, have location
//! services off, or fail transient fixes into a single `LocationOutcome`.
//! The device itself sits behind the `LocationPlatform` trait; `SimPlatform`
//! is a scripted stand-in for tests and the CLI.

pub mod fix;
pub mod platform;
pub mod resolver;
pub mod sim;

pub use fix::{request_one_update, FixResult, FixSink};
pub use platform::{
    AccuracyTier, LocationPlatform, PermissionPrompter, PermissionStatus, PlatformError,
    SubscriptionId, UpdateRequest,
};
pub use resolver::{LocationOutcome, LocationResolver, LOCATION_UNAVAILABLE};
pub use sim::{FixScript, PromptAnswer, SimPlatform, SimPrompter};
