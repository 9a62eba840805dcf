//! Access module: per-client identity records and the decision engine.
//!
//! - Store: client records, IP bans, access-lockdown flag
//! - Decision: first-match-wins evaluation with heuristic reclassification
//! - Heuristic: pluggable device-class predicate
//! - Presence: telemetry capture on every observation

pub mod decision;
pub mod heuristic;
pub mod presence;
pub mod store;
pub mod types;

pub use decision::DecisionEngine;
pub use heuristic::{DesktopHeuristic, DeviceHeuristic, Disabled};
pub use presence::{DeviceTelemetry, PresenceTracker};
pub use store::{AccessStore, StatusUpdate};
pub use types::{
    normalize_address, normalize_token, AccessState, ClientRecord, ClientStatus, Decision,
    DecisionReason, IpBanRecord,
};
