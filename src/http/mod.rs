//! HTTP surface: JSON API plus the realtime WebSocket.
//!
//! Handlers receive an explicitly constructed [`AppState`]; there are no
//! process globals. Admin routes require the `x-admin-pin` header.

pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod public;
pub mod realtime;
pub mod schema;

pub use auth::{Secrets, ADMIN_PIN_HEADER};
pub use error::ApiError;

use crate::access::{AccessStore, DecisionEngine, DeviceHeuristic, PresenceTracker};
use crate::clock::Clock;
use crate::persistence::PersistencePort;
use crate::site::{BroadcastChannel, SiteStateStore};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Everything a handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessStore>,
    pub engine: DecisionEngine,
    pub presence: PresenceTracker,
    pub site: Arc<SiteStateStore>,
    pub secrets: Arc<Secrets>,
    pub trust_proxy: bool,
}

impl AppState {
    /// Load both aggregates from `port` and wire up the components.
    pub fn new(
        port: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        heuristic: Arc<dyn DeviceHeuristic>,
        secrets: Secrets,
        trust_proxy: bool,
    ) -> Self {
        let access = Arc::new(AccessStore::load(Arc::clone(&port), Arc::clone(&clock)));
        let site = Arc::new(SiteStateStore::load(port, clock, BroadcastChannel::new()));

        Self {
            engine: DecisionEngine::new(Arc::clone(&access), heuristic),
            presence: PresenceTracker::new(Arc::clone(&access)),
            access,
            site,
            secrets: Arc::new(secrets),
            trust_proxy,
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(public::health))
        .route("/api/state", get(public::site_state))
        .route("/api/hello", post(public::hello))
        .route("/api/auth", post(public::auth))
        .route("/api/check", post(public::check))
        .route("/api/unban", post(public::self_unban))
        .route("/api/admin/list", get(admin::list))
        .route("/api/admin/verify", post(admin::verify))
        .route("/api/admin/suspicious", post(admin::suspicious))
        .route("/api/admin/clear-suspicious", post(admin::clear_suspicious))
        .route("/api/admin/ban", post(admin::ban))
        .route("/api/admin/unban", post(admin::unban))
        .route("/api/admin/ban-ip", post(admin::ban_ip))
        .route("/api/admin/unban-ip", post(admin::unban_ip))
        .route("/api/admin/lockdown", post(admin::access_lockdown))
        .route("/api/broadcast", post(admin::broadcast))
        .route("/api/clear-broadcast", post(admin::clear_broadcast))
        .route("/api/lockdown", post(admin::site_lockdown))
        .route("/api/clear-lockdown", post(admin::clear_site_lockdown))
        .route("/ws", get(realtime::subscribe))
        .with_state(state)
}
