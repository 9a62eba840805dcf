//! Gatehouse - access gate and site-status service
//!
//! Decides, per request, whether a client token from a given network
//! address may use a site, and pushes site-wide status (lockdown and a
//! short-lived broadcast message) to connected clients.
//!
//! - `access`: client records, IP bans, decision engine, presence capture
//! - `site`: site lockdown, broadcast message, realtime fan-out
//! - `persistence`: versioned JSON documents behind a port trait
//! - `http`: JSON API and WebSocket surface
//!
//! Both aggregates are loaded once at startup and persisted on every
//! mutation. A single process owns the data directory.

pub mod access;
pub mod clock;
pub mod http;
pub mod persistence;
pub mod site;
