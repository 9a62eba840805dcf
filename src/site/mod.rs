//! Site-wide status and its realtime propagation.

pub mod channel;
pub mod state;

pub use channel::{BroadcastChannel, SiteEvent, Subscription};
pub use state::{
    Broadcast, LockdownState, SiteError, SiteState, SiteStateStore, BROADCAST_TTL_MS,
    MAX_BROADCAST_MESSAGE,
};
