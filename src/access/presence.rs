//! Presence tracking: telemetry capture whenever a client is observed.

use super::store::AccessStore;
use super::types::{
    truncate_chars, ClientRecord, MAX_LANGUAGE, MAX_PLATFORM, MAX_SCREEN, MAX_TIMEZONE,
    MAX_USER_AGENT,
};
use serde::Deserialize;
use std::sync::Arc;

/// Device telemetry reported by the client app.
///
/// All fields are optional and free-form; over-long values are truncated,
/// not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceTelemetry {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub screen: Option<String>,
}

impl DeviceTelemetry {
    /// Write reported fields onto `record`. Returns whether anything changed.
    ///
    /// Last write wins; absent or blank fields leave the stored value alone.
    pub fn apply_to(&self, record: &mut ClientRecord) -> bool {
        let mut changed = false;
        changed |= set_field(&mut record.user_agent, self.user_agent.as_deref(), MAX_USER_AGENT);
        changed |= set_field(&mut record.platform, self.platform.as_deref(), MAX_PLATFORM);
        changed |= set_field(&mut record.language, self.language.as_deref(), MAX_LANGUAGE);
        changed |= set_field(&mut record.timezone, self.timezone.as_deref(), MAX_TIMEZONE);
        changed |= set_field(&mut record.screen, self.screen.as_deref(), MAX_SCREEN);
        changed
    }
}

fn set_field(slot: &mut String, value: Option<&str>, max: usize) -> bool {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return false;
    };
    let value = truncate_chars(value, max);
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Records telemetry and source addresses on client records.
#[derive(Clone)]
pub struct PresenceTracker {
    store: Arc<AccessStore>,
}

impl PresenceTracker {
    pub fn new(store: Arc<AccessStore>) -> Self {
        Self { store }
    }

    /// A client announced itself. Creates the record on first sight.
    pub fn hello(
        &self,
        token: &str,
        device: Option<&DeviceTelemetry>,
        source_address: Option<&str>,
    ) -> ClientRecord {
        self.store.upsert_client(token, |record, now| {
            let mut changed = device.map(|d| d.apply_to(record)).unwrap_or(false);
            if let Some(address) = source_address {
                changed |= record.ip_last != address || record.ip_first.is_empty();
                record.observe_ip(address, now);
            }
            changed
        })
    }

    /// A known client was seen again. Unknown tokens are not created.
    ///
    /// Only a new source address is persisted; `lastSeenAt` alone stays in memory.
    pub fn observe(&self, token: &str, source_address: Option<&str>) -> Option<ClientRecord> {
        self.store.update_client(token, |record, now| {
            record.last_seen_at = now;
            let Some(address) = source_address else {
                return false;
            };
            let moved = record.ip_last != address || record.ip_first.is_empty();
            record.observe_ip(address, now);
            moved
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::types::ClientStatus;
    use crate::clock::ManualClock;
    use crate::persistence::MemoryStore;

    fn tracker() -> (PresenceTracker, Arc<AccessStore>, MemoryStore, Arc<ManualClock>) {
        let port = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(100));
        let store = Arc::new(AccessStore::load(Arc::new(port.clone()), clock.clone()));
        (PresenceTracker::new(Arc::clone(&store)), store, port, clock)
    }

    fn phone() -> DeviceTelemetry {
        DeviceTelemetry {
            user_agent: Some("Mozilla/5.0 (iPhone)".to_string()),
            platform: Some("iPhone".to_string()),
            language: Some("en-GB".to_string()),
            timezone: Some("Europe/London".to_string()),
            screen: Some("390x844".to_string()),
        }
    }

    #[test]
    fn test_hello_creates_record_with_telemetry() {
        let (tracker, store, _, _) = tracker();

        let record = tracker.hello("abc", Some(&phone()), Some("10.0.0.1"));
        assert_eq!(record.status, ClientStatus::Unverified);
        assert_eq!(record.platform, "iPhone");
        assert_eq!(record.timezone, "Europe/London");
        assert_eq!(record.ip_first, "10.0.0.1");
        assert_eq!(record.ip_last_seen_at, 100);
        assert_eq!(store.client("abc").unwrap(), record);
    }

    #[test]
    fn test_hello_last_write_wins() {
        let (tracker, _, _, _) = tracker();
        tracker.hello("abc", Some(&phone()), None);

        let update = DeviceTelemetry {
            language: Some("fr-FR".to_string()),
            platform: Some("   ".to_string()),
            ..DeviceTelemetry::default()
        };
        let record = tracker.hello("abc", Some(&update), None);
        assert_eq!(record.language, "fr-FR");
        assert_eq!(record.platform, "iPhone");
    }

    #[test]
    fn test_hello_truncates_fields() {
        let (tracker, _, _, _) = tracker();
        let device = DeviceTelemetry {
            user_agent: Some("u".repeat(1_000)),
            screen: Some("s".repeat(100)),
            ..DeviceTelemetry::default()
        };

        let record = tracker.hello("abc", Some(&device), None);
        assert_eq!(record.user_agent.len(), MAX_USER_AGENT);
        assert_eq!(record.screen.len(), MAX_SCREEN);
    }

    #[test]
    fn test_repeat_hello_without_changes_does_not_persist() {
        let (tracker, _, port, _) = tracker();
        tracker.hello("abc", Some(&phone()), Some("10.0.0.1"));
        let saves = port.save_count();

        tracker.hello("abc", Some(&phone()), Some("10.0.0.1"));
        assert_eq!(port.save_count(), saves);
    }

    #[test]
    fn test_hello_tracks_ip_changes() {
        let (tracker, _, _, clock) = tracker();
        tracker.hello("abc", None, Some("10.0.0.1"));
        clock.advance(5);

        let record = tracker.hello("abc", None, Some("10.0.0.2"));
        assert_eq!(record.ip_first, "10.0.0.1");
        assert_eq!(record.ip_last, "10.0.0.2");
        assert_eq!(record.ip_last_seen_at, 105);
    }

    #[test]
    fn test_observe_unknown_creates_nothing() {
        let (tracker, store, _, _) = tracker();
        assert!(tracker.observe("ghost", Some("10.0.0.1")).is_none());
        assert!(store.client("ghost").is_none());
    }

    #[test]
    fn test_observe_known_updates_ip() {
        let (tracker, _, _, clock) = tracker();
        tracker.hello("abc", None, None);
        clock.advance(10);

        let record = tracker.observe("abc", Some("10.0.0.9")).unwrap();
        assert_eq!(record.ip_last, "10.0.0.9");
        assert_eq!(record.last_seen_at, 110);
    }

    #[test]
    fn test_repeat_observe_from_same_address_does_not_persist() {
        let (tracker, store, port, clock) = tracker();
        tracker.hello("abc", None, Some("10.0.0.1"));
        let saves = port.save_count();

        for _ in 0..10 {
            clock.advance(1);
            tracker.observe("abc", Some("10.0.0.1"));
        }
        assert_eq!(port.save_count(), saves);
        assert_eq!(store.client("abc").unwrap().last_seen_at, 110);

        tracker.observe("abc", Some("10.0.0.2"));
        assert_eq!(port.save_count(), saves + 1);
    }

    #[test]
    fn test_telemetry_rejects_unknown_fields() {
        let result: Result<DeviceTelemetry, _> =
            serde_json::from_str(r#"{"platform":"x","gpu":"y"}"#);
        assert!(result.is_err());
    }
}
