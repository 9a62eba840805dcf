//! Device-class heuristics.
//!
//! The only built-in signal is desktop-class telemetry from a client the
//! site expects to be on a phone. This is an approximate signal and not a
//! security boundary; the markers are operator-tunable through config.

use super::types::ClientRecord;

/// Predicate deciding whether an `unverified` client should be quarantined.
pub trait DeviceHeuristic: Send + Sync {
    fn is_suspicious(&self, record: &ClientRecord) -> bool;
}

/// Heuristic that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl DeviceHeuristic for Disabled {
    fn is_suspicious(&self, _record: &ClientRecord) -> bool {
        false
    }
}

/// Default desktop markers, matched case-insensitively against
/// `platform` and `userAgent`.
pub const DEFAULT_DESKTOP_MARKERS: &[&str] = &[
    "win32",
    "win64",
    "windows nt",
    "macintel",
    "macintosh",
    "x11",
    "linux x86_64",
    "; cros",
];

/// Default mobile markers. Any of these vetoes a desktop match.
pub const DEFAULT_MOBILE_MARKERS: &[&str] = &["android", "iphone", "ipad", "ipod", "mobile"];

/// Flags telemetry that looks like a desktop browser.
#[derive(Debug, Clone)]
pub struct DesktopHeuristic {
    desktop_markers: Vec<String>,
    mobile_markers: Vec<String>,
}

impl DesktopHeuristic {
    pub fn new<D, M>(desktop_markers: D, mobile_markers: M) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self {
            desktop_markers: normalize_markers(desktop_markers),
            mobile_markers: normalize_markers(mobile_markers),
        }
    }
}

impl Default for DesktopHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_DESKTOP_MARKERS, DEFAULT_MOBILE_MARKERS)
    }
}

impl DeviceHeuristic for DesktopHeuristic {
    fn is_suspicious(&self, record: &ClientRecord) -> bool {
        let haystack = format!("{} {}", record.platform, record.user_agent).to_lowercase();
        if haystack.trim().is_empty() {
            return false;
        }
        if self.mobile_markers.iter().any(|m| haystack.contains(m)) {
            return false;
        }
        self.desktop_markers.iter().any(|m| haystack.contains(m))
    }
}

fn normalize_markers<I>(markers: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    markers
        .into_iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: &str, user_agent: &str) -> ClientRecord {
        ClientRecord {
            platform: platform.to_string(),
            user_agent: user_agent.to_string(),
            ..ClientRecord::default()
        }
    }

    #[test]
    fn test_windows_desktop_flagged() {
        let heuristic = DesktopHeuristic::default();
        assert!(heuristic.is_suspicious(&record(
            "Win32",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
        )));
    }

    #[test]
    fn test_mac_desktop_flagged() {
        let heuristic = DesktopHeuristic::default();
        assert!(heuristic.is_suspicious(&record("MacIntel", "")));
    }

    #[test]
    fn test_iphone_not_flagged() {
        let heuristic = DesktopHeuristic::default();
        assert!(!heuristic.is_suspicious(&record(
            "iPhone",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
        )));
    }

    #[test]
    fn test_android_linux_platform_not_flagged() {
        let heuristic = DesktopHeuristic::default();
        assert!(!heuristic.is_suspicious(&record(
            "Linux armv8l",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari/537.36"
        )));
    }

    #[test]
    fn test_chromeos_flagged_but_not_cros_substrings() {
        let heuristic = DesktopHeuristic::default();
        assert!(heuristic.is_suspicious(&record(
            "",
            "Mozilla/5.0 (X11; CrOS x86_64 14541.0.0) AppleWebKit/537.36"
        )));
        assert!(!heuristic.is_suspicious(&record(
            "",
            "Mozilla/5.0 (Macros Browser) Microsoft-CryptoAPI/10.0"
        )));
    }

    #[test]
    fn test_empty_telemetry_not_flagged() {
        let heuristic = DesktopHeuristic::default();
        assert!(!heuristic.is_suspicious(&record("", "")));
    }

    #[test]
    fn test_custom_markers() {
        let heuristic = DesktopHeuristic::new(["  FooOS "], Vec::<String>::new());
        assert!(heuristic.is_suspicious(&record("fooos 3", "")));
        assert!(!heuristic.is_suspicious(&record("Win32", "")));
    }

    #[test]
    fn test_disabled_never_fires() {
        assert!(!Disabled.is_suspicious(&record("Win32", "Windows NT")));
    }
}
