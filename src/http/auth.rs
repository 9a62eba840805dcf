//! Shared-secret checks for the admin, auth-gate and self-unban PINs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Header carrying the admin PIN.
pub const ADMIN_PIN_HEADER: &str = "x-admin-pin";

/// The three shared secrets. `None` (or empty) means "not configured",
/// which makes the corresponding check always fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    pub admin_pin: Option<String>,
    pub auth_pin: Option<String>,
    pub unban_pin: Option<String>,
}

impl Secrets {
    pub fn admin_matches(&self, attempt: Option<&str>) -> bool {
        secret_matches(self.admin_pin.as_deref(), attempt)
    }

    pub fn auth_matches(&self, attempt: Option<&str>) -> bool {
        secret_matches(self.auth_pin.as_deref(), attempt)
    }

    pub fn unban_matches(&self, attempt: Option<&str>) -> bool {
        secret_matches(self.unban_pin.as_deref(), attempt)
    }
}

/// Compare an attempt against a configured secret.
///
/// Both sides are hashed first so the comparison always covers 32 bytes
/// regardless of input lengths. Attempts are trimmed.
pub fn secret_matches(expected: Option<&str>, attempt: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return false;
    };
    let Some(attempt) = attempt.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };

    let expected = Sha256::digest(expected.as_bytes());
    let attempt = Sha256::digest(attempt.as_bytes());
    expected.as_slice().ct_eq(attempt.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(secret_matches(Some("1234"), Some("1234")));
        assert!(secret_matches(Some("1234"), Some(" 1234 ")));
    }

    #[test]
    fn test_wrong_secret() {
        assert!(!secret_matches(Some("1234"), Some("4321")));
        assert!(!secret_matches(Some("1234"), Some("12345")));
    }

    #[test]
    fn test_secret_differing_in_last_byte() {
        assert!(!secret_matches(Some("pin-000000000001"), Some("pin-000000000002")));
        assert!(!secret_matches(Some("a"), Some("A")));
    }

    #[test]
    fn test_unset_secret_never_matches() {
        assert!(!secret_matches(None, Some("1234")));
        assert!(!secret_matches(Some(""), Some("")));
        assert!(!secret_matches(None, None));
    }

    #[test]
    fn test_missing_attempt_never_matches() {
        assert!(!secret_matches(Some("1234"), None));
        assert!(!secret_matches(Some("1234"), Some("   ")));
    }

    #[test]
    fn test_secrets_are_independent() {
        let secrets = Secrets {
            admin_pin: Some("admin".to_string()),
            auth_pin: Some("auth".to_string()),
            unban_pin: None,
        };
        assert!(secrets.admin_matches(Some("admin")));
        assert!(!secrets.admin_matches(Some("auth")));
        assert!(secrets.auth_matches(Some("auth")));
        assert!(!secrets.unban_matches(Some("admin")));
    }
}
