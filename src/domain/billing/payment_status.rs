//! Payment status as reported by the provider.
//!
//! The provider vocabulary is open-ended, so the status is kept as a
//! normalized string rather than a closed enum. Meaning is attached to
//! specific values by the transition policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider payment status, trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentStatus(String);

impl PaymentStatus {
    pub const PENDING: &'static str = "pending";
    pub const PAID: &'static str = "paid";
    pub const AUTHORIZED: &'static str = "authorized";
    pub const REFUSED: &'static str = "refused";
    pub const FAILED: &'static str = "failed";

    /// Normalizes a raw provider status. Blank input becomes `pending`.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_ascii_lowercase();
        if normalized.is_empty() {
            Self::pending()
        } else {
            Self(normalized)
        }
    }

    pub fn pending() -> Self {
        Self(Self::PENDING.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for statuses that confirm the charge.
    pub fn is_paid(&self) -> bool {
        matches!(self.0.as_str(), Self::PAID | Self::AUTHORIZED)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentStatus {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(PaymentStatus::new("  PAID ").as_str(), "paid");
    }

    #[test]
    fn blank_status_defaults_to_pending() {
        assert_eq!(PaymentStatus::new("   "), PaymentStatus::pending());
    }

    #[test]
    fn paid_set_is_paid_and_authorized() {
        assert!(PaymentStatus::new("paid").is_paid());
        assert!(PaymentStatus::new("authorized").is_paid());
        assert!(!PaymentStatus::new("refused").is_paid());
        assert!(!PaymentStatus::new("waiting_payment").is_paid());
    }

    #[test]
    fn unknown_vocabulary_is_kept_verbatim() {
        assert_eq!(PaymentStatus::new("chargedback").as_str(), "chargedback");
    }
}
