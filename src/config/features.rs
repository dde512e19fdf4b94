//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Ignore webhook statuses that rank below the stored payment status.
    /// When off, every delivery overwrites (last write wins).
    #[serde(default = "default_monotonic_payment_status")]
    pub monotonic_payment_status: bool,

    /// Show detailed error messages (disable in production!)
    #[serde(default)]
    pub verbose_errors: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            monotonic_payment_status: default_monotonic_payment_status(),
            verbose_errors: false,
        }
    }
}

fn default_monotonic_payment_status() -> bool {
    true
}
