//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Which gateway adapter to wire in.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    #[default]
    Pagarme,
    /// In-process gateway that accepts every charge. Development only.
    Mock,
}

/// Payment provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub provider: PaymentProviderKind,

    /// Provider secret API key
    pub api_key: Option<SecretString>,

    /// Provider API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upper bound for a single charge call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Where the provider should deliver status webhooks
    pub postback_url: Option<String>,
}

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if using a provider test key
    pub fn is_test_mode(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().starts_with("ak_test_"))
            .unwrap_or(false)
    }

    /// Validate payment configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(ValidationError::InvalidProviderTimeout);
        }

        match self.provider {
            PaymentProviderKind::Mock => {
                if production {
                    return Err(ValidationError::MockProviderInProduction);
                }
                Ok(())
            }
            PaymentProviderKind::Pagarme => {
                let has_key = self
                    .api_key
                    .as_ref()
                    .map(|k| !k.expose_secret().trim().is_empty())
                    .unwrap_or(false);
                if !has_key {
                    return Err(ValidationError::MissingRequired("PAYMENT__API_KEY"));
                }
                if !self.api_base_url.starts_with("https://")
                    && !self.api_base_url.starts_with("http://")
                {
                    return Err(ValidationError::InvalidPaymentApiUrl);
                }
                if production {
                    if let Some(url) = &self.postback_url {
                        if !url.starts_with("https://") {
                            return Err(ValidationError::PostbackMustBeHttps);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProviderKind::default(),
            api_key: None,
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout(),
            postback_url: None,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.pagar.me/1".to_string()
}

fn default_timeout() -> u64 {
    10
}
