//! Field extraction for provider webhook payloads.
//!
//! Providers deliver the same facts in different shapes. Each fact is
//! located by an ordered table of JSON paths; the first path that yields a
//! usable value wins. Supporting a new payload shape is a table edit.

use serde_json::Value;

use super::{BillingError, PaymentStatus};

/// A JSON path into the webhook body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub path: &'static [&'static str],
}

impl ExtractionRule {
    pub const fn at(path: &'static [&'static str]) -> Self {
        Self { path }
    }

    /// Resolves the path to a non-empty scalar, rendered as a string.
    pub fn resolve(&self, payload: &Value) -> Option<String> {
        let mut current = payload;
        for segment in self.path {
            current = current.get(segment)?;
        }
        match current {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Where the provider transaction id may live, highest priority first.
pub const PROVIDER_ID_RULES: &[ExtractionRule] = &[
    ExtractionRule::at(&["id"]),
    ExtractionRule::at(&["transaction", "id"]),
];

/// Where the payment status may live, highest priority first.
pub const STATUS_RULES: &[ExtractionRule] = &[
    ExtractionRule::at(&["status"]),
    ExtractionRule::at(&["current_status"]),
    ExtractionRule::at(&["transaction", "status"]),
];

/// Returns the first value any rule resolves to.
pub fn first_match(rules: &[ExtractionRule], payload: &Value) -> Option<String> {
    rules.iter().find_map(|rule| rule.resolve(payload))
}

/// The facts reconciliation needs from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotification {
    pub provider_id: String,
    pub status: PaymentStatus,
}

impl WebhookNotification {
    /// Extracts the provider id and status from a webhook body.
    ///
    /// Unknown fields are ignored. A missing status means `pending`.
    ///
    /// # Errors
    ///
    /// `UnprocessableWebhookEvent` when no provider id can be found.
    pub fn extract(payload: &Value) -> Result<Self, BillingError> {
        let provider_id = first_match(PROVIDER_ID_RULES, payload).ok_or_else(|| {
            BillingError::unprocessable("no provider transaction id in payload")
        })?;

        let status = first_match(STATUS_RULES, payload)
            .map(PaymentStatus::new)
            .unwrap_or_else(PaymentStatus::pending);

        Ok(Self {
            provider_id,
            status,
        })
    }
}
