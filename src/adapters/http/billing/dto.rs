//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! Provider payloads never cross this boundary; only the artifacts the member
//! needs to pay are exposed.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::StartCheckoutResult;
use crate::domain::billing::{
    PaymentMethod, PaymentSummary, SubscriptionStatus, SubscriptionView,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a checkout.
///
/// Ids are taken as strings so malformed values produce a field-level
/// validation error instead of a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub plan_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    /// `card`, `boleto`, or `pix`.
    pub method: String,
    /// Tokenized card, required for `card`.
    #[serde(default)]
    pub card_token: Option<String>,
    #[serde(default)]
    pub installments: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a started checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// Subscription status after checkout.
    pub status: SubscriptionStatus,
    pub subscription_id: String,
    pub payment_id: String,
    pub method: PaymentMethod,
    /// Provider-reported payment status.
    pub payment_status: String,
    /// What the member needs to complete payment. Absent for card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<CheckoutArtifact>,
}

/// Method-specific payment instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutArtifact {
    Boleto {
        barcode: Option<String>,
        url: Option<String>,
    },
    Pix {
        qr_code: Option<String>,
        qr_code_text: Option<String>,
    },
}

impl From<StartCheckoutResult> for CheckoutResponse {
    fn from(result: StartCheckoutResult) -> Self {
        let payment = result.payment;
        let artifacts = payment.artifacts;
        let artifact = match payment.method {
            PaymentMethod::Card => None,
            PaymentMethod::Boleto => Some(CheckoutArtifact::Boleto {
                barcode: artifacts.barcode,
                url: artifacts.boleto_url,
            }),
            PaymentMethod::Pix => Some(CheckoutArtifact::Pix {
                qr_code: artifacts.qr_code,
                qr_code_text: artifacts.qr_code_text,
            }),
        };

        Self {
            status: result.subscription.status,
            subscription_id: result.subscription.id.to_string(),
            payment_id: payment.id.to_string(),
            method: payment.method,
            payment_status: payment.status.as_str().to_string(),
            artifact,
        }
    }
}

/// Response for the subscription status read.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    /// ISO 8601.
    pub started_at: Option<String>,
    /// ISO 8601.
    pub current_period_end: Option<String>,
    pub has_access: bool,
    pub latest_payment: Option<PaymentSummaryResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummaryResponse {
    pub payment_id: String,
    pub method: PaymentMethod,
    pub status: String,
    pub updated_at: String,
}

impl From<PaymentSummary> for PaymentSummaryResponse {
    fn from(summary: PaymentSummary) -> Self {
        Self {
            payment_id: summary.payment_id.to_string(),
            method: summary.method,
            status: summary.status.as_str().to_string(),
            updated_at: summary.updated_at.to_rfc3339(),
        }
    }
}

impl From<SubscriptionView> for SubscriptionStatusResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            subscription_id: view.subscription_id.to_string(),
            status: view.status,
            started_at: view.started_at.map(|t| t.to_rfc3339()),
            current_period_end: view.current_period_end.map(|t| t.to_rfc3339()),
            has_access: view.has_access,
            latest_payment: view.latest_payment.map(PaymentSummaryResponse::from),
        }
    }
}

/// Constant webhook acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
