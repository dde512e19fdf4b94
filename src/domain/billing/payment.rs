//! Payment entity - one record per checkout attempt.

use crate::domain::foundation::{PaymentId, SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PaymentStatus;

/// How the member pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Boleto,
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Pix => "pix",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "credit_card" => Ok(PaymentMethod::Card),
            "boleto" => Ok(PaymentMethod::Boleto),
            "pix" => Ok(PaymentMethod::Pix),
            other => Err(format!("unsupported payment method: {}", other)),
        }
    }
}

/// Method-specific artifacts the member needs to complete payment.
///
/// Boleto fills `barcode`/`boleto_url`, pix fills `qr_code`/`qr_code_text`,
/// card leaves everything empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentArtifacts {
    pub barcode: Option<String>,
    pub boleto_url: Option<String>,
    pub qr_code: Option<String>,
    pub qr_code_text: Option<String>,
}

/// Payment record.
///
/// # Invariants
///
/// - `provider_id` is unique across all payments
/// - Created `pending` (or with the provider's first status) at checkout
/// - Only the reconciler mutates `status` afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,

    /// Subscription this payment pays for. May be absent for payments
    /// created outside checkout.
    pub subscription_id: Option<SubscriptionId>,

    pub user_id: UserId,
    pub method: PaymentMethod,

    /// Gateway that issued `provider_id`.
    pub provider: String,

    /// External transaction identifier, the idempotency key for webhooks.
    pub provider_id: String,

    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub artifacts: PaymentArtifacts,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Records a charge the provider has just accepted.
    #[allow(clippy::too_many_arguments)]
    pub fn record_charge(
        id: PaymentId,
        subscription_id: Option<SubscriptionId>,
        user_id: UserId,
        method: PaymentMethod,
        provider: impl Into<String>,
        provider_id: impl Into<String>,
        status: PaymentStatus,
        amount_cents: i64,
        artifacts: PaymentArtifacts,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            subscription_id,
            user_id,
            method,
            provider: provider.into(),
            provider_id: provider_id.into(),
            status,
            amount_cents,
            artifacts,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the status with the provider's latest value.
    pub fn apply_status(&mut self, status: PaymentStatus, now: Timestamp) {
        self.status = status;
        self.updated_at = now;
    }
}
