//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | PlanNotFound | 404 |
//! | SubscriptionNotFound | 404 |
//! | AlreadySubscribed | 409 |
//! | PlanInactive | 422 |
//! | PaymentProvider | 502 (504 on timeout) |
//! | Storage | 503 |
//!
//! `UnprocessableWebhookEvent` and `UnknownPaymentReference` are only logged;
//! the webhook endpoint acknowledges every delivery.

use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, UserId, ValidationError,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Malformed checkout request, rejected before any provider call.
    #[error("Validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Plan not found: {0}")]
    PlanNotFound(PlanId),

    #[error("Plan is not active: {0}")]
    PlanInactive(PlanId),

    /// User already holds a subscription with access.
    #[error("User {0} already has an active subscription")]
    AlreadySubscribed(UserId),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// Provider call failed or timed out. Nothing was committed.
    #[error("Payment provider error [{code}]: {message}")]
    PaymentProvider {
        code: String,
        message: String,
        timed_out: bool,
    },

    /// Webhook body without a usable provider id.
    #[error("Unprocessable webhook event: {0}")]
    UnprocessableWebhookEvent(String),

    /// Webhook for a provider id with no local payment.
    #[error("Unknown payment reference: {0}")]
    UnknownPaymentReference(String),

    /// Transient failure reading or writing the ledger.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::PaymentProvider {
            code: code.into(),
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn provider_timeout(message: impl Into<String>) -> Self {
        BillingError::PaymentProvider {
            code: "timeout".to_string(),
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn unprocessable(reason: impl Into<String>) -> Self {
        BillingError::UnprocessableWebhookEvent(reason.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Validation { .. } => ErrorCode::ValidationFailed,
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::PlanInactive(_) => ErrorCode::PlanInactive,
            BillingError::AlreadySubscribed(_) => ErrorCode::SubscriptionExists,
            BillingError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
            BillingError::UnprocessableWebhookEvent(_) => ErrorCode::ValidationFailed,
            BillingError::UnknownPaymentReference(_) => ErrorCode::PaymentNotFound,
            BillingError::Storage(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns true if replaying the same input later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Storage(_) | BillingError::PaymentProvider { timed_out: true, .. }
        )
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::validation(err.field(), err.to_string())
    }
}

/// Port errors arrive as `DomainError`; anything that is not a validation
/// problem is treated as a storage fault.
impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "request".to_string());
                BillingError::validation(field, err.message)
            }
            _ => BillingError::storage(err.to_string()),
        }
    }
}
