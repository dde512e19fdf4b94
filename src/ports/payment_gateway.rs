//! Payment gateway port for the external payment provider.
//!
//! Checkout makes exactly one charge call per attempt. Retries and backoff
//! toward the provider are not part of this contract.

use crate::domain::billing::{
    BillingError, PaymentArtifacts, PaymentInstrument, PaymentMethod, PaymentStatus,
};
use crate::domain::foundation::{PaymentId, UserId};
use async_trait::async_trait;

/// Port for charge creation at the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Name recorded on each payment (`payments.provider`).
    fn provider_name(&self) -> &str;

    /// Create a charge.
    ///
    /// Returns the provider's transaction id, its initial status, and any
    /// artifacts the member needs (boleto barcode, pix QR code).
    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse, GatewayError>;
}

/// Request to create a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Local payment id, sent as the provider-side reference.
    pub reference: PaymentId,

    pub user_id: UserId,
    pub amount_cents: i64,

    /// Shown on the statement or boleto.
    pub description: String,

    pub instrument: PaymentInstrument,
}

impl ChargeRequest {
    pub fn method(&self) -> PaymentMethod {
        self.instrument.method()
    }
}

/// Provider's answer to a charge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeResponse {
    /// Provider transaction id. Becomes the payment's idempotency key.
    pub provider_id: String,

    pub status: PaymentStatus,
    pub artifacts: PaymentArtifacts,
}

/// Payment gateway error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Declined, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::Timeout => BillingError::provider_timeout(err.message),
            code => BillingError::provider(code.to_string(), err.message),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// No answer within the configured bound.
    Timeout,

    /// API key rejected.
    AuthenticationError,

    /// Charge refused by the issuer or antifraud.
    Declined,

    /// Provider rejected the request payload.
    InvalidRequest,

    /// Provider answered with something we cannot parse.
    InvalidResponse,

    /// Provider-side failure.
    ProviderError,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::Timeout | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::Declined => "declined",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
