//! Pagar.me payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Pagar.me transactions
//! API for card, boleto, and pix charges.
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and only exposed when
//!   the request body is built
//! - Card data arrives as a client-side `card_hash`; raw card numbers never
//!   reach this service
//!
//! # Configuration
//!
//! ```ignore
//! let config = PagarmeConfig::new(api_key)
//!     .with_postback_url("https://billing.example.com/api/webhooks/payments")
//!     .with_timeout(Duration::from_secs(10));
//! let gateway = PagarmeGateway::new(config)?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::config::PaymentConfig;
use crate::domain::billing::{PaymentArtifacts, PaymentInstrument, PaymentMethod, PaymentStatus};
use crate::ports::{ChargeRequest, ChargeResponse, GatewayError, GatewayErrorCode, PaymentGateway};

use super::wire_types::{ErrorResponse, Transaction, TransactionMetadata, TransactionRequest};

const PROVIDER_NAME: &str = "pagarme";

/// Days a pix QR code stays payable.
const PIX_EXPIRATION_DAYS: i64 = 1;

/// Pagar.me API configuration.
#[derive(Clone)]
pub struct PagarmeConfig {
    api_key: SecretString,
    api_base_url: String,
    postback_url: Option<String>,
    soft_descriptor: Option<String>,
    timeout: Duration,
}

impl PagarmeConfig {
    /// Create a new configuration with default base URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.pagar.me/1".to_string(),
            postback_url: None,
            soft_descriptor: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Build from application configuration. Returns `None` without an API key.
    pub fn from_payment_config(config: &PaymentConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            api_key,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            postback_url: config.postback_url.clone(),
            soft_descriptor: None,
            timeout: config.timeout(),
        })
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Where Pagar.me should post status changes.
    pub fn with_postback_url(mut self, url: impl Into<String>) -> Self {
        self.postback_url = Some(url.into());
        self
    }

    /// Text shown on the card statement.
    pub fn with_soft_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.soft_descriptor = Some(descriptor.into());
        self
    }

    /// HTTP client timeout for the charge call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pagar.me payment gateway adapter.
pub struct PagarmeGateway {
    config: PagarmeConfig,
    http_client: reqwest::Client,
}

impl PagarmeGateway {
    /// Create a new adapter with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built (TLS backend unavailable).
    pub fn new(config: PagarmeConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GatewayError::new(
                    GatewayErrorCode::ProviderError,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn build_request<'a>(&'a self, request: &'a ChargeRequest) -> TransactionRequest<'a> {
        let (payment_method, card_hash, installments) = match &request.instrument {
            PaymentInstrument::Card {
                card_token,
                installments,
            } => ("credit_card", Some(card_token.as_str()), Some(*installments)),
            PaymentInstrument::Boleto => ("boleto", None, None),
            PaymentInstrument::Pix => ("pix", None, None),
        };

        let pix_expiration_date = (request.method() == PaymentMethod::Pix).then(|| {
            (Utc::now() + chrono::Duration::days(PIX_EXPIRATION_DAYS))
                .format("%Y-%m-%d")
                .to_string()
        });

        TransactionRequest {
            api_key: self.config.api_key.expose_secret(),
            amount: request.amount_cents,
            payment_method,
            card_hash,
            installments,
            postback_url: self.config.postback_url.as_deref(),
            soft_descriptor: self.config.soft_descriptor.as_deref(),
            boleto_instructions: (request.method() == PaymentMethod::Boleto)
                .then_some(request.description.as_str()),
            pix_expiration_date,
            metadata: TransactionMetadata {
                payment_id: request.reference.to_string(),
                user_id: request.user_id.to_string(),
            },
        }
    }
}

/// Maps a transaction body onto the port's response.
///
/// A `refused` transaction is a declined charge, not a payment to record.
fn map_transaction(tx: Transaction) -> Result<ChargeResponse, GatewayError> {
    let provider_id = tx
        .id_string()
        .ok_or_else(|| GatewayError::invalid_response("Transaction without id"))?;
    let status = PaymentStatus::new(&tx.status);

    if status.as_str() == PaymentStatus::REFUSED {
        let mut err = GatewayError::declined(
            tx.refuse_reason
                .unwrap_or_else(|| "Transaction refused".to_string()),
        );
        if let Some(code) = tx.acquirer_response_code {
            err = err.with_provider_code(code);
        }
        return Err(err);
    }

    Ok(ChargeResponse {
        provider_id,
        status,
        artifacts: PaymentArtifacts {
            barcode: tx.boleto_barcode,
            boleto_url: tx.boleto_url,
            qr_code: tx.pix_qr_code_url,
            qr_code_text: tx.pix_qr_code,
        },
    })
}

/// Maps a non-success HTTP status onto a gateway error.
fn map_error_status(status: reqwest::StatusCode, body: &ErrorResponse) -> GatewayError {
    let code = match status.as_u16() {
        401 | 403 => GatewayErrorCode::AuthenticationError,
        400 | 404 | 422 => GatewayErrorCode::InvalidRequest,
        _ => GatewayErrorCode::ProviderError,
    };
    GatewayError::new(code, format!("Pagar.me API error ({}): {}", status, body.summary()))
        .with_provider_code(status.as_u16().to_string())
}

fn map_send_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout(format!("Pagar.me request timed out: {}", e))
    } else {
        GatewayError::network(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for PagarmeGateway {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse, GatewayError> {
        let url = format!("{}/transactions", self.config.api_base_url);
        let body = self.build_request(&request);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body: ErrorResponse = response.json().await.unwrap_or_default();
            let err = map_error_status(status, &error_body);
            tracing::error!(
                payment_id = %request.reference,
                method = %request.method(),
                code = %err.code,
                "Pagar.me create_charge failed: {}",
                err.message
            );
            return Err(err);
        }

        let tx: Transaction = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse Pagar.me response: {}", e))
        })?;

        let charge = map_transaction(tx)?;
        tracing::debug!(
            payment_id = %request.reference,
            provider_id = %charge.provider_id,
            status = %charge.status,
            "Pagar.me charge created"
        );
        Ok(charge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PaymentId, UserId};

    fn gateway() -> PagarmeGateway {
        PagarmeGateway::new(
            PagarmeConfig::new("ak_test_key")
                .with_postback_url("https://billing.example.com/api/webhooks/payments"),
        )
        .unwrap()
    }

    fn charge(instrument: PaymentInstrument) -> ChargeRequest {
        ChargeRequest {
            reference: PaymentId::new(),
            user_id: UserId::new("user-1").unwrap(),
            amount_cents: 4990,
            description: "Sócio Ouro".to_string(),
            instrument,
        }
    }

    fn transaction(json: &str) -> Transaction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn config_from_payment_config_requires_key() {
        assert!(PagarmeConfig::from_payment_config(&PaymentConfig::default()).is_none());

        let config = PaymentConfig {
            api_key: Some(SecretString::new("ak_test_1".to_string())),
            api_base_url: "https://api.pagar.me/1/".to_string(),
            ..Default::default()
        };
        let pagarme = PagarmeConfig::from_payment_config(&config).unwrap();
        assert_eq!(pagarme.api_base_url, "https://api.pagar.me/1");
    }

    #[test]
    fn card_request_carries_hash_and_installments() {
        let gateway = gateway();
        let request = charge(PaymentInstrument::Card {
            card_token: "hash_abc".to_string(),
            installments: 3,
        });

        let body = serde_json::to_value(gateway.build_request(&request)).unwrap();

        assert_eq!(body["payment_method"], "credit_card");
        assert_eq!(body["card_hash"], "hash_abc");
        assert_eq!(body["installments"], 3);
        assert_eq!(body["amount"], 4990);
        assert_eq!(body["metadata"]["payment_id"], request.reference.to_string());
        assert!(body.get("pix_expiration_date").is_none());
    }

    #[test]
    fn pix_request_sets_expiration() {
        let gateway = gateway();
        let body = serde_json::to_value(gateway.build_request(&charge(PaymentInstrument::Pix)))
            .unwrap();

        assert_eq!(body["payment_method"], "pix");
        assert!(body["pix_expiration_date"].is_string());
        assert!(body.get("card_hash").is_none());
    }

    #[test]
    fn boleto_request_uses_description_as_instructions() {
        let gateway = gateway();
        let body = serde_json::to_value(gateway.build_request(&charge(PaymentInstrument::Boleto)))
            .unwrap();

        assert_eq!(body["payment_method"], "boleto");
        assert_eq!(body["boleto_instructions"], "Sócio Ouro");
        assert_eq!(
            body["postback_url"],
            "https://billing.example.com/api/webhooks/payments"
        );
    }

    #[test]
    fn maps_boleto_artifacts() {
        let response = map_transaction(transaction(
            r#"{"id": 99, "status": "waiting_payment", "boleto_barcode": "2379", "boleto_url": "https://b/99"}"#,
        ))
        .unwrap();

        assert_eq!(response.provider_id, "99");
        assert_eq!(response.status.as_str(), "waiting_payment");
        assert_eq!(response.artifacts.barcode.as_deref(), Some("2379"));
        assert_eq!(response.artifacts.boleto_url.as_deref(), Some("https://b/99"));
    }

    #[test]
    fn maps_pix_artifacts() {
        let response = map_transaction(transaction(
            r#"{"id": "tx_pix", "status": "waiting_payment", "pix_qr_code": "00020126580014br.gov.bcb.pix"}"#,
        ))
        .unwrap();

        assert_eq!(
            response.artifacts.qr_code_text.as_deref(),
            Some("00020126580014br.gov.bcb.pix")
        );
    }

    #[test]
    fn refused_transaction_is_declined() {
        let err = map_transaction(transaction(
            r#"{"id": 5, "status": "refused", "refuse_reason": "acquirer", "acquirer_response_code": "1011"}"#,
        ))
        .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::Declined);
        assert_eq!(err.provider_code.as_deref(), Some("1011"));
        assert!(!err.retryable);
    }

    #[test]
    fn transaction_without_id_is_invalid_response() {
        let err = map_transaction(transaction(r#"{"id": null, "status": "paid"}"#)).unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidResponse);
    }

    #[test]
    fn http_status_mapping() {
        let body = ErrorResponse::default();
        assert_eq!(
            map_error_status(reqwest::StatusCode::UNAUTHORIZED, &body).code,
            GatewayErrorCode::AuthenticationError
        );
        assert_eq!(
            map_error_status(reqwest::StatusCode::BAD_REQUEST, &body).code,
            GatewayErrorCode::InvalidRequest
        );
        let err = map_error_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert_eq!(err.code, GatewayErrorCode::ProviderError);
        assert!(err.retryable);
    }

    #[test]
    fn provider_name_is_stable() {
        assert_eq!(gateway().provider_name(), "pagarme");
    }
}
