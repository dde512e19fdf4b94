//! Mock payment gateway for testing and local development.
//!
//! Provides a configurable implementation of `PaymentGateway`. Supports:
//! - Pre-configured charge status
//! - Error injection
//! - Artificial latency (for timeout tests)
//! - Call tracking

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{PaymentArtifacts, PaymentMethod, PaymentStatus};
use crate::ports::{ChargeRequest, ChargeResponse, GatewayError, PaymentGateway};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
/// mock.set_next_status("paid");
/// mock.set_error(GatewayError::declined("Test decline"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Status returned for new charges. Defaults to `pending`.
    next_status: Option<String>,

    /// Provider id for the next charge only.
    next_provider_id: Option<String>,

    /// Error returned instead of a charge, once.
    next_error: Option<GatewayError>,

    /// Delay before answering.
    latency: Option<Duration>,

    sequence: u64,
    calls: Vec<ChargeRequest>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status every following charge reports.
    pub fn set_next_status(&self, status: impl Into<String>) {
        self.lock().next_status = Some(status.into());
    }

    /// Provider id the next charge receives.
    pub fn set_next_provider_id(&self, provider_id: impl Into<String>) {
        self.lock().next_provider_id = Some(provider_id.into());
    }

    /// Fail the next charge with `error`.
    pub fn set_error(&self, error: GatewayError) {
        self.lock().next_error = Some(error);
    }

    /// Delay every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Charges requested so far.
    pub fn calls(&self) -> Vec<ChargeRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned mock only means another test thread panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn artifacts_for(method: PaymentMethod, provider_id: &str) -> PaymentArtifacts {
        match method {
            PaymentMethod::Card => PaymentArtifacts::default(),
            PaymentMethod::Boleto => PaymentArtifacts {
                barcode: Some(format!("23790.00009 00000.000000 00000.000000 1 {}", provider_id)),
                boleto_url: Some(format!("https://mock.pagar.me/boleto/{}", provider_id)),
                ..Default::default()
            },
            PaymentMethod::Pix => PaymentArtifacts {
                qr_code: Some(format!("https://mock.pagar.me/pix/{}.png", provider_id)),
                qr_code_text: Some(format!("00020126580014br.gov.bcb.pix0136{}", provider_id)),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse, GatewayError> {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        let method = request.method();
        state.calls.push(request);

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        state.sequence += 1;
        let provider_id = state
            .next_provider_id
            .take()
            .unwrap_or_else(|| format!("mock_tx_{}", state.sequence));
        let status = state
            .next_status
            .as_deref()
            .map(PaymentStatus::new)
            .unwrap_or_else(PaymentStatus::pending);

        Ok(ChargeResponse {
            artifacts: Self::artifacts_for(method, &provider_id),
            provider_id,
            status,
        })
    }
}
