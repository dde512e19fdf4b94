//! ReconcileWebhookHandler - Applies provider payment notifications to the ledger.
//!
//! Every delivery is acknowledged. Malformed bodies, unknown references, and
//! storage faults are logged and reported in the result, never as errors, so
//! the provider is not pushed into retry storms. A later redelivery of the
//! same event re-derives the same state.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, ReconcileOutcome, TransitionPolicy, WebhookNotification,
};
use crate::domain::foundation::Timestamp;
use crate::ports::LedgerRepository;

/// Command carrying the raw webhook body.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    pub body: Vec<u8>,
}

/// What happened to one delivery. All variants are acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWebhookResult {
    Reconciled {
        provider_id: String,
        outcome: ReconcileOutcome,
    },
    Unprocessable {
        reason: String,
    },
    StorageFailed {
        provider_id: String,
        message: String,
    },
}

/// Handler for provider payment notifications.
pub struct ReconcileWebhookHandler {
    ledger: Arc<dyn LedgerRepository>,
    policy: TransitionPolicy,
}

impl ReconcileWebhookHandler {
    pub fn new(ledger: Arc<dyn LedgerRepository>, policy: TransitionPolicy) -> Self {
        Self { ledger, policy }
    }

    pub async fn handle(&self, cmd: ReconcileWebhookCommand) -> ReconcileWebhookResult {
        let notification = match Self::extract(&cmd.body) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(body_len = cmd.body.len(), "Webhook not processed: {}", e);
                return ReconcileWebhookResult::Unprocessable {
                    reason: e.to_string(),
                };
            }
        };

        let WebhookNotification {
            provider_id,
            status,
        } = notification;

        match self
            .ledger
            .reconcile_payment(&provider_id, &status, &self.policy, Timestamp::now())
            .await
        {
            Ok(outcome) => {
                Self::log_outcome(&provider_id, &outcome);
                ReconcileWebhookResult::Reconciled {
                    provider_id,
                    outcome,
                }
            }
            Err(e) => {
                let err = BillingError::from(e);
                tracing::error!(
                    provider_id = %provider_id,
                    status = %status,
                    "Webhook acknowledged without reconciling: {}",
                    err
                );
                ReconcileWebhookResult::StorageFailed {
                    provider_id,
                    message: err.to_string(),
                }
            }
        }
    }

    fn extract(body: &[u8]) -> Result<WebhookNotification, BillingError> {
        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| BillingError::unprocessable(format!("body is not JSON: {}", e)))?;
        WebhookNotification::extract(&payload)
    }

    fn log_outcome(provider_id: &str, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Applied {
                previous,
                new,
                subscription_activated,
            } => {
                tracing::info!(
                    provider_id = %provider_id,
                    previous = %previous,
                    status = %new,
                    subscription_activated = ?subscription_activated,
                    outcome = outcome.label(),
                    "Payment status reconciled"
                );
            }
            ReconcileOutcome::Duplicate {
                status,
                subscription_activated: Some(subscription_id),
            } => {
                tracing::info!(
                    provider_id = %provider_id,
                    status = %status,
                    subscription_id = %subscription_id,
                    outcome = outcome.label(),
                    "Duplicate webhook delivery reactivated subscription"
                );
            }
            ReconcileOutcome::Duplicate { status, .. } => {
                tracing::debug!(
                    provider_id = %provider_id,
                    status = %status,
                    outcome = outcome.label(),
                    "Duplicate webhook delivery"
                );
            }
            ReconcileOutcome::StaleIgnored { current, incoming } => {
                tracing::warn!(
                    provider_id = %provider_id,
                    current = %current,
                    incoming = %incoming,
                    outcome = outcome.label(),
                    "Ignoring out-of-order payment status"
                );
            }
            ReconcileOutcome::UnknownReference => {
                tracing::warn!(
                    provider_id = %provider_id,
                    outcome = outcome.label(),
                    "{}",
                    BillingError::UnknownPaymentReference(provider_id.to_string())
                );
            }
        }
    }
}
