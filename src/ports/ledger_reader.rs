//! Ledger reader port (read side).
//!
//! Read-only access used by the status projector. Reads go straight to the
//! store so they always reflect the last committed reconciliation.

use crate::domain::billing::{Payment, Subscription};
use crate::domain::foundation::{DomainError, SubscriptionId};
use async_trait::async_trait;

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Get a subscription by ID.
    ///
    /// Returns `None` if not found.
    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Most recently updated payment for a subscription.
    async fn latest_payment_for_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Payment>, DomainError>;

    /// Point lookup by provider transaction id.
    async fn find_payment_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Payment>, DomainError>;
}
