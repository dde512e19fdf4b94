//! Ledger repository port (write side).
//!
//! Defines the contract for persisting Subscription and Payment records.
//! The ledger is the only shared mutable state in the service.
//!
//! # Design
//!
//! - **Atomic units**: checkout and reconciliation each run as one transaction
//! - **Row-level serialization**: reconciliations for the same provider id
//!   serialize on the payment row; different provider ids never block each other
//! - **Idempotency key**: `provider_id` is unique across payments
//!
//! # Example
//!
//! ```ignore
//! let outcome = ledger
//!     .reconcile_payment("tx_1", &PaymentStatus::new("paid"), &policy, Timestamp::now())
//!     .await?;
//! ```

use crate::domain::billing::{Payment, PaymentStatus, ReconcileOutcome, Subscription, TransitionPolicy};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use async_trait::async_trait;

/// Repository port for ledger writes.
///
/// Implementations must ensure:
/// - `record_checkout` commits both rows or neither, settling against the
///   subscription row while holding it
/// - a user has at most one open (non-CANCELED) subscription
/// - `reconcile_payment` holds the payment row (then its subscription row)
///   for the whole read-plan-write cycle
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Persist the result of a checkout.
    ///
    /// A new subscription is inserted. An existing one is locked and settled
    /// with [`settle_checkout`](crate::domain::billing::settle_checkout), so
    /// status written by a concurrent reconciliation is never overwritten.
    /// Returns the subscription as committed.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the user already holds another open subscription
    /// - `DuplicateProviderReference` if a payment already carries `provider_id`
    /// - `DatabaseError` on persistence failure
    async fn record_checkout(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<Subscription, DomainError>;

    /// Apply a provider status to the payment holding `provider_id`.
    ///
    /// Looks up the payment, plans the change with
    /// [`plan_reconciliation`](crate::domain::billing::plan_reconciliation),
    /// and writes the result in one transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure; nothing is written
    async fn reconcile_payment(
        &self,
        provider_id: &str,
        incoming: &PaymentStatus,
        policy: &TransitionPolicy,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, DomainError>;

    /// All subscriptions owned by a user, newest first.
    async fn find_subscriptions_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError>;
}
