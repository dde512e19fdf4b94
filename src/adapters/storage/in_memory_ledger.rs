//! In-Memory Ledger Adapter
//!
//! Stores subscriptions and payments in memory.
//! Useful for testing and development.
//!
//! Writes take one lock over the whole ledger, so every checkout and
//! reconciliation is atomic. Critical sections never await.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{
    plan_reconciliation, settle_checkout, Payment, PaymentStatus, ReconcileOutcome, Subscription,
    SubscriptionWrite, TransitionPolicy,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{LedgerReader, LedgerRepository};

#[derive(Debug, Default)]
struct LedgerState {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    payments: HashMap<PaymentId, Payment>,
    /// Unique index on `provider_id`.
    by_provider_id: HashMap<String, PaymentId>,
}

/// In-memory ledger implementing both read and write ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// All payments, in no particular order
    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.values().cloned().collect()
    }

    /// All subscriptions, in no particular order
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.state
            .read()
            .await
            .subscriptions
            .values()
            .cloned()
            .collect()
    }

    /// Get the number of stored payments
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Get the number of stored subscriptions
    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }

    /// Store a subscription row as given, replacing one with the same id.
    ///
    /// Stands in for out-of-band writes (manual cancellation, operator fixes)
    /// in tests.
    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription);
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn record_checkout(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<Subscription, DomainError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.by_provider_id.contains_key(&payment.provider_id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateProviderReference,
                format!("Payment with provider id {} already exists", payment.provider_id),
            ));
        }

        let stored = state.subscriptions.get(&subscription.id);
        if stored.is_none() {
            let other_open = state
                .subscriptions
                .values()
                .any(|s| s.user_id == subscription.user_id && s.status.is_open());
            if other_open {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionExists,
                    format!("User {} already holds an open subscription", subscription.user_id),
                ));
            }
        }

        let settled = settle_checkout(stored, subscription, payment)?;
        if settled.write != SubscriptionWrite::Keep {
            state
                .subscriptions
                .insert(settled.subscription.id, settled.subscription.clone());
        }
        state
            .by_provider_id
            .insert(payment.provider_id.clone(), payment.id);
        state.payments.insert(payment.id, payment.clone());
        Ok(settled.subscription)
    }

    async fn reconcile_payment(
        &self,
        provider_id: &str,
        incoming: &PaymentStatus,
        policy: &TransitionPolicy,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, DomainError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let payment = state
            .by_provider_id
            .get(provider_id)
            .and_then(|id| state.payments.get(id));
        let subscription = payment
            .and_then(|p| p.subscription_id)
            .and_then(|id| state.subscriptions.get(&id));

        let plan = plan_reconciliation(payment, subscription, incoming, policy, now)?;

        if let Some(payment) = plan.payment {
            state.payments.insert(payment.id, payment);
        }
        if let Some(subscription) = plan.subscription {
            state.subscriptions.insert(subscription.id, subscription);
        }
        Ok(plan.outcome)
    }

    async fn find_subscriptions_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        let mut found: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.state.read().await.subscriptions.get(id).cloned())
    }

    async fn latest_payment_for_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Payment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.subscription_id.as_ref() == Some(id))
            .max_by(|a, b| {
                a.updated_at
                    .cmp(&b.updated_at)
                    .then(a.created_at.cmp(&b.created_at))
            })
            .cloned())
    }

    async fn find_payment_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .by_provider_id
            .get(provider_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PaymentArtifacts, PaymentMethod, Plan, SubscriptionStatus};
    use crate::domain::foundation::PlanId;

    fn checkout_rows(provider_id: &str) -> (Subscription, Payment) {
        checkout_rows_for("user-1", provider_id)
    }

    fn checkout_rows_for(user: &str, provider_id: &str) -> (Subscription, Payment) {
        let now = Timestamp::now();
        let plan = Plan {
            id: PlanId::new(),
            name: "Sócio".to_string(),
            price_cents: 2500,
            billing_period_days: 30,
            active: true,
        };
        let user = UserId::new(user).unwrap();
        let sub = Subscription::create_pending(SubscriptionId::new(), user.clone(), &plan, None, now);
        let payment = Payment::record_charge(
            PaymentId::new(),
            Some(sub.id),
            user,
            PaymentMethod::Pix,
            "mock",
            provider_id,
            PaymentStatus::pending(),
            2500,
            PaymentArtifacts::default(),
            now,
        );
        (sub, payment)
    }

    #[tokio::test]
    async fn record_checkout_stores_both_rows() {
        let ledger = InMemoryLedger::new();
        let (sub, payment) = checkout_rows("tx_1");

        ledger.record_checkout(&sub, &payment).await.unwrap();

        assert_eq!(ledger.subscription_count().await, 1);
        assert_eq!(
            ledger.find_payment_by_provider_id("tx_1").await.unwrap(),
            Some(payment)
        );
    }

    #[tokio::test]
    async fn duplicate_provider_id_is_rejected() {
        let ledger = InMemoryLedger::new();
        let (sub, payment) = checkout_rows("tx_1");
        ledger.record_checkout(&sub, &payment).await.unwrap();

        let (other_sub, other_payment) = checkout_rows_for("user-2", "tx_1");
        let err = ledger
            .record_checkout(&other_sub, &other_payment)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DuplicateProviderReference);
        assert_eq!(ledger.payment_count().await, 1);
        assert_eq!(ledger.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn reconcile_paid_activates_subscription() {
        let ledger = InMemoryLedger::new();
        let (sub, payment) = checkout_rows("tx_1");
        ledger.record_checkout(&sub, &payment).await.unwrap();

        let outcome = ledger
            .reconcile_payment(
                "tx_1",
                &PaymentStatus::new("paid"),
                &TransitionPolicy::default(),
                Timestamp::now(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
        let stored = ledger.get_subscription(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        let latest = ledger
            .latest_payment_for_subscription(&sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.status.as_str(), "paid");
    }

    #[tokio::test]
    async fn reconcile_unknown_reference_changes_nothing() {
        let ledger = InMemoryLedger::new();

        let outcome = ledger
            .reconcile_payment(
                "tx_missing",
                &PaymentStatus::new("paid"),
                &TransitionPolicy::default(),
                Timestamp::now(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::UnknownReference);
        assert_eq!(ledger.payment_count().await, 0);
    }

    #[tokio::test]
    async fn subscriptions_by_user_are_newest_first() {
        let ledger = InMemoryLedger::new();
        let (mut older, p1) = checkout_rows("tx_1");
        older.created_at = Timestamp::now().add_days(-10);
        older.status = SubscriptionStatus::Canceled;
        let (newer, p2) = checkout_rows("tx_2");
        ledger.record_checkout(&older, &p1).await.unwrap();
        ledger.record_checkout(&newer, &p2).await.unwrap();

        let found = ledger
            .find_subscriptions_by_user(&UserId::new("user-1").unwrap())
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, newer.id);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout settlement
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn second_open_subscription_for_user_is_rejected() {
        let ledger = InMemoryLedger::new();
        let (sub, payment) = checkout_rows("tx_1");
        ledger.record_checkout(&sub, &payment).await.unwrap();

        let (other_sub, other_payment) = checkout_rows("tx_2");
        let err = ledger
            .record_checkout(&other_sub, &other_payment)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionExists);
        assert_eq!(ledger.subscription_count().await, 1);
        assert_eq!(ledger.payment_count().await, 1);
    }

    #[tokio::test]
    async fn checkout_on_reconciled_subscription_keeps_stored_status() {
        let ledger = InMemoryLedger::new();
        let (sub, first) = checkout_rows("tx_1");
        ledger.record_checkout(&sub, &first).await.unwrap();
        ledger
            .reconcile_payment(
                "tx_1",
                &PaymentStatus::new("paid"),
                &TransitionPolicy::default(),
                Timestamp::now(),
            )
            .await
            .unwrap();

        let mut retry = first.clone();
        retry.id = PaymentId::new();
        retry.provider_id = "tx_2".to_string();
        let committed = ledger.record_checkout(&sub, &retry).await.unwrap();

        let stored = ledger.get_subscription(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.current_period_end.is_some());
        assert_eq!(committed, stored);
        assert_eq!(ledger.payment_count().await, 2);
    }
}
