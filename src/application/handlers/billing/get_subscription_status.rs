//! GetSubscriptionStatusHandler - Query handler for the subscription status view.

use std::sync::Arc;

use crate::domain::billing::{project, BillingError, SubscriptionView};
use crate::domain::foundation::SubscriptionId;
use crate::ports::LedgerReader;

/// Query to get a subscription's status.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub subscription_id: SubscriptionId,
}

pub type GetSubscriptionStatusResult = SubscriptionView;

/// Handler for subscription status reads.
pub struct GetSubscriptionStatusHandler {
    reader: Arc<dyn LedgerReader>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(reader: Arc<dyn LedgerReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, BillingError> {
        let subscription = self
            .reader
            .get_subscription(&query.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(query.subscription_id))?;

        let latest_payment = self
            .reader
            .latest_payment_for_subscription(&subscription.id)
            .await?;

        Ok(project(&subscription, latest_payment.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        Payment, PaymentArtifacts, PaymentMethod, PaymentStatus, Plan, Subscription,
        SubscriptionStatus,
    };
    use crate::domain::foundation::{DomainError, PaymentId, PlanId, Timestamp, UserId};
    use async_trait::async_trait;

    struct MockReader {
        subscription: Option<Subscription>,
        payment: Option<Payment>,
        fail: bool,
    }

    #[async_trait]
    impl LedgerReader for MockReader {
        async fn get_subscription(
            &self,
            id: &SubscriptionId,
        ) -> Result<Option<Subscription>, DomainError> {
            if self.fail {
                return Err(DomainError::database("pool timed out"));
            }
            Ok(self.subscription.clone().filter(|s| &s.id == id))
        }

        async fn latest_payment_for_subscription(
            &self,
            _id: &SubscriptionId,
        ) -> Result<Option<Payment>, DomainError> {
            Ok(self.payment.clone())
        }

        async fn find_payment_by_provider_id(
            &self,
            _provider_id: &str,
        ) -> Result<Option<Payment>, DomainError> {
            Ok(None)
        }
    }

    fn active_subscription() -> Subscription {
        let plan = Plan {
            id: PlanId::new(),
            name: "Sócio".to_string(),
            price_cents: 990,
            billing_period_days: 30,
            active: true,
        };
        let mut sub = Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            &plan,
            None,
            Timestamp::now(),
        );
        sub.activate(Timestamp::now()).unwrap();
        sub
    }

    #[tokio::test]
    async fn returns_projected_view() {
        let sub = active_subscription();
        let payment = Payment::record_charge(
            PaymentId::new(),
            Some(sub.id),
            sub.user_id.clone(),
            PaymentMethod::Pix,
            "pagarme",
            "tx_1",
            PaymentStatus::new("paid"),
            990,
            PaymentArtifacts::default(),
            Timestamp::now(),
        );
        let handler = GetSubscriptionStatusHandler::new(Arc::new(MockReader {
            subscription: Some(sub.clone()),
            payment: Some(payment.clone()),
            fail: false,
        }));

        let view = handler
            .handle(GetSubscriptionStatusQuery {
                subscription_id: sub.id,
            })
            .await
            .unwrap();

        assert_eq!(view.status, SubscriptionStatus::Active);
        assert!(view.has_access);
        assert_eq!(view.current_period_end, sub.current_period_end);
        assert_eq!(view.latest_payment.unwrap().payment_id, payment.id);
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let handler = GetSubscriptionStatusHandler::new(Arc::new(MockReader {
            subscription: None,
            payment: None,
            fail: false,
        }));
        let id = SubscriptionId::new();

        let result = handler
            .handle(GetSubscriptionStatusQuery {
                subscription_id: id,
            })
            .await;

        assert_eq!(result.unwrap_err(), BillingError::SubscriptionNotFound(id));
    }

    #[tokio::test]
    async fn reader_failure_is_storage_error() {
        let handler = GetSubscriptionStatusHandler::new(Arc::new(MockReader {
            subscription: None,
            payment: None,
            fail: true,
        }));

        let result = handler
            .handle(GetSubscriptionStatusQuery {
                subscription_id: SubscriptionId::new(),
            })
            .await;

        assert!(matches!(result, Err(BillingError::Storage(_))));
    }
}
