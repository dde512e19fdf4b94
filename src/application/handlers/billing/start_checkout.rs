//! StartCheckoutHandler - Command handler for starting a paid subscription checkout.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    BillingError, Payment, PaymentInstrument, Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    CategoryId, ErrorCode, PaymentId, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{ChargeRequest, LedgerRepository, PaymentGateway, PlanCatalog};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub category_id: Option<CategoryId>,
    pub method: String,
    pub card_token: Option<String>,
    pub installments: Option<u32>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub subscription: Subscription,
    pub payment: Payment,
}

/// Handler for starting a checkout.
///
/// Calls the provider once and records the subscription and payment in one
/// transaction. Nothing is written when the provider call fails.
pub struct StartCheckoutHandler {
    ledger: Arc<dyn LedgerRepository>,
    plans: Arc<dyn PlanCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    provider_timeout: Duration,
}

impl StartCheckoutHandler {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        plans: Arc<dyn PlanCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            plans,
            gateway,
            provider_timeout,
        }
    }

    pub async fn handle(&self, cmd: StartCheckoutCommand) -> Result<StartCheckoutResult, BillingError> {
        // 1. Validate request before touching anything external
        let instrument =
            PaymentInstrument::from_parts(&cmd.method, cmd.card_token, cmd.installments)?;
        let method = instrument.method();

        // 2. Plan must exist and still be offered
        let plan = self
            .plans
            .find_plan(&cmd.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(cmd.plan_id))?;
        plan.ensure_purchasable()?;

        // 3. One open subscription per user; a pending one for the same plan is reused.
        //    The ledger enforces the same limit again when recording.
        let existing = self.ledger.find_subscriptions_by_user(&cmd.user_id).await?;
        let pending_elsewhere = |s: &Subscription| {
            s.status == SubscriptionStatus::Pending && s.plan_id != plan.id
        };
        if existing
            .iter()
            .any(|s| s.status.blocks_new_checkout() || pending_elsewhere(s))
        {
            return Err(BillingError::AlreadySubscribed(cmd.user_id));
        }
        let now = Timestamp::now();
        let subscription = existing
            .into_iter()
            .find(|s| s.status == SubscriptionStatus::Pending)
            .unwrap_or_else(|| {
                Subscription::create_pending(
                    SubscriptionId::new(),
                    cmd.user_id.clone(),
                    &plan,
                    cmd.category_id,
                    now,
                )
            });

        // 4. Single bounded call to the provider
        let payment_id = PaymentId::new();
        let request = ChargeRequest {
            reference: payment_id,
            user_id: cmd.user_id.clone(),
            amount_cents: plan.price_cents,
            description: plan.name.clone(),
            instrument,
        };
        let charge = match tokio::time::timeout(self.provider_timeout, self.gateway.create_charge(request)).await {
            Ok(Ok(charge)) => charge,
            Ok(Err(e)) => {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    plan_id = %plan.id,
                    method = %method,
                    code = %e.code,
                    "Payment provider rejected charge: {}",
                    e.message
                );
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    plan_id = %plan.id,
                    timeout_ms = self.provider_timeout.as_millis() as u64,
                    "Payment provider call timed out"
                );
                return Err(BillingError::provider_timeout(format!(
                    "no answer from {} within {:?}",
                    self.gateway.provider_name(),
                    self.provider_timeout
                )));
            }
        };

        // 5. Record the charge
        let now = Timestamp::now();
        let payment = Payment::record_charge(
            payment_id,
            Some(subscription.id),
            cmd.user_id.clone(),
            method,
            self.gateway.provider_name(),
            charge.provider_id,
            charge.status,
            plan.price_cents,
            charge.artifacts,
            now,
        );

        // 6. Persist both rows atomically. The ledger settles against the stored
        //    subscription; a status already in the paid set activates it.
        let subscription = match self.ledger.record_checkout(&subscription, &payment).await {
            Ok(committed) => committed,
            Err(e) => {
                tracing::error!(
                    user_id = %cmd.user_id,
                    provider_id = %payment.provider_id,
                    "Failed to record checkout after provider accepted charge: {}",
                    e
                );
                if e.code == ErrorCode::SubscriptionExists {
                    return Err(BillingError::AlreadySubscribed(cmd.user_id));
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription.id,
            payment_id = %payment.id,
            provider_id = %payment.provider_id,
            status = %payment.status,
            "Checkout recorded"
        );

        Ok(StartCheckoutResult {
            subscription,
            payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        settle_checkout, PaymentArtifacts, PaymentStatus, Plan, ReconcileOutcome, TransitionPolicy,
    };
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::ports::{ChargeResponse, GatewayError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct MockLedger {
        subscriptions: Mutex<Vec<Subscription>>,
        recorded: Mutex<Vec<(Subscription, Payment)>>,
        fail_record: Option<ErrorCode>,
    }

    impl MockLedger {
        fn with_subscription(sub: Subscription) -> Self {
            Self {
                subscriptions: Mutex::new(vec![sub]),
                ..Default::default()
            }
        }

        fn failing(code: ErrorCode) -> Self {
            Self {
                fail_record: Some(code),
                ..Default::default()
            }
        }

        fn recorded(&self) -> Vec<(Subscription, Payment)> {
            self.recorded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerRepository for MockLedger {
        async fn record_checkout(
            &self,
            subscription: &Subscription,
            payment: &Payment,
        ) -> Result<Subscription, DomainError> {
            if let Some(code) = self.fail_record {
                return Err(DomainError::new(code, "record refused"));
            }
            let stored = self
                .subscriptions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == subscription.id)
                .cloned();
            let settled = settle_checkout(stored.as_ref(), subscription, payment)?;
            self.recorded
                .lock()
                .unwrap()
                .push((settled.subscription.clone(), payment.clone()));
            Ok(settled.subscription)
        }

        async fn reconcile_payment(
            &self,
            _provider_id: &str,
            _incoming: &PaymentStatus,
            _policy: &TransitionPolicy,
            _now: Timestamp,
        ) -> Result<ReconcileOutcome, DomainError> {
            Ok(ReconcileOutcome::UnknownReference)
        }

        async fn find_subscriptions_by_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<Subscription>, DomainError> {
            Ok(self
                .subscriptions
                .lock()
                .unwrap()
                .iter()
                .filter(|s| &s.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    struct MockPlans {
        plan: Option<Plan>,
    }

    #[async_trait]
    impl PlanCatalog for MockPlans {
        async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
            Ok(self.plan.clone().filter(|p| &p.id == id))
        }
    }

    enum GatewayBehavior {
        Respond(&'static str),
        Fail,
        Hang,
    }

    struct MockGateway {
        behavior: GatewayBehavior,
        calls: Mutex<Vec<ChargeRequest>>,
    }

    impl MockGateway {
        fn new(behavior: GatewayBehavior) -> Self {
            Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse, GatewayError> {
            let boleto = request.method() == crate::domain::billing::PaymentMethod::Boleto;
            self.calls.lock().unwrap().push(request);
            match self.behavior {
                GatewayBehavior::Respond(status) => Ok(ChargeResponse {
                    provider_id: "tx_1".to_string(),
                    status: PaymentStatus::new(status),
                    artifacts: if boleto {
                        PaymentArtifacts {
                            barcode: Some("23793.38128".to_string()),
                            boleto_url: Some("https://boleto.example/1".to_string()),
                            ..Default::default()
                        }
                    } else {
                        PaymentArtifacts::default()
                    },
                }),
                GatewayBehavior::Fail => Err(GatewayError::declined("refused by issuer")),
                GatewayBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(GatewayError::network("unreachable"))
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_plan(active: bool) -> Plan {
        Plan {
            id: PlanId::new(),
            name: "Sócio Torcedor".to_string(),
            price_cents: 4990,
            billing_period_days: 30,
            active,
        }
    }

    fn test_user() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn command(plan: &Plan, method: &str) -> StartCheckoutCommand {
        StartCheckoutCommand {
            user_id: test_user(),
            plan_id: plan.id,
            category_id: None,
            method: method.to_string(),
            card_token: None,
            installments: None,
        }
    }

    fn handler(
        ledger: Arc<MockLedger>,
        plan: Option<Plan>,
        gateway: Arc<MockGateway>,
    ) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            ledger,
            Arc::new(MockPlans { plan }),
            gateway,
            Duration::from_millis(50),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn boleto_checkout_creates_pending_rows_with_artifacts() {
        let plan = test_plan(true);
        let ledger = Arc::new(MockLedger::default());
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("waiting_payment")));
        let handler = handler(ledger.clone(), Some(plan.clone()), gateway.clone());

        let result = handler.handle(command(&plan, "boleto")).await.unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Pending);
        assert_eq!(result.payment.provider_id, "tx_1");
        assert_eq!(result.payment.provider, "mock");
        assert_eq!(result.payment.amount_cents, 4990);
        assert_eq!(result.payment.subscription_id, Some(result.subscription.id));
        assert!(result.payment.artifacts.barcode.is_some());
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(ledger.recorded().len(), 1);
    }

    #[tokio::test]
    async fn card_paid_immediately_activates_subscription() {
        let plan = test_plan(true);
        let ledger = Arc::new(MockLedger::default());
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(ledger.clone(), Some(plan.clone()), gateway);

        let mut cmd = command(&plan, "card");
        cmd.card_token = Some("card_tok".to_string());
        let result = handler.handle(cmd).await.unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert!(result.subscription.current_period_end.is_some());
        assert_eq!(ledger.recorded()[0].0.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn pending_subscription_for_same_plan_is_reused() {
        let plan = test_plan(true);
        let existing = Subscription::create_pending(
            SubscriptionId::new(),
            test_user(),
            &plan,
            None,
            Timestamp::now(),
        );
        let ledger = Arc::new(MockLedger::with_subscription(existing.clone()));
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("pending")));
        let handler = handler(ledger, Some(plan.clone()), gateway);

        let result = handler.handle(command(&plan, "pix")).await.unwrap();

        assert_eq!(result.subscription.id, existing.id);
        assert_eq!(result.payment.subscription_id, Some(existing.id));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_request_fails_before_provider_call() {
        let plan = test_plan(true);
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(Arc::new(MockLedger::default()), Some(plan.clone()), gateway.clone());

        let result = handler.handle(command(&plan, "card")).await;

        assert!(matches!(
            result,
            Err(BillingError::Validation { ref field, .. }) if field == "card_token"
        ));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let plan = test_plan(true);
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(Arc::new(MockLedger::default()), None, gateway);

        let result = handler.handle(command(&plan, "pix")).await;

        assert_eq!(result.unwrap_err(), BillingError::PlanNotFound(plan.id));
    }

    #[tokio::test]
    async fn inactive_plan_is_rejected() {
        let plan = test_plan(false);
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(Arc::new(MockLedger::default()), Some(plan.clone()), gateway.clone());

        let result = handler.handle(command(&plan, "pix")).await;

        assert_eq!(result.unwrap_err(), BillingError::PlanInactive(plan.id));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn active_subscription_blocks_checkout() {
        let plan = test_plan(true);
        let mut active = Subscription::create_pending(
            SubscriptionId::new(),
            test_user(),
            &plan,
            None,
            Timestamp::now(),
        );
        active.activate(Timestamp::now()).unwrap();
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(
            Arc::new(MockLedger::with_subscription(active)),
            Some(plan.clone()),
            gateway.clone(),
        );

        let result = handler.handle(command(&plan, "pix")).await;

        assert_eq!(result.unwrap_err(), BillingError::AlreadySubscribed(test_user()));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_failure_writes_nothing() {
        let plan = test_plan(true);
        let ledger = Arc::new(MockLedger::default());
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Fail));
        let handler = handler(ledger.clone(), Some(plan.clone()), gateway);

        let result = handler.handle(command(&plan, "pix")).await;

        assert!(matches!(
            result,
            Err(BillingError::PaymentProvider { timed_out: false, .. })
        ));
        assert!(ledger.recorded().is_empty());
    }

    #[tokio::test]
    async fn provider_timeout_writes_nothing() {
        let plan = test_plan(true);
        let ledger = Arc::new(MockLedger::default());
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Hang));
        let handler = handler(ledger.clone(), Some(plan.clone()), gateway);

        let result = handler.handle(command(&plan, "pix")).await;

        assert!(matches!(
            result,
            Err(BillingError::PaymentProvider { timed_out: true, .. })
        ));
        assert!(ledger.recorded().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_to_caller() {
        let plan = test_plan(true);
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("pending")));
        let handler = handler(Arc::new(MockLedger::failing(ErrorCode::DatabaseError)), Some(plan.clone()), gateway);

        let result = handler.handle(command(&plan, "pix")).await;

        let err = result.unwrap_err();
        assert!(matches!(err, BillingError::Storage(_)));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn open_subscription_conflict_at_record_is_already_subscribed() {
        let plan = test_plan(true);
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("pending")));
        let handler = handler(
            Arc::new(MockLedger::failing(ErrorCode::SubscriptionExists)),
            Some(plan.clone()),
            gateway,
        );

        let result = handler.handle(command(&plan, "pix")).await;

        assert_eq!(result.unwrap_err(), BillingError::AlreadySubscribed(test_user()));
    }

    #[tokio::test]
    async fn pending_subscription_for_other_plan_blocks_checkout() {
        let plan = test_plan(true);
        let other = test_plan(true);
        let existing = Subscription::create_pending(
            SubscriptionId::new(),
            test_user(),
            &other,
            None,
            Timestamp::now(),
        );
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("pending")));
        let handler = handler(
            Arc::new(MockLedger::with_subscription(existing)),
            Some(plan.clone()),
            gateway.clone(),
        );

        let result = handler.handle(command(&plan, "pix")).await;

        assert_eq!(result.unwrap_err(), BillingError::AlreadySubscribed(test_user()));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn reused_subscription_is_returned_as_committed() {
        let plan = test_plan(true);
        let snapshot = Subscription::create_pending(
            SubscriptionId::new(),
            test_user(),
            &plan,
            None,
            Timestamp::now(),
        );
        let ledger = Arc::new(MockLedger::with_subscription(snapshot.clone()));
        let gateway = Arc::new(MockGateway::new(GatewayBehavior::Respond("paid")));
        let handler = handler(ledger.clone(), Some(plan.clone()), gateway);

        let mut cmd = command(&plan, "card");
        cmd.card_token = Some("card_tok".to_string());
        let result = handler.handle(cmd).await.unwrap();

        assert_eq!(result.subscription.id, snapshot.id);
        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert_eq!(ledger.recorded()[0].0, result.subscription);
    }
}
