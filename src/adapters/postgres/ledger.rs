//! PostgreSQL implementation of the ledger ports.
//!
//! Reconciliation runs in one transaction: the payment row and its
//! subscription are locked with `FOR UPDATE`, the plan is computed from the
//! locked rows, and both updates commit together. A second notification for
//! the same provider id blocks on the row lock until the first commits.
//!
//! Checkout locks an existing subscription the same way and settles against
//! the locked row. New subscriptions are insert-only; the partial unique index
//! `subscriptions_one_open_per_user` rejects a second open one for a user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    plan_reconciliation, settle_checkout, Payment, PaymentArtifacts, PaymentMethod, PaymentStatus,
    ReconcileOutcome, Subscription, SubscriptionStatus, SubscriptionWrite, TransitionPolicy,
};
use crate::domain::foundation::{
    CategoryId, DomainError, ErrorCode, PaymentId, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{LedgerReader, LedgerRepository};

const PAYMENTS_PROVIDER_ID_KEY: &str = "payments_provider_id_key";
const SUBSCRIPTIONS_ONE_OPEN_PER_USER: &str = "subscriptions_one_open_per_user";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, category_id, status, billing_period_days, \
     started_at, current_period_end, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, subscription_id, user_id, method, provider, provider_id, status, \
     amount_cents, barcode, boleto_url, qr_code, qr_code_text, created_at, updated_at";

/// PostgreSQL ledger.
///
/// Uses sqlx with connection pooling. `lock_timeout_ms` bounds how long a
/// reconciliation waits on a row lock before failing.
pub struct PostgresLedger {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: 5_000,
        }
    }

    pub fn with_lock_timeout_ms(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = lock_timeout_ms;
        self
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // SET LOCAL does not take bind parameters.
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to set lock timeout", e))?;

        Ok(tx)
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan_id: Uuid,
    category_id: Option<Uuid>,
    status: String,
    billing_period_days: i32,
    started_at: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row
            .status
            .parse()
            .map_err(|e: String| DomainError::database(e))?;
        let billing_period_days = u32::try_from(row.billing_period_days).map_err(|_| {
            DomainError::database(format!(
                "Invalid billing_period_days: {}",
                row.billing_period_days
            ))
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: parse_user_id(row.user_id)?,
            plan_id: PlanId::from_uuid(row.plan_id),
            category_id: row.category_id.map(CategoryId::from_uuid),
            status,
            billing_period_days,
            started_at: row.started_at.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    subscription_id: Option<Uuid>,
    user_id: String,
    method: String,
    provider: String,
    provider_id: String,
    status: String,
    amount_cents: i64,
    barcode: Option<String>,
    boleto_url: Option<String>,
    qr_code: Option<String>,
    qr_code_text: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let method: PaymentMethod = row
            .method
            .parse()
            .map_err(|e: String| DomainError::database(e))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            user_id: parse_user_id(row.user_id)?,
            method,
            provider: row.provider,
            provider_id: row.provider_id,
            status: PaymentStatus::new(row.status),
            amount_cents: row.amount_cents,
            artifacts: PaymentArtifacts {
                barcode: row.barcode,
                boleto_url: row.boleto_url,
                qr_code: row.qr_code,
                qr_code_text: row.qr_code_text,
            },
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn violates(e: &sqlx::Error, constraint: &str) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

async fn lock_subscription(
    tx: &mut Transaction<'static, Postgres>,
    id: &SubscriptionId,
) -> Result<Option<Subscription>, DomainError> {
    let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM subscriptions WHERE id = $1 FOR UPDATE",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to lock subscription", e))?;

    row.map(Subscription::try_from).transpose()
}

async fn insert_subscription(
    tx: &mut Transaction<'static, Postgres>,
    subscription: &Subscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, user_id, plan_id, category_id, status, billing_period_days,
            started_at, current_period_end, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.user_id.as_str())
    .bind(subscription.plan_id.as_uuid())
    .bind(subscription.category_id.map(|c| *c.as_uuid()))
    .bind(subscription.status.as_str())
    .bind(subscription.billing_period_days as i32)
    .bind(subscription.started_at.map(|t| *t.as_datetime()))
    .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if violates(&e, SUBSCRIPTIONS_ONE_OPEN_PER_USER) {
            return DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("User {} already holds an open subscription", subscription.user_id),
            );
        }
        db_error("Failed to save subscription", e)
    })?;

    Ok(())
}

async fn update_subscription(
    tx: &mut Transaction<'static, Postgres>,
    subscription: &Subscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE subscriptions SET
            status = $2,
            started_at = $3,
            current_period_end = $4,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.status.as_str())
    .bind(subscription.started_at.map(|t| *t.as_datetime()))
    .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
    .bind(subscription.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to update subscription", e))?;

    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'static, Postgres>,
    payment: &Payment,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, subscription_id, user_id, method, provider, provider_id, status,
            amount_cents, barcode, boleto_url, qr_code, qr_code_text, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(payment.id.as_uuid())
    .bind(payment.subscription_id.map(|s| *s.as_uuid()))
    .bind(payment.user_id.as_str())
    .bind(payment.method.as_str())
    .bind(&payment.provider)
    .bind(&payment.provider_id)
    .bind(payment.status.as_str())
    .bind(payment.amount_cents)
    .bind(&payment.artifacts.barcode)
    .bind(&payment.artifacts.boleto_url)
    .bind(&payment.artifacts.qr_code)
    .bind(&payment.artifacts.qr_code_text)
    .bind(payment.created_at.as_datetime())
    .bind(payment.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if violates(&e, PAYMENTS_PROVIDER_ID_KEY) {
            return DomainError::new(
                ErrorCode::DuplicateProviderReference,
                format!("Provider reference already recorded: {}", payment.provider_id),
            );
        }
        db_error("Failed to save payment", e)
    })?;

    Ok(())
}

#[async_trait]
impl LedgerRepository for PostgresLedger {
    async fn record_checkout(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<Subscription, DomainError> {
        let mut tx = self.begin().await?;

        let stored = lock_subscription(&mut tx, &subscription.id).await?;
        let settled = settle_checkout(stored.as_ref(), subscription, payment)?;
        match settled.write {
            SubscriptionWrite::Insert => insert_subscription(&mut tx, &settled.subscription).await?,
            SubscriptionWrite::Update => update_subscription(&mut tx, &settled.subscription).await?,
            SubscriptionWrite::Keep => {}
        }
        insert_payment(&mut tx, payment).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit checkout", e))?;

        Ok(settled.subscription)
    }

    async fn reconcile_payment(
        &self,
        provider_id: &str,
        incoming: &PaymentStatus,
        policy: &TransitionPolicy,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, DomainError> {
        let mut tx = self.begin().await?;

        let payment_row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE provider_id = $1 FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock payment", e))?;
        let payment = payment_row.map(Payment::try_from).transpose()?;

        let subscription = match payment.as_ref().and_then(|p| p.subscription_id) {
            Some(subscription_id) => lock_subscription(&mut tx, &subscription_id).await?,
            None => None,
        };

        let plan = plan_reconciliation(
            payment.as_ref(),
            subscription.as_ref(),
            incoming,
            policy,
            now,
        )?;

        if let Some(updated) = &plan.payment {
            sqlx::query("UPDATE payments SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(updated.id.as_uuid())
                .bind(updated.status.as_str())
                .bind(updated.updated_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to update payment", e))?;
        }

        if let Some(updated) = &plan.subscription {
            update_subscription(&mut tx, updated).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit reconciliation", e))?;

        Ok(plan.outcome)
    }

    async fn find_subscriptions_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[async_trait]
impl LedgerReader for PostgresLedger {
    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn latest_payment_for_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE subscription_id = $1 \
             ORDER BY updated_at DESC, created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find latest payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_payment_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE provider_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }
}
