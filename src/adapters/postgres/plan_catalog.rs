//! PostgreSQL implementation of PlanCatalog.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use crate::ports::PlanCatalog;

/// Reads plans from the `plans` table.
pub struct PostgresPlanCatalog {
    pool: PgPool,
}

impl PostgresPlanCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    price_cents: i64,
    billing_period_days: i32,
    active: bool,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let billing_period_days = u32::try_from(row.billing_period_days)
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| {
                DomainError::database(format!(
                    "Invalid billing_period_days for plan {}: {}",
                    row.id, row.billing_period_days
                ))
            })?;

        Ok(Plan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            price_cents: row.price_cents,
            billing_period_days,
            active: row.active,
        })
    }
}

#[async_trait]
impl PlanCatalog for PostgresPlanCatalog {
    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, price_cents, billing_period_days, active
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find plan: {}", e)))?;

        row.map(Plan::try_from).transpose()
    }
}
