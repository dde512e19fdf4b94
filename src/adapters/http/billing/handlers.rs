//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, ReconcileWebhookCommand,
    ReconcileWebhookHandler, StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::billing::{BillingError, TransitionPolicy};
use crate::domain::foundation::{CategoryId, PlanId, SubscriptionId, UserId};
use crate::ports::{LedgerReader, LedgerRepository, PaymentGateway, PlanCatalog};

use super::dto::{
    CheckoutRequest, CheckoutResponse, ErrorResponse, HealthResponse, SubscriptionStatusResponse,
    WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub ledger_repository: Arc<dyn LedgerRepository>,
    pub ledger_reader: Arc<dyn LedgerReader>,
    pub plan_catalog: Arc<dyn PlanCatalog>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub transition_policy: TransitionPolicy,
    /// Upper bound on one provider call during checkout.
    pub provider_timeout: Duration,
    /// Include internal failure detail in 5xx bodies.
    pub verbose_errors: bool,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.ledger_repository.clone(),
            self.plan_catalog.clone(),
            self.payment_gateway.clone(),
            self.provider_timeout,
        )
    }

    pub fn reconcile_webhook_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(self.ledger_repository.clone(), self.transition_policy)
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.ledger_reader.clone())
    }

    fn api_error(&self, error: BillingError) -> BillingApiError {
        BillingApiError {
            error,
            verbose: self.verbose_errors,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// Session issuance lives outside this service; the gateway in front of it
/// forwards the member id in `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions/:id/status - Projected subscription status
pub async fn get_subscription_status(
    State(state): State<BillingAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription_id: SubscriptionId = id.parse().map_err(|_| {
        state.api_error(BillingError::validation(
            "subscription_id",
            "must be a valid UUID",
        ))
    })?;

    let handler = state.subscription_status_handler();
    let view = handler
        .handle(GetSubscriptionStatusQuery { subscription_id })
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(SubscriptionStatusResponse::from(view)))
}

/// GET /health - Liveness
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout - Start a checkout for the authenticated member
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    request: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = request.map_err(|rejection| state.api_error(rejected_body(&rejection)))?;
    let plan_id: PlanId = request
        .plan_id
        .parse()
        .map_err(|_| state.api_error(BillingError::validation("plan_id", "must be a valid UUID")))?;
    let category_id = request
        .category_id
        .as_deref()
        .map(str::parse::<CategoryId>)
        .transpose()
        .map_err(|_| {
            state.api_error(BillingError::validation(
                "category_id",
                "must be a valid UUID",
            ))
        })?;

    let handler = state.start_checkout_handler();
    let cmd = StartCheckoutCommand {
        user_id: user.user_id,
        plan_id,
        category_id,
        method: request.method,
        card_token: request.card_token,
        installments: request.installments,
    };

    let result = handler.handle(cmd).await.map_err(|e| state.api_error(e))?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(result))))
}

/// POST /api/webhooks/payments - Provider payment notifications
///
/// Always acknowledged with `200 {"received": true}`; the outcome is only
/// logged by the reconciler. A body that cannot be read (too large, broken
/// stream) is unprocessable and acknowledged the same way.
pub async fn receive_payment_webhook(
    State(state): State<BillingAppState>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(
                outcome = "unprocessable",
                reason = %rejection.body_text(),
                "Unprocessable webhook event: body could not be read"
            );
            return (StatusCode::OK, Json(WebhookAck::received()));
        }
    };

    let handler = state.reconcile_webhook_handler();
    let _ = handler
        .handle(ReconcileWebhookCommand {
            body: body.to_vec(),
        })
        .await;

    (StatusCode::OK, Json(WebhookAck::received()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Maps a rejected JSON body to a validation error.
///
/// Names the missing field when serde reports one, `body` otherwise.
fn rejected_body(rejection: &JsonRejection) -> BillingError {
    let text = rejection.body_text();
    let field = match rejection {
        JsonRejection::JsonDataError(_) => text
            .split_once("missing field `")
            .and_then(|(_, rest)| rest.split_once('`'))
            .map(|(field, _)| field.to_string()),
        _ => None,
    }
    .unwrap_or_else(|| "body".to_string());

    BillingError::validation(field, text)
}

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError {
    error: BillingError,
    verbose: bool,
}

impl BillingApiError {
    pub fn new(error: BillingError, verbose: bool) -> Self {
        Self { error, verbose }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            BillingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BillingError::PlanNotFound(_) | BillingError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::PlanInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::AlreadySubscribed(_) => StatusCode::CONFLICT,
            BillingError::PaymentProvider {
                timed_out: true, ..
            } => StatusCode::GATEWAY_TIMEOUT,
            BillingError::PaymentProvider { .. } => StatusCode::BAD_GATEWAY,
            BillingError::UnprocessableWebhookEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::UnknownPaymentReference(_) => StatusCode::NOT_FOUND,
            BillingError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_code = self.error.code().to_string();

        let body = match &self.error {
            BillingError::Validation { field, message } => ErrorResponse::with_details(
                error_code,
                message.clone(),
                serde_json::json!({ "field": field }),
            ),
            BillingError::PaymentProvider { code, .. } if !self.verbose => ErrorResponse::with_details(
                error_code,
                "Payment provider unavailable",
                serde_json::json!({ "provider_code": code }),
            ),
            BillingError::Storage(_) if !self.verbose => {
                ErrorResponse::new(error_code, "Service temporarily unavailable")
            }
            other => ErrorResponse::new(error_code, other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
