//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_subscription_status, health, receive_payment_webhook, start_checkout, BillingAppState,
};

/// Member-facing routes, mounted under `/api`.
///
/// # Routes
/// - `POST /checkout` - Start a checkout (requires `X-User-Id`)
/// - `GET /subscriptions/:id/status` - Projected subscription status
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/subscriptions/:id/status", get(get_subscription_status))
}

/// Provider webhook routes, mounted under `/api/webhooks`.
///
/// No user authentication; every delivery is acknowledged.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/payments", post(receive_payment_webhook))
}

/// Create the complete billing router.
///
/// # Example
///
/// ```ignore
/// let app = billing_router().with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", billing_routes())
        .nest("/api/webhooks", webhook_routes())
}
