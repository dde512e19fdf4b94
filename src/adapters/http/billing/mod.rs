//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/checkout` - Start a checkout (card, boleto, pix)
//! - `GET /api/subscriptions/:id/status` - Projected subscription status
//! - `POST /api/webhooks/payments` - Provider payment notifications
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingApiError, BillingAppState};
pub use routes::{billing_router, billing_routes, webhook_routes};
