//! Billing handlers.
//!
//! ## Commands
//! - Starting a checkout (card, boleto, pix)
//! - Reconciling provider webhooks
//!
//! ## Queries
//! - Get subscription status

mod get_subscription_status;
mod reconcile_webhook;
mod start_checkout;

// Commands
pub use reconcile_webhook::{
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};

// Queries
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
