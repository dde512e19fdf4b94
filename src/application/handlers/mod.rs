//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
    StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult,
};
