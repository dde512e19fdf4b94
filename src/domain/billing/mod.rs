//! Billing domain module.
//!
//! Subscriptions, payments, and the reconciliation of provider webhooks
//! into local state.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription aggregate
//! - `subscription_status` - SubscriptionStatus state machine
//! - `payment` - Payment entity, method, and artifacts
//! - `payment_status` - Normalized provider status
//! - `instrument` - Checkout payment instrument validation
//! - `checkout` - Settles a checkout against the committed subscription row
//! - `webhook_extraction` - Ordered extraction rules for webhook payloads
//! - `transition_policy` - Status rank and subscription transition tables
//! - `reconciliation` - Pure reconciliation planner
//! - `projection` - Subscription status projector

mod checkout;
mod errors;
mod instrument;
mod payment;
mod payment_status;
mod plan;
mod projection;
mod reconciliation;
mod subscription;
mod subscription_status;
mod transition_policy;
mod webhook_extraction;

pub use checkout::{settle_checkout, CheckoutSettlement, SubscriptionWrite};
pub use errors::BillingError;
pub use instrument::{PaymentInstrument, MAX_INSTALLMENTS, MIN_INSTALLMENTS};
pub use payment::{Payment, PaymentArtifacts, PaymentMethod};
pub use payment_status::PaymentStatus;
pub use plan::Plan;
pub use projection::{project, PaymentSummary, SubscriptionView};
pub use reconciliation::{plan_reconciliation, ReconcileOutcome, ReconciliationPlan};
pub use subscription::Subscription;
pub use subscription_status::SubscriptionStatus;
pub use transition_policy::{TransitionPolicy, STATUS_RANKS, SUBSCRIPTION_TRANSITIONS};
pub use webhook_extraction::{
    first_match, ExtractionRule, WebhookNotification, PROVIDER_ID_RULES, STATUS_RULES,
};
