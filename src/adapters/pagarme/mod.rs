//! Pagar.me payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for card, boleto, and pix charges,
//! plus a configurable mock for tests and local development.
//!
//! # Configuration
//!
//! - `MEMBERSHIP_BILLING__PAYMENT__API_KEY`: Pagar.me secret API key
//! - `MEMBERSHIP_BILLING__PAYMENT__POSTBACK_URL`: public URL of the webhook endpoint

mod mock_gateway;
mod pagarme_gateway;
mod wire_types;

pub use mock_gateway::MockPaymentGateway;
pub use pagarme_gateway::{PagarmeConfig, PagarmeGateway};
