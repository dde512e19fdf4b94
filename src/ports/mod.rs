//! Ports - Interfaces between the billing core and the outside world.
//!
//! - `LedgerRepository` / `LedgerReader` - write and read sides of the ledger
//! - `PaymentGateway` - outbound charge creation at the payment provider
//! - `PlanCatalog` - plan lookups owned by another service

mod ledger_reader;
mod ledger_repository;
mod payment_gateway;
mod plan_catalog;

pub use ledger_reader::LedgerReader;
pub use ledger_repository::LedgerRepository;
pub use payment_gateway::{
    ChargeRequest, ChargeResponse, GatewayError, GatewayErrorCode, PaymentGateway,
};
pub use plan_catalog::PlanCatalog;
