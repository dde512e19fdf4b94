//! PostgreSQL adapters - Database implementations for the ledger and plan ports.
//!
//! - `PostgresLedger` - Subscriptions and payments, row-locked reconciliation
//! - `PostgresPlanCatalog` - Plan lookups

mod ledger;
mod plan_catalog;

pub use ledger::PostgresLedger;
pub use plan_catalog::PostgresPlanCatalog;
