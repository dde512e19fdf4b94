//! In-memory storage adapters.
//!
//! Ledger and plan catalog implementations for tests and local development.

mod in_memory_ledger;
mod in_memory_plan_catalog;

pub use in_memory_ledger::InMemoryLedger;
pub use in_memory_plan_catalog::InMemoryPlanCatalog;
