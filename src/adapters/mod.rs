//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes, DTOs, and error mapping
//! - `pagarme` - Payment gateway (Pagar.me and a mock)
//! - `postgres` - Ledger and plan catalog on PostgreSQL
//! - `storage` - In-memory ledger and plan catalog

pub mod http;
pub mod pagarme;
pub mod postgres;
pub mod storage;
