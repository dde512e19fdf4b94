//! Membership Billing - checkout, payment webhook reconciliation, and
//! subscription status for a membership platform.
//!
//! Provider webhooks are the source of truth for payment state. Every
//! notification is acknowledged; reconciliation is idempotent per provider
//! payment id and serialized per payment row.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
