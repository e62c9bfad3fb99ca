// Library root module for exchange-router
// This file defines the public API and module structure for the exchange-router library
// It exports the routing, execution and custody functionality used by the binary and tests
//
// Numan Thabit 2025 Nov

pub mod bootstrap;
pub mod config;
pub mod control;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod router;
pub mod venues;
