// Router module - routing graph and exchange orchestration
// This file wires the route types, validation, tables, resolver, planner
// and execution engine behind the high-level Router
//
// Numan Thabit 2025 Nov

pub mod api;
pub mod directory;
pub mod execution;
pub mod resolver;
pub mod routes;
pub mod tables;
pub mod validation;

#[allow(clippy::module_inception)]
pub mod router;

pub use directory::{Directory, NativeAssets};
pub use execution::{ExecutionEngine, ExecutionStats};
pub use router::{ExchangeReceipt, ExchangeRequest, Router, RouterSettings};
pub use routes::{AssetId, Edge, ExecutionPlan, LpEntry, PoolRef, ProtocolId, Route, Step, VenueId};
pub use tables::RoutingTables;
