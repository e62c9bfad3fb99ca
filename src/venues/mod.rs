// Venues module - protocol adapters
// This file exposes the adapter contract and the built-in pool adapters
//
// Numan Thabit 2025 Nov

pub mod adapter;
pub mod amm;
pub mod stable;

pub use adapter::{AdapterSpec, HopContext, SwapAdapter};
pub use amm::ConstantProductAdapter;
pub use stable::StablePoolAdapter;
