// Venue adapter module
// This file defines the adapter contract every protocol integration satisfies
// and the context adapters use to move funds during a single exchange
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::AdapterError;
use crate::ledger::{Account, Ledger, LedgerError};
use crate::router::routes::{AssetId, VenueId};
use crate::venues::amm::ConstantProductAdapter;
use crate::venues::stable::StablePoolAdapter;

/// Access to the working ledger of the exchange in flight. Everything an
/// adapter does through it is discarded if the exchange fails.
pub struct HopContext<'a> {
    ledger: &'a mut Ledger,
}

impl<'a> HopContext<'a> {
    pub fn new(ledger: &'a mut Ledger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&mut self) -> &mut Ledger {
        self.ledger
    }

    /// Venue's holdings of `asset`.
    pub fn reserve(&self, venue: VenueId, asset: AssetId) -> u128 {
        self.ledger.balance_of(&Account::Venue(venue), asset)
    }

    /// Pull router funds into the venue. Requires the router to have approved the venue.
    pub fn pull(&mut self, venue: VenueId, asset: AssetId, amount: u128) -> Result<(), LedgerError> {
        let spender = Account::Venue(venue);
        self.ledger
            .transfer_from(&spender, &Account::Router, &spender, asset, amount)
    }

    /// Pay venue funds out to the router.
    pub fn pay(&mut self, venue: VenueId, asset: AssetId, amount: u128) -> Result<(), LedgerError> {
        self.ledger
            .transfer(&Account::Venue(venue), &Account::Router, asset, amount)
    }
}

/// Protocol adapter. Every call must either produce a non-zero amount or fail.
#[async_trait]
pub trait SwapAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Swap `amount_in` of `from` held by the router into `to` through `venue`.
    async fn swap(
        &self,
        ctx: &mut HopContext<'_>,
        venue: VenueId,
        from: AssetId,
        to: AssetId,
        amount_in: u128,
    ) -> Result<u128, AdapterError>;

    /// Deposit `amount` of `asset` into the venue and receive `lp` receipts.
    async fn enter(
        &self,
        _ctx: &mut HopContext<'_>,
        _venue: VenueId,
        _lp: AssetId,
        _asset: AssetId,
        _amount: u128,
    ) -> Result<u128, AdapterError> {
        Err(AdapterError::Unsupported {
            adapter: self.name().to_string(),
            operation: "enter",
        })
    }

    /// Redeem `lp_amount` of `lp` receipts for `asset`.
    async fn exit(
        &self,
        _ctx: &mut HopContext<'_>,
        _venue: VenueId,
        _lp: AssetId,
        _asset: AssetId,
        _lp_amount: u128,
    ) -> Result<u128, AdapterError> {
        Err(AdapterError::Unsupported {
            adapter: self.name().to_string(),
            operation: "exit",
        })
    }
}

/// Declarative description of a built-in adapter, used by the bootstrap file
/// and the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterSpec {
    ConstantProduct {
        #[serde(default)]
        fee_bps: Option<u32>,
    },
    StablePool {
        #[serde(default)]
        fee_bps: Option<u32>,
    },
}

impl AdapterSpec {
    pub fn build(&self) -> Arc<dyn SwapAdapter> {
        match self {
            AdapterSpec::ConstantProduct { fee_bps } => Arc::new(ConstantProductAdapter::new(
                fee_bps.unwrap_or(ConstantProductAdapter::DEFAULT_FEE_BPS),
            )),
            AdapterSpec::StablePool { fee_bps } => Arc::new(StablePoolAdapter::new(
                fee_bps.unwrap_or(StablePoolAdapter::DEFAULT_FEE_BPS),
            )),
        }
    }
}
