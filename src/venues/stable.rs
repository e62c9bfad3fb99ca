// Stable pool venue adapter module
// This file implements a pegged-asset pool: swaps at 1:1 minus a fee, and
// deposits/withdrawals that mint and burn the pool's LP receipt asset
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AdapterError;
use crate::ledger::Account;
use crate::router::routes::{AssetId, VenueId};
use crate::venues::adapter::{HopContext, SwapAdapter};

const BPS: u128 = 10_000;

#[derive(Debug, Clone)]
pub struct StablePoolAdapter {
    fee_bps: u32,
}

impl StablePoolAdapter {
    pub const DEFAULT_FEE_BPS: u32 = 4;

    pub fn new(fee_bps: u32) -> Self {
        Self {
            fee_bps: fee_bps.min(BPS as u32),
        }
    }

    fn after_fee(&self, amount: u128) -> Result<u128, AdapterError> {
        // rounds the fee up so the pool never pays out more than it takes in
        let fee = amount
            .checked_mul(self.fee_bps as u128)
            .map(|f| f.div_ceil(BPS))
            .ok_or_else(|| AdapterError::Venue("arithmetic overflow".to_string()))?;
        let net = amount - fee.min(amount);
        if net == 0 {
            return Err(AdapterError::Venue("insufficient output amount".to_string()));
        }
        Ok(net)
    }
}

impl Default for StablePoolAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FEE_BPS)
    }
}

#[async_trait]
impl SwapAdapter for StablePoolAdapter {
    fn name(&self) -> &str {
        "stable_pool"
    }

    async fn swap(
        &self,
        ctx: &mut HopContext<'_>,
        venue: VenueId,
        from: AssetId,
        to: AssetId,
        amount_in: u128,
    ) -> Result<u128, AdapterError> {
        let amount_out = self.after_fee(amount_in)?;
        let reserve_out = ctx.reserve(venue, to);
        if reserve_out < amount_out {
            return Err(AdapterError::Venue(format!(
                "insufficient liquidity for {to}: {reserve_out} < {amount_out}"
            )));
        }

        ctx.pull(venue, from, amount_in)?;
        ctx.pay(venue, to, amount_out)?;
        debug!(%venue, %from, %to, amount_in, amount_out, "stable swap");
        Ok(amount_out)
    }

    async fn enter(
        &self,
        ctx: &mut HopContext<'_>,
        venue: VenueId,
        lp: AssetId,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, AdapterError> {
        let minted = self.after_fee(amount)?;
        ctx.pull(venue, asset, amount)?;
        ctx.ledger().mint(&Account::Router, lp, minted)?;
        debug!(%venue, %lp, %asset, amount, minted, "stable pool deposit");
        Ok(minted)
    }

    async fn exit(
        &self,
        ctx: &mut HopContext<'_>,
        venue: VenueId,
        lp: AssetId,
        asset: AssetId,
        lp_amount: u128,
    ) -> Result<u128, AdapterError> {
        let amount_out = self.after_fee(lp_amount)?;
        let reserve = ctx.reserve(venue, asset);
        if reserve < amount_out {
            return Err(AdapterError::Venue(format!(
                "insufficient liquidity for {asset}: {reserve} < {amount_out}"
            )));
        }

        ctx.ledger().burn(&Account::Router, lp, lp_amount)?;
        ctx.pay(venue, asset, amount_out)?;
        debug!(%venue, %lp, %asset, lp_amount, amount_out, "stable pool withdrawal");
        Ok(amount_out)
    }
}
