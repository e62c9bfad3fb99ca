// AMM venue adapter module
// This file implements the constant-product (x * y = k) adapter for AMM venues.
// Reserves are the venue's balances on the working ledger.
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AdapterError;
use crate::router::routes::{AssetId, VenueId};
use crate::venues::adapter::{HopContext, SwapAdapter};

const BPS: u128 = 10_000;

/// Constant-product pool adapter. Swaps in both directions; no LP support.
#[derive(Debug, Clone)]
pub struct ConstantProductAdapter {
    fee_bps: u32,
}

impl ConstantProductAdapter {
    pub const DEFAULT_FEE_BPS: u32 = 30;

    pub fn new(fee_bps: u32) -> Self {
        Self {
            fee_bps: fee_bps.min(BPS as u32),
        }
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    /// Output for `amount_in` against the given reserves, fee taken on input.
    pub fn quote(&self, reserve_in: u128, reserve_out: u128, amount_in: u128) -> Result<u128, AdapterError> {
        if reserve_in == 0 || reserve_out == 0 {
            return Err(AdapterError::Venue("pool has no liquidity".to_string()));
        }
        let overflow = || AdapterError::Venue("arithmetic overflow".to_string());

        let in_with_fee = amount_in
            .checked_mul(BPS - self.fee_bps as u128)
            .ok_or_else(overflow)?;
        let numerator = in_with_fee.checked_mul(reserve_out).ok_or_else(overflow)?;
        let denominator = reserve_in
            .checked_mul(BPS)
            .and_then(|r| r.checked_add(in_with_fee))
            .ok_or_else(overflow)?;
        Ok(numerator / denominator)
    }
}

impl Default for ConstantProductAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FEE_BPS)
    }
}

#[async_trait]
impl SwapAdapter for ConstantProductAdapter {
    fn name(&self) -> &str {
        "constant_product"
    }

    async fn swap(
        &self,
        ctx: &mut HopContext<'_>,
        venue: VenueId,
        from: AssetId,
        to: AssetId,
        amount_in: u128,
    ) -> Result<u128, AdapterError> {
        let reserve_in = ctx.reserve(venue, from);
        let reserve_out = ctx.reserve(venue, to);
        let amount_out = self.quote(reserve_in, reserve_out, amount_in)?;
        if amount_out == 0 {
            return Err(AdapterError::Venue("insufficient output amount".to_string()));
        }

        ctx.pull(venue, from, amount_in)?;
        ctx.pay(venue, to, amount_out)?;
        debug!(%venue, %from, %to, amount_in, amount_out, "constant product swap");
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, Ledger, UNLIMITED};

    const POOL: VenueId = VenueId(1);
    const WETH: AssetId = AssetId(1);
    const USDC: AssetId = AssetId(2);

    fn seeded() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.mint(&Account::Venue(POOL), WETH, 1_000).unwrap();
        ledger.mint(&Account::Venue(POOL), USDC, 2_000_000).unwrap();
        ledger.mint(&Account::Router, WETH, 10).unwrap();
        ledger
    }

    #[test]
    fn quote_matches_formula() {
        let amm = ConstantProductAdapter::new(0);
        // 10 * 2_000_000 / (1_000 + 10)
        assert_eq!(amm.quote(1_000, 2_000_000, 10).unwrap(), 19_801);
        let with_fee = ConstantProductAdapter::default();
        assert!(with_fee.quote(1_000, 2_000_000, 10).unwrap() < 19_801);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let amm = ConstantProductAdapter::default();
        assert!(matches!(amm.quote(0, 10, 1), Err(AdapterError::Venue(_))));
    }

    #[tokio::test]
    async fn swap_moves_reserves() {
        let mut ledger = seeded();
        ledger.approve(&Account::Router, &Account::Venue(POOL), WETH, UNLIMITED);
        let amm = ConstantProductAdapter::new(0);

        let mut ctx = HopContext::new(&mut ledger);
        let out = amm.swap(&mut ctx, POOL, WETH, USDC, 10).await.unwrap();
        assert_eq!(out, 19_801);
        assert_eq!(ledger.balance_of(&Account::Router, USDC), 19_801);
        assert_eq!(ledger.balance_of(&Account::Venue(POOL), WETH), 1_010);
    }

    #[tokio::test]
    async fn swap_without_approval_fails() {
        let mut ledger = seeded();
        let amm = ConstantProductAdapter::default();
        let mut ctx = HopContext::new(&mut ledger);
        let err = amm.swap(&mut ctx, POOL, WETH, USDC, 10).await.unwrap_err();
        assert!(matches!(err, AdapterError::Ledger(_)));
    }

    #[tokio::test]
    async fn dust_input_yields_error() {
        let mut ledger = seeded();
        ledger.approve(&Account::Router, &Account::Venue(POOL), USDC, UNLIMITED);
        ledger.mint(&Account::Router, USDC, 1).unwrap();
        let amm = ConstantProductAdapter::default();
        let mut ctx = HopContext::new(&mut ledger);
        let err = amm.swap(&mut ctx, POOL, USDC, WETH, 1).await.unwrap_err();
        assert!(matches!(err, AdapterError::Venue(_)));
    }

    #[tokio::test]
    async fn lp_operations_unsupported() {
        let mut ledger = seeded();
        let amm = ConstantProductAdapter::default();
        let mut ctx = HopContext::new(&mut ledger);
        let err = amm
            .enter(&mut ctx, POOL, AssetId(9), WETH, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported { operation: "enter", .. }));
    }
}
