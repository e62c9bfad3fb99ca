// Asset custody ledger
// Balances and spending allowances for wallets, venues and the router itself.
// Exchanges run against a cloned working copy that is committed only on success.
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::router::routes::{AssetId, VenueId};

/// Holder of balances on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    Router,
    Venue(VenueId),
    Wallet(String),
}

impl Account {
    pub fn wallet(name: impl Into<String>) -> Self {
        Account::Wallet(name.into())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Router => write!(f, "router"),
            Account::Venue(v) => write!(f, "{v}"),
            Account::Wallet(name) => write!(f, "wallet:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance of {asset} in {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: String,
        asset: AssetId,
        needed: u128,
        available: u128,
    },
    #[error("insufficient allowance of {asset} from {owner} to {spender}: needed {needed}, allowed {allowed}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        asset: AssetId,
        needed: u128,
        allowed: u128,
    },
    #[error("balance overflow for {asset}")]
    Overflow { asset: AssetId },
}

/// Allowance value that is never decremented.
pub const UNLIMITED: u128 = u128::MAX;

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<(Account, AssetId), u128>,
    allowances: HashMap<(Account, Account, AssetId), u128>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Account, asset: AssetId) -> u128 {
        self.balances
            .get(&(account.clone(), asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn mint(&mut self, account: &Account, asset: AssetId, amount: u128) -> Result<(), LedgerError> {
        let slot = self.balances.entry((account.clone(), asset)).or_insert(0);
        *slot = slot
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { asset })?;
        Ok(())
    }

    pub fn burn(&mut self, account: &Account, asset: AssetId, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(account, asset);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                asset,
                needed: amount,
                available,
            });
        }
        self.balances
            .insert((account.clone(), asset), available - amount);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Account,
        to: &Account,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if from == to {
            // self-transfer only checks the balance
            let available = self.balance_of(from, asset);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    account: from.to_string(),
                    asset,
                    needed: amount,
                    available,
                });
            }
            return Ok(());
        }
        self.burn(from, asset, amount)?;
        self.mint(to, asset, amount)
    }

    pub fn approve(&mut self, owner: &Account, spender: &Account, asset: AssetId, amount: u128) {
        let key = (owner.clone(), spender.clone(), asset);
        if amount == 0 {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, amount);
        }
    }

    pub fn allowance(&self, owner: &Account, spender: &Account, asset: AssetId) -> u128 {
        self.allowances
            .get(&(owner.clone(), spender.clone(), asset))
            .copied()
            .unwrap_or(0)
    }

    /// Move `amount` out of `owner` on behalf of `spender`.
    pub fn transfer_from(
        &mut self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(owner, spender, asset);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: owner.to_string(),
                spender: spender.to_string(),
                asset,
                needed: amount,
                allowed,
            });
        }
        self.transfer(owner, to, asset, amount)?;
        if allowed != UNLIMITED {
            self.approve(owner, spender, asset, allowed - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: AssetId = AssetId(10);

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = Ledger::new();
        let alice = Account::wallet("alice");
        ledger.mint(&alice, USDC, 100).unwrap();
        ledger.transfer(&alice, &Account::Router, USDC, 40).unwrap();
        assert_eq!(ledger.balance_of(&alice, USDC), 60);
        assert_eq!(ledger.balance_of(&Account::Router, USDC), 40);
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let mut ledger = Ledger::new();
        let alice = Account::wallet("alice");
        ledger.mint(&alice, USDC, 5).unwrap();
        let err = ledger.transfer(&alice, &Account::Router, USDC, 6).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { needed: 6, available: 5, .. }));
        assert_eq!(ledger.balance_of(&alice, USDC), 5);
    }

    #[test]
    fn transfer_from_requires_allowance() {
        let mut ledger = Ledger::new();
        let venue = Account::Venue(VenueId(1));
        ledger.mint(&Account::Router, USDC, 50).unwrap();
        let err = ledger
            .transfer_from(&venue, &Account::Router, &venue, USDC, 10)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));

        ledger.approve(&Account::Router, &venue, USDC, 15);
        ledger
            .transfer_from(&venue, &Account::Router, &venue, USDC, 10)
            .unwrap();
        assert_eq!(ledger.allowance(&Account::Router, &venue, USDC), 5);
        assert_eq!(ledger.balance_of(&venue, USDC), 10);
    }

    #[test]
    fn unlimited_allowance_is_not_consumed() {
        let mut ledger = Ledger::new();
        let venue = Account::Venue(VenueId(1));
        ledger.mint(&Account::Router, USDC, 50).unwrap();
        ledger.approve(&Account::Router, &venue, USDC, UNLIMITED);
        ledger
            .transfer_from(&venue, &Account::Router, &venue, USDC, 50)
            .unwrap();
        assert_eq!(ledger.allowance(&Account::Router, &venue, USDC), UNLIMITED);
    }

    #[test]
    fn approve_zero_clears() {
        let mut ledger = Ledger::new();
        let venue = Account::Venue(VenueId(3));
        ledger.approve(&Account::Router, &venue, USDC, UNLIMITED);
        ledger.approve(&Account::Router, &venue, USDC, 0);
        assert_eq!(ledger.allowance(&Account::Router, &venue, USDC), 0);
    }
}
