use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::LedgerError;
use crate::types::{AccountId, Asset};

/// Settlement capability the engine drives. Each call moves the full amount
/// or nothing.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Moves `amount` of `asset` from `from` into the engine's custody.
    async fn transfer_in(
        &self,
        asset: &Asset,
        from: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError>;

    /// Moves `amount` of `asset` from the engine's custody to `to`.
    async fn transfer_out(&self, asset: &Asset, to: AccountId, amount: u128)
        -> Result<(), LedgerError>;

    async fn balance_of(&self, asset: &Asset, account: AccountId) -> u128;

    /// Account that `transfer_in` credits and `transfer_out` debits.
    fn custody_account(&self) -> AccountId;
}

/// Balance table keyed by (asset, account), with one account acting as the
/// engine's custody.
pub struct InMemoryLedger {
    custody: AccountId,
    balances: DashMap<(Asset, AccountId), u128>,
    frozen: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(custody: AccountId) -> Self {
        Self {
            custody,
            balances: DashMap::new(),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn custody(&self) -> AccountId {
        self.custody
    }

    pub fn mint(&self, asset: &Asset, account: AccountId, amount: u128) {
        *self.balances.entry((asset.clone(), account)).or_insert(0) += amount;
    }

    pub fn balance(&self, asset: &Asset, account: AccountId) -> u128 {
        self.balances
            .get(&(asset.clone(), account))
            .map(|balance| *balance)
            .unwrap_or_default()
    }

    /// While frozen every transfer is rejected.
    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::SeqCst);
    }

    fn move_balance(
        &self,
        asset: &Asset,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(LedgerError::Rejected("ledger is frozen".to_string()));
        }
        {
            let mut source = self.balances.entry((asset.clone(), from)).or_insert(0);
            if *source < amount {
                return Err(LedgerError::InsufficientBalance {
                    asset: asset.clone(),
                    account: from,
                    required: amount,
                    available: *source,
                });
            }
            *source -= amount;
        }
        *self.balances.entry((asset.clone(), to)).or_insert(0) += amount;
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn transfer_in(
        &self,
        asset: &Asset,
        from: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_balance(asset, from, self.custody, amount)
    }

    async fn transfer_out(
        &self,
        asset: &Asset,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_balance(asset, self.custody, to, amount)
    }

    async fn balance_of(&self, asset: &Asset, account: AccountId) -> u128 {
        self.balance(asset, account)
    }

    fn custody_account(&self) -> AccountId {
        self.custody
    }
}
