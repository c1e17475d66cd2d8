//! Error taxonomy for the order book, its ledger collaborator and config.

use thiserror::Error;

use crate::types::{AccountId, Asset, OrderId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("Asset pair {offered}/{requested} is not the configured trading pair")]
    InvalidPair { offered: Asset, requested: Asset },

    #[error("Order amounts must be positive and at most the configured maximum")]
    InvalidAmount,

    #[error("Order not found: {id}")]
    NotFound { id: OrderId },

    #[error("Unauthorized: {caller} does not own order {id}")]
    Unauthorized { caller: AccountId, id: OrderId },

    #[error("Order already closed: {id}")]
    AlreadyClosed { id: OrderId },

    #[error("Ledger transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    #[error("Reentrant call into a guarded entry point")]
    ReentrantCall,

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Event store error: {0}")]
    EventStore(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient {asset} balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        asset: Asset,
        account: AccountId,
        required: u128,
        available: u128,
    },

    #[error("Ledger rejected transfer: {0}")]
    Rejected(String),

    #[error("Nested engine call failed: {0}")]
    Callback(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Malformed config: {0}")]
    Parse(String),

    #[error("Base and quote assets must differ: {0}")]
    SamePair(String),

    #[error("Asset symbol must not be empty")]
    EmptySymbol,

    #[error("Configured custody {configured} differs from the ledger's custody {ledger}")]
    CustodyMismatch {
        configured: AccountId,
        ledger: AccountId,
    },

    #[error("max_order_amount must be in 1..={max}, got {value}")]
    MaxOrderAmount { value: u128, max: u128 },
}
