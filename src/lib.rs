pub mod types;
pub mod engine;
mod commands;
pub mod config;
pub mod error;
mod events;
pub mod event_store;
pub mod guard;
pub mod ledger;
pub mod matching;
pub mod orderbook;

pub use types::{
    AccountId, Asset, BookEntry, BookSnapshot, Order, OrderId, Side, SideEntry, TradingPair,
    MAX_ORDER_AMOUNT, SCALE,
};
pub use engine::MatchingEngine;
pub use commands::{
    CancelOrderCommand, CompactCommand, CreateOrderCommand, MatchOrdersCommand, OrderCommand,
};
pub use config::EngineConfig;
pub use error::{BookError, ConfigError, LedgerError};
pub use events::{
    OrderCancelledEvent, OrderCreatedEvent, OrderEvent, OrderFilledEvent, SurplusRefundedEvent,
};
pub use event_store::{EventStore, InMemoryEventStore};
pub use ledger::{InMemoryLedger, Ledger};
pub use orderbook::OrderStore;
