use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Asset, OrderId, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreatedEvent),
    OrderCancelled(OrderCancelledEvent),
    OrderFilled(OrderFilledEvent),
    SurplusRefunded(SurplusRefundedEvent),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderCreated(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
            OrderEvent::OrderFilled(e) => e.order_id,
            OrderEvent::SurplusRefunded(e) => e.order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub side: Side,
    pub offered_asset: Asset,
    pub offered_amount: u128,
    pub requested_asset: Asset,
    pub requested_amount: u128,
    pub price: u128,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub refunded_asset: Asset,
    pub refunded_amount: u128,
    pub timestamp: DateTime<Utc>,
}

/// One side of a pairing, seen from `order_id`'s owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFilledEvent {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub counterparty_order_id: OrderId,
    pub counterparty: AccountId,
    pub asset_given: Asset,
    pub amount_given: u128,
    pub asset_received: Asset,
    pub amount_received: u128,
    pub remaining_offered: u128,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurplusRefundedEvent {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub asset: Asset,
    pub amount: u128,
    pub timestamp: DateTime<Utc>,
}
