use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Asset, OrderId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrderCommand),
    CancelOrder(CancelOrderCommand),
    MatchOrders(MatchOrdersCommand),
    Compact(CompactCommand),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderCommand {
    pub caller: AccountId,
    pub offered_asset: Asset,
    pub offered_amount: u128,
    pub requested_asset: Asset,
    pub requested_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderCommand {
    pub caller: AccountId,
    pub order_id: OrderId,
}

/// Anyone may trigger a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOrdersCommand {
    pub caller: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactCommand {
    pub caller: AccountId,
}
