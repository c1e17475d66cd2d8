use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed-point scale applied to every stored price.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Largest amount a single order may offer or request. Keeps
/// `amount * SCALE` inside `u128`.
pub const MAX_ORDER_AMOUNT: u128 = 100_000_000_000_000_000_000;

pub type OrderId = u64;
pub type AccountId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Offers the quote asset, wants the base asset.
    Bid,
    /// Offers the base asset, wants the quote asset.
    Ask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: Asset,
    pub quote: Asset,
}

impl TradingPair {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Self { base, quote }
    }

    /// Side an order lands on, or `None` when the assets are not exactly
    /// this pair in one direction or the other.
    pub fn side_for(&self, offered: &Asset, requested: &Asset) -> Option<Side> {
        if *offered == self.base && *requested == self.quote {
            Some(Side::Ask)
        } else if *offered == self.quote && *requested == self.base {
            Some(Side::Bid)
        } else {
            None
        }
    }
}

/// Canonical record of one limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub side: Side,
    pub offered_asset: Asset,
    pub offered_amount: u128,
    pub requested_asset: Asset,
    pub requested_amount: u128,
    /// `requested * SCALE / offered` at creation. Never recomputed.
    pub price: u128,
}

impl Order {
    pub fn is_closed(&self) -> bool {
        self.offered_amount == 0
    }
}

/// Mirror of an order held in a side collection for matching scans.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEntry {
    pub id: OrderId,
    pub owner: AccountId,
    pub offered_amount: u128,
    pub requested_amount: u128,
    pub price: u128,
}

impl From<&Order> for SideEntry {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            owner: order.owner,
            offered_amount: order.offered_amount,
            requested_amount: order.requested_amount,
            price: order.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub pair: TradingPair,
    pub bids: Vec<BookEntry>,
    pub asks: Vec<BookEntry>,
    pub next_order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub offered_amount: u128,
    pub requested_amount: u128,
    /// Stored price divided by `SCALE`, for display only.
    pub price: Decimal,
}

/// `requested * SCALE / offered`, or `None` on zero offered or overflow.
pub fn compute_price(offered: u128, requested: u128) -> Option<u128> {
    if offered == 0 {
        return None;
    }
    requested.checked_mul(SCALE).map(|scaled| scaled / offered)
}

/// `amount * price / SCALE`, floored.
pub fn mul_scaled(amount: u128, price: u128) -> Option<u128> {
    amount.checked_mul(price).map(|product| product / SCALE)
}

/// A bid's price is base per quote and an ask's is quote per base, so the
/// bid is at least as generous as the ask when the product of the two
/// stays within `SCALE^2`.
pub fn prices_cross(bid_price: u128, ask_price: u128) -> bool {
    bid_price
        .checked_mul(ask_price)
        .is_some_and(|product| product <= SCALE * SCALE)
}

/// Stored price as a decimal with 18 fractional digits. Saturates at
/// `Decimal::MAX` for prices beyond its 96-bit mantissa.
pub fn price_to_decimal(price: u128) -> Decimal {
    i128::try_from(price)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, 18).ok())
        .unwrap_or(Decimal::MAX)
}
