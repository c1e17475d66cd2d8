use std::collections::BTreeMap;

use crate::error::BookError;
use crate::types::{
    compute_price, AccountId, Asset, Order, OrderId, Side, SideEntry, TradingPair,
};

/// Canonical order records plus the two side collections scanned by the
/// matching pass.
///
/// The side collections hold mirrored [`SideEntry`] copies. They are kept in
/// step with the canonical record by [`OrderStore::fill`]; cancellation
/// only touches the canonical record, so a side entry may be stale until the
/// next pass or [`OrderStore::compact`] evicts it.
#[derive(Debug)]
pub struct OrderStore {
    pair: TradingPair,
    next_id: OrderId,
    orders: BTreeMap<OrderId, Order>,
    bids: Vec<SideEntry>,
    asks: Vec<SideEntry>,
}

impl OrderStore {
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            next_id: 1,
            orders: BTreeMap::new(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn next_id(&self) -> OrderId {
        self.next_id
    }

    pub fn create_order(
        &mut self,
        owner: AccountId,
        offered_asset: Asset,
        offered_amount: u128,
        requested_asset: Asset,
        requested_amount: u128,
    ) -> Result<OrderId, BookError> {
        if offered_amount == 0 || requested_amount == 0 {
            return Err(BookError::InvalidAmount);
        }
        let side = self
            .pair
            .side_for(&offered_asset, &requested_asset)
            .ok_or_else(|| BookError::InvalidPair {
                offered: offered_asset.clone(),
                requested: requested_asset.clone(),
            })?;
        let price = compute_price(offered_amount, requested_amount).ok_or(BookError::InvalidAmount)?;

        let id = self.next_id;
        self.next_id += 1;

        let order = Order {
            id,
            owner,
            side,
            offered_asset,
            offered_amount,
            requested_asset,
            requested_amount,
            price,
        };
        self.side_mut(side).push(SideEntry::from(&order));
        self.orders.insert(id, order);
        Ok(id)
    }

    pub fn get_order(&self, id: OrderId) -> Result<&Order, BookError> {
        self.orders.get(&id).ok_or(BookError::NotFound { id })
    }

    pub fn side(&self, side: Side) -> &[SideEntry] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<SideEntry> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Swap-remove: the last entry takes over `index` and the collection
    /// shrinks by one.
    pub fn remove_from_side(&mut self, side: Side, index: usize) -> Option<SideEntry> {
        let entries = self.side_mut(side);
        if index < entries.len() {
            Some(entries.swap_remove(index))
        } else {
            None
        }
    }

    pub fn decrement_remaining(
        &mut self,
        id: OrderId,
        filled_offered: u128,
        filled_requested: u128,
    ) -> Result<&Order, BookError> {
        let order = self.orders.get_mut(&id).ok_or(BookError::NotFound { id })?;
        let offered = order.offered_amount.checked_sub(filled_offered);
        let requested = order.requested_amount.checked_sub(filled_requested);
        match (offered, requested) {
            (Some(offered), Some(requested)) => {
                order.offered_amount = offered;
                order.requested_amount = requested;
                Ok(&*order)
            }
            _ => Err(BookError::InvariantViolation(format!(
                "order {id} cannot give {filled_offered} and receive {filled_requested} \
                 with {} offered and {} requested remaining",
                order.offered_amount, order.requested_amount
            ))),
        }
    }

    /// Decrements the canonical record and refreshes the mirror at
    /// `index` in the same step.
    pub fn fill(
        &mut self,
        side: Side,
        index: usize,
        filled_offered: u128,
        filled_requested: u128,
    ) -> Result<SideEntry, BookError> {
        let id = self
            .side(side)
            .get(index)
            .map(|entry| entry.id)
            .ok_or_else(|| {
                BookError::InvariantViolation(format!("no {side:?} entry at index {index}"))
            })?;
        let mirror = SideEntry::from(self.decrement_remaining(id, filled_offered, filled_requested)?);
        self.side_mut(side)[index] = mirror;
        Ok(mirror)
    }

    /// Zeroes both remaining amounts and returns the offered amount that
    /// was still outstanding. The side entry is left in place.
    pub fn close(&mut self, id: OrderId) -> Result<u128, BookError> {
        let order = self.orders.get_mut(&id).ok_or(BookError::NotFound { id })?;
        if order.is_closed() {
            return Err(BookError::AlreadyClosed { id });
        }
        let remaining = order.offered_amount;
        order.offered_amount = 0;
        order.requested_amount = 0;
        Ok(remaining)
    }

    /// Drops every side entry whose canonical order is closed. Returns the
    /// number of entries evicted.
    pub fn compact(&mut self) -> usize {
        let orders = &self.orders;
        let is_open = |entry: &SideEntry| orders.get(&entry.id).is_some_and(|o| !o.is_closed());
        let before = self.bids.len() + self.asks.len();
        self.bids.retain(is_open);
        self.asks.retain(is_open);
        before - (self.bids.len() + self.asks.len())
    }

    /// Canonical records still listed on `side` with something left to give.
    pub fn open_orders(&self, side: Side) -> Vec<&Order> {
        self.side(side)
            .iter()
            .filter_map(|entry| self.orders.get(&entry.id))
            .filter(|order| !order.is_closed())
            .collect()
    }

    pub fn orders_by_owner(&self, owner: AccountId) -> Vec<&Order> {
        self.orders.values().filter(|o| o.owner == owner).collect()
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }
}
