//! Cross-matching pass over the bid and ask collections.
//!
//! The pass visits every (bid, ask) pair once in collection order. Exhausted
//! orders are swap-removed as soon as they close; whichever entry is swapped
//! into the vacated slot is not revisited in the same pass. Callers run the
//! pass again to pick up pairings skipped that way.
//!
//! [`MatchCursor`] splits each step into planning a pairing and applying it,
//! so a caller can settle a pairing before the store records it.

use tracing::debug;

use crate::error::BookError;
use crate::orderbook::OrderStore;
use crate::types::{mul_scaled, prices_cross, AccountId, OrderId, Side};

/// One executable pairing, in the order the pass produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub bid_id: OrderId,
    pub bid_owner: AccountId,
    pub ask_id: OrderId,
    pub ask_owner: AccountId,
    /// Base units delivered to the bidder.
    pub base_amount: u128,
    /// Quote units delivered to the asker, valued at the ask's stored price.
    pub quote_amount: u128,
    /// Quote returned to the bidder when its requested amount is exhausted
    /// before its offered amount.
    pub bid_surplus: u128,
    /// Amount struck off the ask's requested balance; `quote_amount` capped
    /// at what the ask still requests.
    pub ask_requested_filled: u128,
    pub bid_remaining: u128,
    pub ask_remaining: u128,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub pairings: Vec<Pairing>,
    /// Closed orders evicted from the side collections during the pass.
    pub evicted: Vec<OrderId>,
}

/// Scan position of one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchCursor {
    bid: usize,
    ask: usize,
}

impl MatchCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next executable pairing without filling it. Closed
    /// entries met on the way are evicted and appended to `evicted`.
    /// Returns `None` once every (bid, ask) slot has been visited.
    pub fn next_pairing(
        &mut self,
        store: &mut OrderStore,
        evicted: &mut Vec<OrderId>,
    ) -> Result<Option<Pairing>, BookError> {
        while self.bid < store.side(Side::Bid).len() {
            if self.ask >= store.side(Side::Ask).len() {
                self.next_bid();
                continue;
            }
            let bid = store.side(Side::Bid)[self.bid];
            let ask = store.side(Side::Ask)[self.ask];
            let bid_order = store.get_order(bid.id)?;
            let (bid_offered, bid_requested) = (bid_order.offered_amount, bid_order.requested_amount);

            if bid_offered == 0 {
                store.remove_from_side(Side::Bid, self.bid);
                evicted.push(bid.id);
                self.next_bid();
                continue;
            }

            let ask_order = store.get_order(ask.id)?;
            let (ask_offered, ask_requested) = (ask_order.offered_amount, ask_order.requested_amount);

            if ask_offered == 0 {
                store.remove_from_side(Side::Ask, self.ask);
                evicted.push(ask.id);
                self.ask += 1;
                continue;
            }

            if !prices_cross(bid.price, ask.price) {
                self.ask += 1;
                continue;
            }

            let base_amount = bid_requested.min(ask_offered);
            let quote_amount = match mul_scaled(base_amount, ask.price) {
                Some(quote) if base_amount > 0 && quote > 0 && quote <= bid_offered => quote,
                _ => {
                    debug!(bid = bid.id, ask = ask.id, base_amount, "pairing cannot settle, skipped");
                    self.ask += 1;
                    continue;
                }
            };

            let bid_surplus = if bid_requested == base_amount {
                bid_offered - quote_amount
            } else {
                0
            };
            return Ok(Some(Pairing {
                bid_id: bid.id,
                bid_owner: bid.owner,
                ask_id: ask.id,
                ask_owner: ask.owner,
                base_amount,
                quote_amount,
                bid_surplus,
                ask_requested_filled: quote_amount.min(ask_requested),
                bid_remaining: bid_offered - quote_amount - bid_surplus,
                ask_remaining: ask_offered - base_amount,
            }));
        }
        Ok(None)
    }

    /// Records `pairing`, which must be the one just returned by
    /// [`Self::next_pairing`], and moves past it.
    pub fn apply(&mut self, store: &mut OrderStore, pairing: &Pairing) -> Result<(), BookError> {
        let at_cursor = store.side(Side::Bid).get(self.bid).map(|e| e.id) == Some(pairing.bid_id)
            && store.side(Side::Ask).get(self.ask).map(|e| e.id) == Some(pairing.ask_id);
        if !at_cursor {
            return Err(BookError::InvariantViolation(format!(
                "pairing {}/{} is not at the scan position",
                pairing.bid_id, pairing.ask_id
            )));
        }

        store.fill(
            Side::Bid,
            self.bid,
            pairing.quote_amount + pairing.bid_surplus,
            pairing.base_amount,
        )?;
        store.fill(Side::Ask, self.ask, pairing.base_amount, pairing.ask_requested_filled)?;
        debug!(
            bid = pairing.bid_id,
            ask = pairing.ask_id,
            base_amount = pairing.base_amount,
            quote_amount = pairing.quote_amount,
            bid_surplus = pairing.bid_surplus,
            "pairing applied"
        );

        if pairing.ask_remaining == 0 {
            store.remove_from_side(Side::Ask, self.ask);
        }
        if pairing.bid_remaining == 0 {
            store.remove_from_side(Side::Bid, self.bid);
            self.next_bid();
        } else {
            self.ask += 1;
        }
        Ok(())
    }

    fn next_bid(&mut self) {
        self.bid += 1;
        self.ask = 0;
    }
}

/// Runs one whole pass, mutating `store` in place.
pub fn run_pass(store: &mut OrderStore) -> Result<PassOutcome, BookError> {
    let mut outcome = PassOutcome::default();
    let mut cursor = MatchCursor::new();
    while let Some(pairing) = cursor.next_pairing(store, &mut outcome.evicted)? {
        cursor.apply(store, &pairing)?;
        outcome.pairings.push(pairing);
    }
    Ok(outcome)
}
