use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::commands::{CancelOrderCommand, CreateOrderCommand, OrderCommand};
use crate::config::EngineConfig;
use crate::error::{BookError, ConfigError};
use crate::event_store::EventStore;
use crate::events::{
    OrderCancelledEvent, OrderCreatedEvent, OrderEvent, OrderFilledEvent, SurplusRefundedEvent,
};
use crate::guard::ReentrancyGuard;
use crate::ledger::Ledger;
use crate::matching::{MatchCursor, Pairing};
use crate::orderbook::OrderStore;
use crate::types::{
    compute_price, price_to_decimal, AccountId, Asset, BookEntry, BookSnapshot, Order, OrderId,
    Side, SideEntry,
};

/// Limit order book for one trading pair.
///
/// Every mutating entry point holds the reentrancy guard for its whole
/// duration. Requests are validated against the committed store, the ledger
/// moves funds, and only then is the store mutated, so the book never
/// disagrees with a transfer that went through. Events are persisted after
/// the store is updated; an event-store failure is reported but does not
/// undo the operation.
pub struct MatchingEngine {
    config: EngineConfig,
    store: Mutex<OrderStore>,
    ledger: Arc<dyn Ledger>,
    event_store: Box<dyn EventStore>,
    guard: ReentrancyGuard,
}

impl MatchingEngine {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn Ledger>,
        event_store: Box<dyn EventStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ledger_custody = ledger.custody_account();
        if ledger_custody != config.custody {
            return Err(ConfigError::CustodyMismatch {
                configured: config.custody,
                ledger: ledger_custody,
            });
        }
        Ok(Self {
            store: Mutex::new(OrderStore::new(config.pair.clone())),
            config,
            ledger,
            event_store,
            guard: ReentrancyGuard::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_store(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }

    pub async fn handle_command(&self, command: OrderCommand) -> Result<Vec<OrderEvent>, BookError> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create_order(cmd).await,
            OrderCommand::CancelOrder(cmd) => self.handle_cancel_order(cmd).await,
            OrderCommand::MatchOrders(cmd) => self.match_orders(cmd.caller).await,
            OrderCommand::Compact(cmd) => self.compact(cmd.caller).map(|_| Vec::new()),
        }
    }

    pub async fn handle_create_order(
        &self,
        cmd: CreateOrderCommand,
    ) -> Result<Vec<OrderEvent>, BookError> {
        self.create_order(
            cmd.caller,
            cmd.offered_asset,
            cmd.offered_amount,
            cmd.requested_asset,
            cmd.requested_amount,
        )
        .await
    }

    pub async fn handle_cancel_order(
        &self,
        cmd: CancelOrderCommand,
    ) -> Result<Vec<OrderEvent>, BookError> {
        self.cancel_order(cmd.caller, cmd.order_id).await
    }

    /// Takes `offered_amount` of `offered_asset` from `caller` into custody
    /// and rests the order on the side selected by the offered asset.
    pub async fn create_order(
        &self,
        caller: AccountId,
        offered_asset: Asset,
        offered_amount: u128,
        requested_asset: Asset,
        requested_amount: u128,
    ) -> Result<Vec<OrderEvent>, BookError> {
        let _lease = self.guard.enter()?;
        let result = self
            .create_order_guarded(caller, offered_asset, offered_amount, requested_asset, requested_amount)
            .await;
        if let Err(e) = &result {
            warn!(%caller, error = %e, "order rejected");
        }
        result
    }

    async fn create_order_guarded(
        &self,
        caller: AccountId,
        offered_asset: Asset,
        offered_amount: u128,
        requested_asset: Asset,
        requested_amount: u128,
    ) -> Result<Vec<OrderEvent>, BookError> {
        self.validate_order(&offered_asset, offered_amount, &requested_asset, requested_amount)?;

        self.ledger
            .transfer_in(&offered_asset, caller, offered_amount)
            .await?;

        let recorded = self.with_store_mut(|store| {
            store
                .create_order(
                    caller,
                    offered_asset.clone(),
                    offered_amount,
                    requested_asset,
                    requested_amount,
                )
                .and_then(|id| store.get_order(id).cloned())
        });
        let order = match recorded {
            Ok(order) => order,
            Err(e) => {
                // Deposit already taken; hand it back before reporting.
                if let Err(refund) = self
                    .ledger
                    .transfer_out(&offered_asset, caller, offered_amount)
                    .await
                {
                    error!(%caller, amount = offered_amount, error = %refund, "deposit refund failed");
                }
                return Err(e);
            }
        };

        info!(
            order_id = order.id,
            %caller,
            side = ?order.side,
            offered = order.offered_amount,
            requested = order.requested_amount,
            "order created"
        );

        let events = vec![OrderEvent::OrderCreated(OrderCreatedEvent {
            order_id: order.id,
            owner: caller,
            side: order.side,
            offered_asset: order.offered_asset,
            offered_amount: order.offered_amount,
            requested_asset: order.requested_asset,
            requested_amount: order.requested_amount,
            price: order.price,
            timestamp: Utc::now(),
        })];
        self.publish(&events).await?;
        Ok(events)
    }

    /// Checks amounts, then the asset pair, then that a price can be stored.
    pub(crate) fn validate_order(
        &self,
        offered_asset: &Asset,
        offered_amount: u128,
        requested_asset: &Asset,
        requested_amount: u128,
    ) -> Result<Side, BookError> {
        let max = self.config.max_order_amount;
        if offered_amount == 0
            || requested_amount == 0
            || offered_amount > max
            || requested_amount > max
        {
            return Err(BookError::InvalidAmount);
        }
        let side = self
            .config
            .pair
            .side_for(offered_asset, requested_asset)
            .ok_or_else(|| BookError::InvalidPair {
                offered: offered_asset.clone(),
                requested: requested_asset.clone(),
            })?;
        compute_price(offered_amount, requested_amount).ok_or(BookError::InvalidAmount)?;
        Ok(side)
    }

    /// Runs one cross-matching pass. Any caller may trigger it.
    pub async fn match_orders(&self, caller: AccountId) -> Result<Vec<OrderEvent>, BookError> {
        let _lease = self.guard.enter()?;
        let result = self.match_orders_guarded().await;
        match &result {
            Ok(events) => info!(%caller, events = events.len(), "matching pass complete"),
            Err(e) => warn!(%caller, error = %e, "matching pass aborted"),
        }
        result
    }

    /// Plans one pairing at a time against the live store, pays it out, and
    /// records it before planning the next. A payout failure stops the pass
    /// with every earlier pairing already on the books.
    async fn match_orders_guarded(&self) -> Result<Vec<OrderEvent>, BookError> {
        let mut cursor = MatchCursor::new();
        let mut evicted = Vec::new();
        let mut events = Vec::new();

        loop {
            let next = self.with_store_mut(|store| cursor.next_pairing(store, &mut evicted))?;
            let Some(pairing) = next else { break };

            let settled = self.settle(&mut cursor, &pairing, &mut events).await;
            if let Err(e) = settled {
                if !events.is_empty() {
                    if let Err(store_err) = self.publish(&events).await {
                        error!(error = %store_err, "fills of an aborted pass were not persisted");
                    }
                }
                return Err(e);
            }
        }

        if !evicted.is_empty() {
            info!(evicted = evicted.len(), "closed orders evicted during pass");
        }
        if !events.is_empty() {
            self.publish(&events).await?;
        }
        Ok(events)
    }

    /// Pays out the legs of `pairing` from custody, pushing each
    /// counterparty's notification once its leg has gone through. The
    /// pairing is recorded in the store as soon as the bidder's base leg is
    /// paid, so no leg is ever paid twice. A leg that fails after that stays
    /// in custody and is logged with its owner and amount.
    async fn settle(
        &self,
        cursor: &mut MatchCursor,
        pairing: &Pairing,
        events: &mut Vec<OrderEvent>,
    ) -> Result<(), BookError> {
        let base = &self.config.pair.base;
        let quote = &self.config.pair.quote;
        let timestamp = Utc::now();

        self.ledger
            .transfer_out(base, pairing.bid_owner, pairing.base_amount)
            .await?;
        self.with_store_mut(|store| cursor.apply(store, pairing))?;
        events.push(OrderEvent::OrderFilled(OrderFilledEvent {
            order_id: pairing.bid_id,
            owner: pairing.bid_owner,
            counterparty_order_id: pairing.ask_id,
            counterparty: pairing.ask_owner,
            asset_given: quote.clone(),
            amount_given: pairing.quote_amount,
            asset_received: base.clone(),
            amount_received: pairing.base_amount,
            remaining_offered: pairing.bid_remaining,
            timestamp,
        }));

        if let Err(e) = self
            .ledger
            .transfer_out(quote, pairing.ask_owner, pairing.quote_amount)
            .await
        {
            error!(
                order_id = pairing.ask_id,
                owner = %pairing.ask_owner,
                amount = pairing.quote_amount,
                "quote leg left in custody"
            );
            return Err(e.into());
        }
        events.push(OrderEvent::OrderFilled(OrderFilledEvent {
            order_id: pairing.ask_id,
            owner: pairing.ask_owner,
            counterparty_order_id: pairing.bid_id,
            counterparty: pairing.bid_owner,
            asset_given: base.clone(),
            amount_given: pairing.base_amount,
            asset_received: quote.clone(),
            amount_received: pairing.quote_amount,
            remaining_offered: pairing.ask_remaining,
            timestamp,
        }));

        if pairing.bid_surplus > 0 {
            if let Err(e) = self
                .ledger
                .transfer_out(quote, pairing.bid_owner, pairing.bid_surplus)
                .await
            {
                error!(
                    order_id = pairing.bid_id,
                    owner = %pairing.bid_owner,
                    amount = pairing.bid_surplus,
                    "surplus refund left in custody"
                );
                return Err(e.into());
            }
            events.push(OrderEvent::SurplusRefunded(SurplusRefundedEvent {
                order_id: pairing.bid_id,
                owner: pairing.bid_owner,
                asset: quote.clone(),
                amount: pairing.bid_surplus,
                timestamp,
            }));
        }

        info!(
            bid = pairing.bid_id,
            ask = pairing.ask_id,
            base = pairing.base_amount,
            quote = pairing.quote_amount,
            surplus = pairing.bid_surplus,
            "orders filled"
        );
        Ok(())
    }

    /// Refunds the remaining offered amount to the owner and closes the
    /// order. The side entry stays until a pass or [`Self::compact`]
    /// evicts it.
    pub async fn cancel_order(
        &self,
        caller: AccountId,
        order_id: OrderId,
    ) -> Result<Vec<OrderEvent>, BookError> {
        let _lease = self.guard.enter()?;
        let result = self.cancel_order_guarded(caller, order_id).await;
        if let Err(e) = &result {
            warn!(%caller, order_id, error = %e, "cancellation rejected");
        }
        result
    }

    async fn cancel_order_guarded(
        &self,
        caller: AccountId,
        order_id: OrderId,
    ) -> Result<Vec<OrderEvent>, BookError> {
        let (refund_asset, remaining) = self.with_store(|store| -> Result<(Asset, u128), BookError> {
            let order = store.get_order(order_id)?;
            if order.owner != caller {
                return Err(BookError::Unauthorized {
                    caller,
                    id: order_id,
                });
            }
            if order.is_closed() {
                return Err(BookError::AlreadyClosed { id: order_id });
            }
            Ok((order.offered_asset.clone(), order.offered_amount))
        })?;

        self.ledger
            .transfer_out(&refund_asset, caller, remaining)
            .await?;
        let refund = self.with_store_mut(|store| store.close(order_id))?;
        info!(order_id, %caller, refund, "order cancelled");

        let events = vec![OrderEvent::OrderCancelled(OrderCancelledEvent {
            order_id,
            owner: caller,
            refunded_asset: refund_asset,
            refunded_amount: refund,
            timestamp: Utc::now(),
        })];
        self.publish(&events).await?;
        Ok(events)
    }

    /// Evicts closed orders from both side collections. Returns how many
    /// entries were removed.
    pub fn compact(&self, caller: AccountId) -> Result<usize, BookError> {
        let _lease = self.guard.enter()?;
        let evicted = self.with_store_mut(OrderStore::compact);
        info!(%caller, evicted, "side collections compacted");
        Ok(evicted)
    }

    pub fn get_order(&self, order_id: OrderId) -> Result<Order, BookError> {
        self.with_store(|store| store.get_order(order_id).cloned())
    }

    /// Mirrored entries of one side, in scan order. May include closed
    /// orders that have not been evicted yet.
    pub fn side_entries(&self, side: Side) -> Vec<SideEntry> {
        self.with_store(|store| store.side(side).to_vec())
    }

    pub fn open_orders(&self, side: Side) -> Vec<Order> {
        self.with_store(|store| store.open_orders(side).into_iter().cloned().collect())
    }

    pub fn orders_by_owner(&self, owner: AccountId) -> Vec<Order> {
        self.with_store(|store| store.orders_by_owner(owner).into_iter().cloned().collect())
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.with_store(|store| {
            let entries = |side: Side| -> Vec<BookEntry> {
                store
                    .open_orders(side)
                    .into_iter()
                    .map(|order| BookEntry {
                        order_id: order.id,
                        owner: order.owner,
                        offered_amount: order.offered_amount,
                        requested_amount: order.requested_amount,
                        price: price_to_decimal(order.price),
                    })
                    .collect()
            };
            BookSnapshot {
                pair: store.pair().clone(),
                bids: entries(Side::Bid),
                asks: entries(Side::Ask),
                next_order_id: store.next_id(),
            }
        })
    }

    /// Offered amounts still owed by custody as `(base, quote)`: the sum
    /// over every order of what it has left to give.
    pub fn custody_totals(&self) -> (u128, u128) {
        self.with_store(|store| {
            store.orders().fold((0, 0), |(base, quote), order| match order.side {
                Side::Ask => (base + order.offered_amount, quote),
                Side::Bid => (base, quote + order.offered_amount),
            })
        })
    }

    fn with_store<T>(&self, f: impl FnOnce(&OrderStore) -> T) -> T {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    fn with_store_mut<T>(&self, f: impl FnOnce(&mut OrderStore) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    async fn publish(&self, events: &[OrderEvent]) -> Result<(), BookError> {
        self.event_store
            .save_events(events.to_vec())
            .await
            .map_err(BookError::EventStore)
    }
}
