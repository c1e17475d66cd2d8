use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::events::OrderEvent;
use crate::types::OrderId;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn save_events(&self, events: Vec<OrderEvent>) -> Result<(), String>;
    async fn get_events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>, String>;
    /// Every saved event, in the order it was saved.
    async fn get_all_events(&self) -> Result<Vec<OrderEvent>, String>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    log: Mutex<Vec<OrderEvent>>,
    by_order: DashMap<OrderId, Vec<usize>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save_events(&self, events: Vec<OrderEvent>) -> Result<(), String> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        for event in events {
            self.by_order
                .entry(event.order_id())
                .or_default()
                .push(log.len());
            log.push(event);
        }
        Ok(())
    }

    async fn get_events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>, String> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .by_order
            .get(&order_id)
            .map(|positions| positions.iter().map(|&pos| log[pos].clone()).collect())
            .unwrap_or_default())
    }

    async fn get_all_events(&self) -> Result<Vec<OrderEvent>, String> {
        Ok(self.log.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
