//! In-process event bus used to tell views that shared data changed.
//!
//! Publishing is fire-and-forget: every live subscriber gets its own copy
//! of the event on a channel and decides what to re-fetch.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateUpdate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LedgerEvent {
    ExchangeRateUpdated(ExchangeRateUpdate),
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<LedgerEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<LedgerEvent> {
        let (tx, rx) = channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `event` to every subscriber, dropping the ones whose receiver is gone.
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(?event, delivered = subscribers.len(), "event published");
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<LedgerEvent>>> {
        // A poisoned list of senders is still a valid list of senders.
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
