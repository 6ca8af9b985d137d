//! Fire-and-forget publication of account events.

use tracing::{debug, error};

use crate::account::AccountEvent;
use crate::bus::EventBus;
use crate::envelope::{EventEnvelope, USER_EVENTS_EXCHANGE};
use crate::event::Event;

/// Emits account notifications. Publishing never fails from the caller's point of
/// view: delivery problems are logged and swallowed.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AccountEvent);
}

/// Publishes enveloped events onto an [`EventBus`] bound to one exchange.
#[derive(Debug)]
pub struct BusPublisher<B> {
    bus: B,
    exchange: String,
}

impl<B> BusPublisher<B> {
    pub fn new(bus: B) -> Self {
        Self::with_exchange(bus, USER_EVENTS_EXCHANGE)
    }

    pub fn with_exchange(bus: B, exchange: impl Into<String>) -> Self {
        Self {
            bus,
            exchange: exchange.into(),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> EventPublisher for BusPublisher<B>
where
    B: EventBus<EventEnvelope<AccountEvent>>,
{
    fn publish(&self, event: AccountEvent) {
        let routing_key = event.event_type();
        let event_id = event.event_id();
        let envelope = EventEnvelope::wrap(self.exchange.clone(), event);

        match self.bus.publish(envelope) {
            Ok(()) => debug!(
                exchange = %self.exchange,
                routing_key,
                %event_id,
                "account event published"
            ),
            Err(err) => error!(
                exchange = %self.exchange,
                routing_key,
                %event_id,
                error = %err,
                "failed to publish account event"
            ),
        }
    }
}
