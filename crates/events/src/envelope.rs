use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Event;

/// Exchange that account notifications are published to.
pub const USER_EVENTS_EXCHANGE: &str = "user.events.exchange";

/// Envelope for a published event: exchange + routing metadata around the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    exchange: String,
    routing_key: String,
    version: u32,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap `payload`, deriving the routing key from its event type.
    pub fn wrap(exchange: impl Into<String>, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            exchange: exchange.into(),
            routing_key: payload.event_type().to_string(),
            version: payload.version(),
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
