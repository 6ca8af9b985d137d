//! Account event notifications.

pub mod account;
pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod publisher;

pub use account::{
    AccountEvent, ClientInfo, USER_LOGIN_ROUTING_KEY, USER_REGISTRATION_ROUTING_KEY, UserLoggedIn,
    UserRegistered,
};
pub use bus::{EventBus, Subscription};
pub use envelope::{EventEnvelope, USER_EVENTS_EXCHANGE};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use publisher::{BusPublisher, EventPublisher};
