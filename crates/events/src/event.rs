use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - routed by `event_type` (used as the routing key on the exchange)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name / routing key (e.g. "user.login").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
