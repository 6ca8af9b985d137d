//! Account lifecycle notifications (registration, login attempts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::UserId;

use crate::Event;

/// Routing key for registration notifications.
pub const USER_REGISTRATION_ROUTING_KEY: &str = "user.registration";

/// Routing key for login notifications.
pub const USER_LOGIN_ROUTING_KEY: &str = "user.login";

/// Caller metadata captured at the HTTP boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub event_id: Uuid,
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
    pub client: ClientInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoggedIn {
    pub event_id: Uuid,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub login_at: DateTime<Utc>,
    pub client: ClientInfo,
    pub successful: bool,
    pub failure_reason: Option<String>,
}

impl UserLoggedIn {
    /// A failed attempt carries only the email that was tried.
    pub fn failed(
        email: impl Into<String>,
        reason: impl Into<String>,
        at: DateTime<Utc>,
        client: ClientInfo,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            user_id: None,
            username: None,
            email: email.into(),
            display_name: None,
            roles: Vec::new(),
            login_at: at,
            client,
            successful: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// All account events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum AccountEvent {
    #[serde(rename = "USER_REGISTRATION")]
    Registered(UserRegistered),

    #[serde(rename = "USER_LOGIN")]
    LoggedIn(UserLoggedIn),
}

impl AccountEvent {
    pub fn event_id(&self) -> Uuid {
        match self {
            AccountEvent::Registered(e) => e.event_id,
            AccountEvent::LoggedIn(e) => e.event_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            AccountEvent::Registered(e) => &e.email,
            AccountEvent::LoggedIn(e) => &e.email,
        }
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Registered(_) => USER_REGISTRATION_ROUTING_KEY,
            AccountEvent::LoggedIn(_) => USER_LOGIN_ROUTING_KEY,
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Registered(e) => e.registered_at,
            AccountEvent::LoggedIn(e) => e.login_at,
        }
    }
}
