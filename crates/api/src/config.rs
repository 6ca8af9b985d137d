//! Runtime configuration, read from the environment.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use warden_auth::DEFAULT_TOKEN_VALIDITY_SECS;
use warden_auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use warden_infra::{DEFAULT_NAMESPACE, DEFAULT_TTL_SECS};

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Upper bound for token validity and cache TTL: ten years.
const MAX_DURATION_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Optional admin account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub token_validity: Duration,
    pub cache_ttl: Duration,
    pub cache_namespace: String,
    pub bcrypt_cost: u32,
    pub bind_addr: SocketAddr,
    pub bootstrap_admin: Option<AdminBootstrap>,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_validity", &self.token_validity)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_namespace", &self.cache_namespace)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("bind_addr", &self.bind_addr)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let validity_secs = parse_or("TOKEN_VALIDITY_SECS", get("TOKEN_VALIDITY_SECS"), DEFAULT_TOKEN_VALIDITY_SECS)?;
        if validity_secs <= 0 {
            return Err(invalid("TOKEN_VALIDITY_SECS", validity_secs.to_string(), "must be positive"));
        }
        let token_validity = bounded_seconds("TOKEN_VALIDITY_SECS", validity_secs)?;

        let ttl_secs = parse_or("PRINCIPAL_CACHE_TTL_SECS", get("PRINCIPAL_CACHE_TTL_SECS"), DEFAULT_TTL_SECS)?;
        if ttl_secs < 0 {
            return Err(invalid("PRINCIPAL_CACHE_TTL_SECS", ttl_secs.to_string(), "must not be negative"));
        }
        let cache_ttl = bounded_seconds("PRINCIPAL_CACHE_TTL_SECS", ttl_secs)?;

        let bcrypt_cost = parse_or("BCRYPT_COST", get("BCRYPT_COST"), DEFAULT_COST)?;
        if !(MIN_COST..=MAX_COST).contains(&bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", bcrypt_cost.to_string(), "must be within 4..=31"));
        }

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), SocketAddr::from(DEFAULT_BIND_ADDR))?;

        let bootstrap_admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                username: get("ADMIN_USERNAME").unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
                password,
            }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("ADMIN_EMAIL and ADMIN_PASSWORD must both be set; skipping admin bootstrap");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            jwt_secret,
            token_validity,
            cache_ttl,
            cache_namespace: get("PRINCIPAL_CACHE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            bcrypt_cost,
            bind_addr,
            bootstrap_admin,
        })
    }

    /// Deterministic, cheap configuration for tests.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            jwt_secret: secret.to_string(),
            token_validity: Duration::seconds(DEFAULT_TOKEN_VALIDITY_SECS),
            cache_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            cache_namespace: DEFAULT_NAMESPACE.to_string(),
            bcrypt_cost: MIN_COST,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            bootstrap_admin: None,
        }
    }
}

fn parse_or<T: core::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| invalid(key, value, "unparsable")),
    }
}

fn bounded_seconds(key: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    if secs > MAX_DURATION_SECS {
        return Err(invalid(key, secs.to_string(), "must not exceed ten years"));
    }
    Duration::try_seconds(secs).ok_or_else(|| invalid(key, secs.to_string(), "out of range"))
}

fn invalid(key: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { key, value, reason }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.token_validity, Duration::hours(24));
        assert_eq!(cfg.cache_ttl, Duration::minutes(5));
        assert_eq!(cfg.cache_namespace, "userCache");
        assert_eq!(cfg.bcrypt_cost, 10);
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn explicit_values_are_used() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_VALIDITY_SECS", "60"),
            ("PRINCIPAL_CACHE_TTL_SECS", "0"),
            ("PRINCIPAL_CACHE_NAMESPACE", "principals"),
            ("BCRYPT_COST", "4"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("ADMIN_EMAIL", "root@x.com"),
            ("ADMIN_PASSWORD", "rootpassword"),
        ])
        .unwrap();

        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.token_validity, Duration::seconds(60));
        assert_eq!(cfg.cache_ttl, Duration::zero());
        assert_eq!(cfg.cache_namespace, "principals");
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        let admin = cfg.bootstrap_admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.email, "root@x.com");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            config(&[("TOKEN_VALIDITY_SECS", "a day")]),
            Err(ConfigError::Invalid { key: "TOKEN_VALIDITY_SECS", .. })
        ));
        assert!(config(&[("TOKEN_VALIDITY_SECS", "0")]).is_err());
        assert!(config(&[("PRINCIPAL_CACHE_TTL_SECS", "-1")]).is_err());
        assert!(config(&[("BCRYPT_COST", "99")]).is_err());
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert!(matches!(
            config(&[("TOKEN_VALIDITY_SECS", "9223372036854775807")]),
            Err(ConfigError::Invalid { key: "TOKEN_VALIDITY_SECS", .. })
        ));
        assert!(matches!(
            config(&[("PRINCIPAL_CACHE_TTL_SECS", "10000000000000")]),
            Err(ConfigError::Invalid { key: "PRINCIPAL_CACHE_TTL_SECS", .. })
        ));

        let ten_years = MAX_DURATION_SECS.to_string();
        let cfg = config(&[
            ("TOKEN_VALIDITY_SECS", ten_years.as_str()),
            ("PRINCIPAL_CACHE_TTL_SECS", ten_years.as_str()),
        ])
        .unwrap();
        assert_eq!(cfg.cache_ttl, Duration::seconds(MAX_DURATION_SECS));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut cfg = ApiConfig::for_tests("very-secret-key");
        cfg.bootstrap_admin = Some(AdminBootstrap {
            email: "root@x.com".to_string(),
            username: "root".to_string(),
            password: "hunter2hunter2".to_string(),
        });
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret-key"));
        assert!(!rendered.contains("hunter2"));
    }
}
