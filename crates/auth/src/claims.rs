//! Bearer token codec.
//!
//! Tokens are HS256-signed JWTs carrying the subject, the ordered role claims
//! (as `ROLE_*` capability strings), `iat` and `exp`. Validation is a pure
//! function of the token text, the server secret and the supplied `now`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{IdentityKey, RoleName};

/// Default validity window of an issued token, in seconds (24 hours).
pub const DEFAULT_TOKEN_VALIDITY_SECS: i64 = 24 * 60 * 60;

/// Identity and authorization facts recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: IdentityKey,
    pub roles: Vec<RoleName>,
}

/// A freshly issued token plus the facts it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub subject: IdentityKey,
    pub roles: Vec<RoleName>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("token could not be issued: {0}")]
pub struct IssueError(String);

/// Issues and validates self-contained bearer tokens.
pub trait TokenCodec: Send + Sync {
    fn issue(
        &self,
        subject: &IdentityKey,
        roles: &[RoleName],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError>;

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;

    fn validity(&self) -> Duration;
}

/// Wire representation of the claims.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    roles: Vec<String>,
    iat: i64,
    exp: i64,
}

/// HMAC-SHA256 token codec keyed by a server-held secret.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8], validity: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's `now`, never the library clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            validity,
        }
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn issue(
        &self,
        subject: &IdentityKey,
        roles: &[RoleName],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.validity.num_seconds())
            .ok_or_else(|| IssueError("expires_at out of range".to_string()))?;

        let wire = WireClaims {
            sub: subject.as_str().to_string(),
            roles: roles.iter().map(RoleName::authority).collect(),
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| IssueError(e.to_string()))?;

        let issued_at = DateTime::from_timestamp(iat, 0)
            .ok_or_else(|| IssueError("issued_at out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| IssueError("expires_at out of range".to_string()))?;

        debug!(subject = %subject, roles = roles.len(), %expires_at, "issued token");

        Ok(IssuedToken {
            token,
            subject: subject.clone(),
            roles: roles.to_vec(),
            issued_at,
            expires_at,
        })
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed,
            }
        })?;
        let wire = data.claims;

        // issued_at in the future (clock skew) is accepted; only expiry matters.
        let expires_at = DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Malformed)?;
        if now > expires_at {
            return Err(TokenError::Expired);
        }

        if wire.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        let roles = wire
            .roles
            .iter()
            .map(|authority| RoleName::from_authority(authority).ok_or(TokenError::Malformed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Claims {
            subject: IdentityKey::new(&wire.sub),
            roles,
        })
    }

    fn validity(&self) -> Duration {
        self.validity
    }
}
