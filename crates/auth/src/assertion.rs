//! Signed identity assertion exchanged for a bearer token.
//!
//! The assertion is an RS256 token whose claims bind the client id to a
//! one-hour window. Its issue time also fixes the nonce and timestamp that
//! every `X-Brad-Signature` made with the resulting bearer token must repeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::credential::Credential;
use crate::error::SigningError;
use crate::signing::sign_token;

/// Token endpoint the assertion is addressed to.
pub const DEFAULT_AUDIENCE: &str = "https://proxy.api.prebanco.com.br/auth/server/v1.1/token";

pub const ASSERTION_VERSION: &str = "1.1";

/// Seconds between `iat` and `exp`.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The protocol caps `jti` at eighteen decimal digits.
pub const MAX_NONCE: i64 = 999_999_999_999_999_999;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Appended verbatim; the protocol expects this literal, not a computed offset.
const TIMESTAMP_SUFFIX: &str = "-00:00";

/// Claim set carried by the assertion, serialized in field order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub jti: i64,
    pub exp: i64,
    pub ver: String,
}

impl AssertionClaims {
    pub fn new(audience: &str, subject: &str, issued_at: i64, nonce: i64, expires_at: i64) -> Self {
        Self {
            aud: audience.to_owned(),
            sub: subject.to_owned(),
            iat: issued_at,
            jti: nonce,
            exp: expires_at,
            ver: ASSERTION_VERSION.to_owned(),
        }
    }
}

/// Result of one authentication cycle.
///
/// `nonce` and `timestamp` must be reused for every request signed with the
/// bearer token obtained from `assertion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedAssertion {
    assertion: String,
    timestamp: String,
    issued_at: i64,
    nonce: i64,
    expires_at: i64,
}

impl SignedAssertion {
    pub fn assertion(&self) -> &str {
        &self.assertion
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn nonce(&self) -> i64 {
        self.nonce
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

/// Builds assertions against an injected clock.
#[derive(Debug, Clone)]
pub struct AssertionBuilder<C> {
    clock: C,
    audience: String,
}

impl<C: Clock> AssertionBuilder<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            audience: DEFAULT_AUDIENCE.to_owned(),
        }
    }

    /// Address the assertion to a different token endpoint.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn create_assertion<K>(
        &self,
        subject_id: &str,
        credential: &K,
    ) -> Result<SignedAssertion, SigningError>
    where
        K: Credential + ?Sized,
    {
        let now = self.clock.now();
        let timestamp = format_timestamp(now);
        let issued_at = now.timestamp();
        let nonce = nonce_from_issued_at(issued_at)?;
        let expires_at = issued_at + ASSERTION_LIFETIME_SECS;

        let claims = AssertionClaims::new(&self.audience, subject_id, issued_at, nonce, expires_at);
        let assertion = sign_token(&claims, credential)?;

        tracing::debug!(subject = subject_id, issued_at, nonce, "created assertion");

        Ok(SignedAssertion {
            assertion,
            timestamp,
            issued_at,
            nonce,
            expires_at,
        })
    }
}

impl Default for AssertionBuilder<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

/// Build an assertion for `subject_id` from the wall clock and the default audience.
pub fn create_assertion<K>(
    subject_id: &str,
    credential: &K,
) -> Result<SignedAssertion, SigningError>
where
    K: Credential + ?Sized,
{
    AssertionBuilder::<SystemClock>::default().create_assertion(subject_id, credential)
}

/// `YYYY-MM-DDTHH:mm:ss-00:00`.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    format!("{}{TIMESTAMP_SUFFIX}", instant.format(TIMESTAMP_FORMAT))
}

/// Nonce derived by appending `000` to the decimal issued-at.
///
/// Built from the string, not by multiplying, so the digits match what the
/// token server reconstructs. Fails when the result exceeds eighteen digits.
pub fn nonce_from_issued_at(issued_at: i64) -> Result<i64, SigningError> {
    let nonce: i64 = format!("{issued_at}000")
        .parse()
        .map_err(|_| SigningError::NonceOutOfRange(issued_at))?;
    if nonce.unsigned_abs() > MAX_NONCE.unsigned_abs() {
        return Err(SigningError::NonceOutOfRange(issued_at));
    }
    Ok(nonce)
}
