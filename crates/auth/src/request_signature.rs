//! `X-Brad-Signature` computation.
//!
//! The server rebuilds the canonical message from the request it receives and
//! checks the signature against it, so field order, separators and the
//! URL-safe transform must match byte for byte.

use std::fmt;

use crate::assertion::SignedAssertion;
use crate::credential::Credential;
use crate::error::SigningError;
use crate::signing::{SIGNATURE_ALGORITHM, compute_signature};

pub const SIGNATURE_HEADER: &str = "X-Brad-Signature";
pub const NONCE_HEADER: &str = "X-Brad-Nonce";
pub const TIMESTAMP_HEADER: &str = "X-Brad-Timestamp";
pub const ALGORITHM_HEADER: &str = "X-Brad-Algorithm";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// The target API only signs `POST` requests.
const METHOD: &str = "POST";

/// Fields of one outgoing request, in canonical order.
///
/// `query` and `body` are empty strings when the request has none; they still
/// occupy a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    pub path: &'a str,
    pub query: &'a str,
    pub body: &'a str,
    pub bearer_token: &'a str,
    pub nonce: i64,
    pub timestamp: &'a str,
}

impl CanonicalRequest<'_> {
    /// Newline-joined message; the trailing algorithm name has no newline after it.
    pub fn to_message(&self) -> String {
        let nonce = self.nonce.to_string();
        [
            METHOD,
            self.path,
            self.query,
            self.body,
            self.bearer_token,
            nonce.as_str(),
            self.timestamp,
            SIGNATURE_ALGORITHM,
        ]
        .join("\n")
    }

    pub fn sign<C>(&self, credential: &C) -> Result<String, SigningError>
    where
        C: Credential + ?Sized,
    {
        let message = self.to_message();
        tracing::debug!(
            path = self.path,
            nonce = self.nonce,
            message_len = message.len(),
            "signing request"
        );
        let signed = compute_signature(&message, credential)?;
        Ok(to_url_safe(&signed))
    }
}

/// Sign a `POST` request for the `X-Brad-Signature` header.
///
/// `nonce` and `timestamp` must come from the [`SignedAssertion`] that
/// produced `bearer_token`.
pub fn create_request_signature<C>(
    bearer_token: &str,
    timestamp: &str,
    request_path: &str,
    query_parameters: &str,
    request_body: &str,
    nonce: i64,
    credential: &C,
) -> Result<String, SigningError>
where
    C: Credential + ?Sized,
{
    CanonicalRequest {
        path: request_path,
        query: query_parameters,
        body: request_body,
        bearer_token,
        nonce,
        timestamp,
    }
    .sign(credential)
}

/// Drop `=` padding, map `+` to `-` and `/` to `_`, and trim.
pub fn to_url_safe(signature_b64: &str) -> String {
    signature_b64
        .replace('=', "")
        .replace('+', "-")
        .replace('/', "_")
        .trim()
        .to_owned()
}

/// Headers that authenticate one API request.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequestHeaders {
    bearer_token: String,
    signature: String,
    nonce: i64,
    timestamp: String,
}

impl SignedRequestHeaders {
    /// Sign a request with the nonce and timestamp of `assertion`.
    pub fn for_assertion<C>(
        assertion: &SignedAssertion,
        bearer_token: &str,
        request_path: &str,
        query_parameters: &str,
        request_body: &str,
        credential: &C,
    ) -> Result<Self, SigningError>
    where
        C: Credential + ?Sized,
    {
        Self::sign(
            bearer_token,
            assertion.nonce(),
            assertion.timestamp(),
            request_path,
            query_parameters,
            request_body,
            credential,
        )
    }

    /// Sign a request with a nonce and timestamp kept from an earlier assertion.
    pub fn sign<C>(
        bearer_token: &str,
        nonce: i64,
        timestamp: &str,
        request_path: &str,
        query_parameters: &str,
        request_body: &str,
        credential: &C,
    ) -> Result<Self, SigningError>
    where
        C: Credential + ?Sized,
    {
        let signature = create_request_signature(
            bearer_token,
            timestamp,
            request_path,
            query_parameters,
            request_body,
            nonce,
            credential,
        )?;
        Ok(Self {
            bearer_token: bearer_token.to_owned(),
            signature,
            nonce,
            timestamp: timestamp.to_owned(),
        })
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn nonce(&self) -> i64 {
        self.nonce
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `(name, value)` pairs to attach to the request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (AUTHORIZATION_HEADER, format!("Bearer {}", self.bearer_token)),
            (SIGNATURE_HEADER, self.signature.clone()),
            (NONCE_HEADER, self.nonce.to_string()),
            (TIMESTAMP_HEADER, self.timestamp.clone()),
            (ALGORITHM_HEADER, SIGNATURE_ALGORITHM.to_owned()),
        ]
    }
}

impl fmt::Debug for SignedRequestHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequestHeaders")
            .field("bearer_token", &"<redacted>")
            .field("signature", &self.signature)
            .field("nonce", &self.nonce)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
