/// Failure while producing an assertion or a request signature.
///
/// Every variant is a configuration or environment defect; none of them is
/// transient, so callers should not retry.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Credential for {holder} has no usable private key")]
    MissingPrivateKey { holder: String },
    #[error("Key is incompatible with RSA/SHA-256/PKCS#1 v1.5: {0}")]
    IncompatibleKey(String),
    #[error("Failed to serialize token segment: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to decode key material: {0}")]
    KeyDecoding(String),
    #[error("Nonce derived from issued-at {0} does not fit in 18 digits")]
    NonceOutOfRange(i64),
}

/// Failure while checking a signature or a compact token against a public key.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Signature does not match")]
    BadSignature,
    #[error("Unexpected token algorithm: {0}")]
    UnexpectedAlgorithm(String),
    #[error("Failed to parse token claims: {0}")]
    Claims(#[from] serde_json::Error),
}
