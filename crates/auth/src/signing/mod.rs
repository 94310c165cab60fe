//! Signer primitives shared by the assertion and the request signature.

mod signature;
mod token;

pub use signature::{compute_signature, verify_signature};
pub use token::{JWT_ALGORITHM, sign_token, verify_token};

/// Digest name carried as the last canonical field and in `X-Brad-Algorithm`.
pub const SIGNATURE_ALGORITHM: &str = "SHA256";
