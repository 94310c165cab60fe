use std::fmt;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::SigningError;

/// Smallest modulus the protocol accepts for RS256 and `X-Brad-Signature`.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Identity material able to sign on behalf of a holder.
///
/// Implementations are sync; signing is CPU-bound. Backends that keep the
/// private key elsewhere (HSM, KMS) implement this and never expose it.
pub trait Credential: Send + Sync {
    /// Name of the entity the credential belongs to.
    fn holder(&self) -> &str;

    /// Sign `data` with RSA PKCS#1 v1.5 over a SHA-256 digest. Returns raw signature bytes.
    fn sign_pkcs1v15_sha256(&self, data: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// RSA key pair held in memory, optionally without its private half.
pub struct RsaCredential {
    holder: String,
    signing_key: Option<SigningKey<Sha256>>,
    public_key: RsaPublicKey,
}

impl RsaCredential {
    pub fn from_private_key(holder: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            holder: holder.into(),
            signing_key: Some(SigningKey::<Sha256>::new(private_key)),
            public_key,
        }
    }

    /// Load a `BEGIN PRIVATE KEY` document.
    pub fn from_pkcs8_pem(holder: impl Into<String>, pem: &str) -> Result<Self, SigningError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| SigningError::KeyDecoding(format!("PKCS#8: {e}")))?;
        Ok(Self::from_private_key(holder, private_key))
    }

    /// Load a `BEGIN RSA PRIVATE KEY` document.
    pub fn from_pkcs1_pem(holder: impl Into<String>, pem: &str) -> Result<Self, SigningError> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| SigningError::KeyDecoding(format!("PKCS#1: {e}")))?;
        Ok(Self::from_private_key(holder, private_key))
    }

    /// Load a private key in either PKCS#8 or PKCS#1 PEM encoding.
    pub fn from_pem(holder: impl Into<String>, pem: &str) -> Result<Self, SigningError> {
        let holder = holder.into();
        if pem.contains("BEGIN RSA PRIVATE KEY") {
            Self::from_pkcs1_pem(holder, pem)
        } else {
            Self::from_pkcs8_pem(holder, pem)
        }
    }

    /// Verification-only credential. Every signing attempt fails with
    /// [`SigningError::MissingPrivateKey`].
    pub fn from_public_key_pem(holder: impl Into<String>, pem: &str) -> Result<Self, SigningError> {
        let public_key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| SigningError::KeyDecoding(format!("SPKI: {e}")))?;
        Ok(Self::public_only(holder, public_key))
    }

    pub fn public_only(holder: impl Into<String>, public_key: RsaPublicKey) -> Self {
        Self {
            holder: holder.into(),
            signing_key: None,
            public_key,
        }
    }

    /// Derive a key pair from a seed string.
    ///
    /// The SHA-256 hash of the seed seeds a deterministic CSPRNG used for RSA
    /// key generation. Meant for fixtures and sandbox setups, never for
    /// credentials registered with the bank.
    pub fn from_seed(
        holder: impl Into<String>,
        seed: &str,
        bits: usize,
    ) -> Result<Self, SigningError> {
        let hash = Sha256::digest(seed.as_bytes());
        let mut rng = ChaCha20Rng::from_seed(hash.into());
        let private_key = RsaPrivateKey::new(&mut rng, bits).map_err(|e| {
            SigningError::IncompatibleKey(format!("generating RSA key from seed: {e}"))
        })?;
        Ok(Self::from_private_key(holder, private_key))
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// DER-encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<Vec<u8>, SigningError> {
        self.public_key
            .to_public_key_der()
            .map(|document| document.into_vec())
            .map_err(|e| SigningError::KeyDecoding(format!("encoding public key: {e}")))
    }

    pub fn key_bits(&self) -> usize {
        self.public_key.size() * 8
    }

    pub fn has_private_key(&self) -> bool {
        self.signing_key.is_some()
    }
}

impl Credential for RsaCredential {
    fn holder(&self) -> &str {
        &self.holder
    }

    fn sign_pkcs1v15_sha256(&self, data: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signing_key = self.signing_key.as_ref().ok_or_else(|| SigningError::MissingPrivateKey {
            holder: self.holder.clone(),
        })?;

        let bits = self.key_bits();
        if bits < MIN_RSA_KEY_BITS {
            return Err(SigningError::IncompatibleKey(format!(
                "{bits}-bit modulus is below the {MIN_RSA_KEY_BITS}-bit minimum"
            )));
        }

        let signature = signing_key
            .try_sign(data)
            .map_err(|e| SigningError::IncompatibleKey(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

impl fmt::Debug for RsaCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaCredential")
            .field("holder", &self.holder)
            .field("key_bits", &self.key_bits())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}
