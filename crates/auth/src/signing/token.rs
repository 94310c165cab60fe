//! Compact RS256 signed tokens (`header.payload.signature`).
//!
//! Segments are base64url without padding. No encryption layer is applied.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::credential::Credential;
use crate::error::{SigningError, VerifyError};

pub const JWT_ALGORITHM: &str = "RS256";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn rs256() -> Self {
        Self {
            alg: JWT_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Serialize `claims` and sign them as a compact RS256 token.
///
/// Claims are emitted in the order their `Serialize` impl yields them, so a
/// struct keeps its declaration order.
pub fn sign_token<T, C>(claims: &T, credential: &C) -> Result<String, SigningError>
where
    T: Serialize + ?Sized,
    C: Credential + ?Sized,
{
    let header_json = serde_json::to_string(&TokenHeader::rs256())?;
    let payload_json = serde_json::to_string(claims)?;

    tracing::debug!(holder = credential.holder(), payload = %payload_json, "signing token");

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let signature = credential.sign_pkcs1v15_sha256(signing_input.as_bytes())?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Check a compact RS256 token against `public_key` and return its claims.
///
/// Only the signature and algorithm are checked; expiry is left to the caller.
pub fn verify_token<T>(token: &str, public_key: &RsaPublicKey) -> Result<T, VerifyError>
where
    T: DeserializeOwned,
{
    let mut segments = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(VerifyError::Malformed("expected three segments".into()));
    };

    let header: TokenHeader = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64)?)?;
    if header.alg != JWT_ALGORITHM {
        return Err(VerifyError::UnexpectedAlgorithm(header.alg));
    }

    let signature_bytes = URL_SAFE_NO_PAD.decode(signature_b64)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| VerifyError::BadSignature)?;
    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];

    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| VerifyError::BadSignature)?;

    Ok(serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload_b64)?)?)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::credential::fixtures::{public_only_credential, test_credential};

    fn decode_segment(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn token_has_three_unpadded_segments() {
        let token = sign_token(&json!({"sub": "client"}), test_credential()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| !p.contains(['=', '+', '/'])));
        assert!(token.starts_with("eyJ"));
    }

    #[test]
    fn header_is_rs256_jwt() {
        let token = sign_token(&json!({}), test_credential()).unwrap();
        let header_b64 = token.split('.').next().unwrap();
        let header_json = URL_SAFE_NO_PAD.decode(header_b64).unwrap();
        assert_eq!(header_json, br#"{"alg":"RS256","typ":"JWT"}"#);
    }

    #[test]
    fn payload_keeps_struct_field_order() {
        #[derive(Serialize)]
        struct Ordered {
            zeta: u8,
            alpha: u8,
        }

        let token = sign_token(&Ordered { zeta: 1, alpha: 2 }, test_credential()).unwrap();
        let payload_b64 = token.split('.').nth(1).unwrap();
        let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        assert_eq!(payload_json, br#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn round_trip_returns_claims() {
        let claims = json!({"sub": "client", "iat": 1_704_067_200});
        let credential = test_credential();
        let token = sign_token(&claims, credential).unwrap();

        let payload = decode_segment(token.split('.').nth(1).unwrap());
        assert_eq!(payload, claims);

        let verified: Value = verify_token(&token, credential.public_key()).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let credential = test_credential();
        let token = sign_token(&json!({"sub": "client"}), credential).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"mallory"}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        let err = verify_token::<Value>(&forged, credential.public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::BadSignature));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        let token = format!("{header}.{payload}.");

        let err = verify_token::<Value>(&token, test_credential().public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::UnexpectedAlgorithm(alg) if alg == "none"));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let err = verify_token::<Value>("a.b", test_credential().public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));

        let err = verify_token::<Value>("a.b.c.d", test_credential().public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn missing_private_key_produces_no_token() {
        let err = sign_token(&json!({}), &public_only_credential()).unwrap_err();
        assert!(matches!(err, SigningError::MissingPrivateKey { .. }));
    }
}
