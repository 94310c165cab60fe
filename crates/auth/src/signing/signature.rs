use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;

use crate::credential::Credential;
use crate::error::{SigningError, VerifyError};

/// Sign `message` with RSA/SHA-256/PKCS#1 v1.5 and return the signature as
/// standard, padded base64.
///
/// The message is taken as ASCII: every UTF-16 code unit of a non-ASCII
/// character is signed as `?`, so characters outside the BMP become `??`.
/// This is how the bank's reference clients encode the canonical string.
pub fn compute_signature<C>(message: &str, credential: &C) -> Result<String, SigningError>
where
    C: Credential + ?Sized,
{
    let signature = credential.sign_pkcs1v15_sha256(&ascii_bytes(message))?;
    Ok(STANDARD.encode(signature))
}

/// Check a signature produced by [`compute_signature`], or its URL-safe form,
/// against `message`.
pub fn verify_signature(
    message: &str,
    signature_b64: &str,
    public_key: &RsaPublicKey,
) -> Result<(), VerifyError> {
    let signature_bytes = decode_signature(signature_b64)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| VerifyError::BadSignature)?;

    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(&ascii_bytes(message), &signature)
        .map_err(|_| VerifyError::BadSignature)
}

fn decode_signature(signature_b64: &str) -> Result<Vec<u8>, VerifyError> {
    let normalized = signature_b64
        .trim()
        .trim_end_matches('=')
        .replace('-', "+")
        .replace('_', "/");
    Ok(STANDARD_NO_PAD.decode(normalized)?)
}

pub(crate) fn ascii_bytes(message: &str) -> Cow<'_, [u8]> {
    if message.is_ascii() {
        Cow::Borrowed(message.as_bytes())
    } else {
        let mut bytes = Vec::with_capacity(message.len());
        for c in message.chars() {
            if c.is_ascii() {
                bytes.push(c as u8);
            } else {
                bytes.extend(std::iter::repeat_n(b'?', c.len_utf16()));
            }
        }
        Cow::Owned(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::fixtures::{public_only_credential, test_credential};

    #[test]
    fn signature_is_padded_standard_base64() {
        let signature = compute_signature("hello", test_credential()).unwrap();
        // 256 bytes encode to 344 characters, the last two being padding.
        assert_eq!(signature.len(), 344);
        assert!(signature.ends_with("=="));
        assert!(STANDARD.decode(&signature).is_ok());
    }

    #[test]
    fn signature_verifies() {
        let credential = test_credential();
        let signature = compute_signature("verify me", credential).unwrap();
        verify_signature("verify me", &signature, credential.public_key()).unwrap();
    }

    #[test]
    fn signature_rejects_other_message() {
        let credential = test_credential();
        let signature = compute_signature("original", credential).unwrap();
        let err = verify_signature("tampered", &signature, credential.public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::BadSignature));
    }

    #[test]
    fn url_safe_form_also_verifies() {
        let credential = test_credential();
        let signature = compute_signature("url safe", credential).unwrap();
        let url_safe = signature.replace('=', "").replace('+', "-").replace('/', "_");
        verify_signature("url safe", &url_safe, credential.public_key()).unwrap();
    }

    #[test]
    fn non_ascii_is_signed_as_question_mark() {
        let credential = test_credential();
        let accented = compute_signature("pagamento à vista", credential).unwrap();
        let replaced = compute_signature("pagamento ? vista", credential).unwrap();
        assert_eq!(accented, replaced);
    }

    #[test]
    fn astral_characters_become_two_question_marks() {
        assert_eq!(ascii_bytes("a\u{1F600}b").as_ref(), b"a??b");
        assert_eq!(ascii_bytes("\u{E0}\u{1F600}").as_ref(), b"???");
        assert_eq!(ascii_bytes("plain").as_ref(), b"plain");
    }

    #[test]
    fn emoji_body_signs_like_its_utf16_replacement() {
        let credential = test_credential();
        let emoji = compute_signature("{\"obs\":\"\u{1F600}\"}", credential).unwrap();
        let replaced = compute_signature("{\"obs\":\"??\"}", credential).unwrap();
        assert_eq!(emoji, replaced);
    }

    #[test]
    fn missing_private_key_produces_no_output() {
        let err = compute_signature("data", &public_only_credential()).unwrap_err();
        assert!(matches!(err, SigningError::MissingPrivateKey { .. }));
    }

    #[test]
    fn works_through_trait_object() {
        let credential: &dyn Credential = test_credential();
        let signature = compute_signature("dyn", credential).unwrap();
        verify_signature("dyn", &signature, test_credential().public_key()).unwrap();
    }

    #[test]
    fn garbage_signature_is_an_encoding_error() {
        let err = verify_signature("m", "***", test_credential().public_key()).unwrap_err();
        assert!(matches!(err, VerifyError::Encoding(_)));
    }
}
