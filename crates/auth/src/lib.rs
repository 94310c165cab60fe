pub mod assertion;
pub mod clock;
pub mod credential;
pub mod error;
pub mod request_signature;
pub mod signing;

pub use assertion::{AssertionBuilder, AssertionClaims, SignedAssertion, create_assertion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use credential::{Credential, RsaCredential};
pub use error::{SigningError, VerifyError};
pub use request_signature::{CanonicalRequest, SignedRequestHeaders, create_request_signature};
pub use signing::{compute_signature, sign_token, verify_signature, verify_token};
