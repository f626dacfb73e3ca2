//! PKCE (RFC 7636) and CSRF nonce generation using `ring`.
//!
//! Only the S256 challenge method is offered; `plain` sends the secret itself.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::constant_time::verify_slices_are_equal;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

use super::types::AuthError;

/// Value of the `code_challenge_method` parameter.
pub const CODE_CHALLENGE_METHOD: &str = "S256";
/// Shortest verifier RFC 7636 allows.
pub const MIN_VERIFIER_LENGTH: usize = 43;
/// Longest verifier RFC 7636 allows.
pub const MAX_VERIFIER_LENGTH: usize = 128;
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;
pub const DEFAULT_STATE_LENGTH: usize = 32;

/// Draws enough random bytes to encode to at least `length` base64url
/// characters, then cuts the encoding to exactly `length`.
///
/// The byte count follows the output length (`ceil(length * 3 / 4)`), so at
/// most one trailing character is dropped.
fn random_url_safe(length: usize) -> Result<String, AuthError> {
    let mut buf = vec![0u8; (length * 3).div_ceil(4)];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| AuthError::RandomSource)?;
    let mut encoded = URL_SAFE_NO_PAD.encode(&buf);
    encoded.truncate(length);
    Ok(encoded)
}

/// Generates a code verifier of exactly `length` characters from `[A-Za-z0-9-_]`.
///
/// `length` is clamped into `[43, 128]`.
pub fn generate_code_verifier(length: usize) -> Result<String, AuthError> {
    random_url_safe(length.clamp(MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH))
}

/// Generate a PKCE code challenge from the given verifier using SHA-256 and base64url (no padding).
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = digest::digest(&digest::SHA256, verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash.as_ref())
}

/// Generates an opaque CSRF nonce of `length` URL-safe characters.
///
/// No RFC 7636 clamp applies here; a zero length yields an empty string,
/// which the callback check always rejects.
pub fn generate_state(length: usize) -> Result<String, AuthError> {
    random_url_safe(length)
}

/// Checks `challenge` against `verifier` in constant time.
pub fn verify_code_challenge(verifier: &str, challenge: &str) -> bool {
    constant_time_eq(&generate_code_challenge(verifier), challenge)
}

/// Constant-time string comparison for secrets (state, challenges).
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    verify_slices_are_equal(a.as_bytes(), b.as_bytes()).is_ok()
}

/// A fresh verifier together with its derived challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Kept by the client until the code exchange.
    pub verifier: String,
    /// Sent in the authorization URL.
    pub challenge: String,
}

impl PkcePair {
    pub fn generate(length: usize) -> Result<Self, AuthError> {
        let verifier = generate_code_verifier(length)?;
        let challenge = generate_code_challenge(&verifier);
        Ok(Self { verifier, challenge })
    }

    pub fn method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}
