//! Invite token generation and hashing.
//!
//! Tokens are opaque random strings handed to the invitee out of band and
//! stored only as a bcrypt hash. Because bcrypt hashes are salted, a stored
//! hash cannot be looked up by token; acceptance verifies the presented
//! token against each candidate invite instead (see
//! [`invites::actions`](crate::invites::actions)).

use crate::AccessError;

/// Default token length in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Default bcrypt cost factor for invite token hashes.
///
/// Invite tokens are high-entropy random strings, not passwords, so a low
/// cost keeps the per-candidate comparison loop in `accept` affordable.
pub const DEFAULT_HASH_COST: u32 = 8;

/// Generates a cryptographically secure random token.
///
/// The token consists of alphanumeric characters (a-z, A-Z, 0-9),
/// providing approximately 5.95 bits of entropy per character.
///
/// # Example
///
/// ```rust
/// use terrace::crypto::generate_token;
///
/// let token = generate_token(32);
/// assert_eq!(token.len(), 32);
/// ```
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Generates a token with the default length (32 characters).
pub fn generate_token_default() -> String {
    generate_token(DEFAULT_TOKEN_LENGTH)
}

/// Hashes an invite token with bcrypt at the given cost factor.
///
/// Only the hash is ever stored; the raw token is returned to the caller
/// once and cannot be recovered afterwards.
///
/// # Errors
///
/// Returns `AccessError::Internal` if hashing fails (invalid cost factor).
pub fn hash_invite_token(token: &str, cost: u32) -> Result<String, AccessError> {
    bcrypt::hash(token, cost).map_err(|e| AccessError::Internal(format!("token hash failed: {e}")))
}

/// Verifies a raw invite token against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch rather than an error; the
/// caller treats it the same as a wrong token.
pub fn verify_invite_token(token: &str, hash: &str) -> bool {
    bcrypt::verify(token, hash).unwrap_or(false)
}
