//! Configuration for the invitation lifecycle.

use crate::crypto::{DEFAULT_HASH_COST, DEFAULT_TOKEN_LENGTH};

/// Tunables for invite issuance.
///
/// # Example
///
/// ```rust
/// use terrace::InviteConfig;
///
/// // defaults: 7 day expiry, 32 character tokens, bcrypt cost 8
/// let config = InviteConfig::default();
///
/// // or customize
/// let config = InviteConfig {
///     expiry_days: 14,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct InviteConfig {
    /// Number of days until an invitation expires. Default: 7
    pub expiry_days: i64,
    /// Length of generated invite tokens in characters. Default: 32
    pub token_length: usize,
    /// bcrypt cost factor for stored token hashes. Default: 8
    pub hash_cost: u32,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            token_length: DEFAULT_TOKEN_LENGTH,
            hash_cost: DEFAULT_HASH_COST,
        }
    }
}
