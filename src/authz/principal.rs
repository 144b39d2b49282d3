use serde::{Deserialize, Serialize};

/// The authenticated caller.
///
/// Built by the transport layer from its session or token state and passed
/// explicitly into every operation; this crate never reads identity out of
/// ambient request state. The email is the one the account was registered
/// with and is what invite matching compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The caller's user id.
    pub id: i64,
    /// The caller's account email.
    pub email: String,
}

impl Principal {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
