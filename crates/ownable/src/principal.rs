use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use vstate::Hash32;

/// An identity that can be authorized for an operation: the bytes of an
/// ed25519 public key. The all-zero value is the empty principal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub Hash32);

impl Principal {
    pub const EMPTY: Principal = Principal([0u8; 32]);

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }
}

impl From<VerifyingKey> for Principal {
    fn from(vk: VerifyingKey) -> Self {
        Principal(vk.to_bytes())
    }
}

impl From<&VerifyingKey> for Principal {
    fn from(vk: &VerifyingKey) -> Self {
        Principal(vk.to_bytes())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identity check: `caller` must be exactly `expected`.
pub fn require_principal(caller: Principal, expected: Principal) -> crate::Result<()> {
    if caller.is_empty() || caller != expected {
        return Err(crate::OwnershipError::Unauthorized);
    }
    Ok(())
}
