//! Resolving the calling principal from a signed request
//!
//! Operations never read an ambient "sender": the caller's principal is
//! resolved here first and then passed explicitly.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{OwnershipError, Principal, Result};

pub trait Authorizer {
    /// Resolve the principal that issued `request`.
    fn authorize(&self, request: &SignedRequest) -> Result<Principal>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedRequest {
    pub signer: [u8; 32],
    pub payload: Vec<u8>,
    pub signature: Vec<u8>, // signature over domain || payload
}

impl SignedRequest {
    pub fn sign(key: &SigningKey, domain: &[u8], payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let signature = key.sign(&signing_bytes(domain, &payload));
        Self {
            signer: key.verifying_key().to_bytes(),
            payload,
            signature: signature.to_bytes().to_vec(),
        }
    }
}

fn signing_bytes(domain: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4 + domain.len() + payload.len());
    bytes.extend_from_slice(&(domain.len() as u32).to_le_bytes());
    bytes.extend_from_slice(domain);
    bytes.extend_from_slice(payload);
    bytes
}

/// Accepts requests carrying a valid ed25519 signature under `domain`.
#[derive(Clone, Debug)]
pub struct SignatureAuthorizer {
    domain: Vec<u8>,
}

impl SignatureAuthorizer {
    pub fn new(domain: impl Into<Vec<u8>>) -> Self {
        Self { domain: domain.into() }
    }
}

impl Authorizer for SignatureAuthorizer {
    fn authorize(&self, request: &SignedRequest) -> Result<Principal> {
        let vk = VerifyingKey::from_bytes(&request.signer).map_err(|_| OwnershipError::InvalidSignature)?;
        let sig = Signature::from_slice(&request.signature).map_err(|_| OwnershipError::InvalidSignature)?;
        vk.verify(&signing_bytes(&self.domain, &request.payload), &sig)
            .map_err(|_| OwnershipError::InvalidSignature)?;
        Ok(Principal::from(vk))
    }
}
