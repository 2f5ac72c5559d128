//! # HMAC Transaction Signer
//!
//! Reference signer for in-process clusters. Every validator's key is
//! derived from one cluster secret as `HMAC-SHA256(secret, validator_id)`,
//! so any node can verify any other node's signature without a PKI.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared_types::{Signature, TransactionSigner, ValidatorId};
use std::collections::HashMap;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Per-validator keys derived from the cluster secret.
pub struct Keyring {
    keys: HashMap<ValidatorId, Vec<u8>>,
}

impl Keyring {
    pub fn derive(secret: &[u8], validators: &[ValidatorId]) -> Self {
        let keys = validators
            .iter()
            .map(|v| (v.clone(), mac(secret, v.as_str().as_bytes())))
            .collect();
        Self { keys }
    }

    pub fn key(&self, validator: &ValidatorId) -> Option<&[u8]> {
        self.keys.get(validator).map(Vec::as_slice)
    }
}

fn mac(key: &[u8], payload: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so this cannot fail.
    match HmacSha256::new_from_slice(key) {
        Ok(mut m) => {
            m.update(payload);
            m.finalize().into_bytes().to_vec()
        }
        Err(_) => Vec::new(),
    }
}

pub struct HmacSigner {
    local: ValidatorId,
    keyring: Arc<Keyring>,
}

impl HmacSigner {
    pub fn new(local: ValidatorId, keyring: Arc<Keyring>) -> Self {
        Self { local, keyring }
    }
}

impl TransactionSigner for HmacSigner {
    fn sign(&self, payload: &[u8]) -> Signature {
        let bytes = self
            .keyring
            .key(&self.local)
            .map(|key| mac(key, payload))
            .unwrap_or_default();
        Signature {
            signer: self.local.clone(),
            bytes,
        }
    }

    fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        let Some(key) = self.keyring.key(&signature.signer) else {
            return false;
        };
        let Ok(mut m) = HmacSha256::new_from_slice(key) else {
            return false;
        };
        m.update(payload);
        // Constant-time comparison.
        m.verify_slice(&signature.bytes).is_ok()
    }
}
