//! secp256k1 sender recovery.

use alloy_primitives::{keccak256, Address, B256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use chainwatch_core::{DeriveError, SenderRecovery, TransactionRecord};

use crate::signing::signing_payload;

/// Ethereum address of an uncompressed public key.
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag.
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the signer of `prehash` from `(r, s, recovery_id)`.
pub fn recover_address(
    prehash: &B256,
    r: U256,
    s: U256,
    recovery_id: u8,
) -> Result<Address, DeriveError> {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&r.to_be_bytes::<32>());
    bytes[32..].copy_from_slice(&s.to_be_bytes::<32>());

    let sig = Signature::from_slice(&bytes).map_err(|_| DeriveError::MalformedSignature)?;
    let recid = RecoveryId::from_byte(recovery_id)
        .ok_or(DeriveError::InvalidRecoveryId(recovery_id as u64))?;
    let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &sig, recid)
        .map_err(|_| DeriveError::RecoveryFailed)?;
    Ok(address_from_key(&key))
}

/// Recovers transaction senders for a single chain.
///
/// Signatures committing to another chain id are rejected; pre-EIP-155
/// legacy signatures carry no chain id and are accepted.
#[derive(Debug, Clone, Copy)]
pub struct EvmSenderRecovery {
    chain_id: u64,
}

impl EvmSenderRecovery {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

impl SenderRecovery for EvmSenderRecovery {
    fn recover_sender(&self, record: &TransactionRecord) -> Result<Address, DeriveError> {
        let data = signing_payload(record)?;
        if let Some(actual) = data.chain_id {
            if actual != self.chain_id {
                return Err(DeriveError::ChainIdMismatch {
                    expected: self.chain_id,
                    actual,
                });
            }
        }
        let prehash = keccak256(&data.payload);
        recover_address(
            &prehash,
            record.signature.r,
            record.signature.s,
            data.recovery_id,
        )
    }
}
