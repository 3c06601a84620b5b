//! Signing payloads for the transaction types a mempool can carry.
//!
//! | type | payload                                                                              |
//! |------|--------------------------------------------------------------------------------------|
//! | 0    | `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])` (EIP-155) or the first six fields |
//! | 1    | `0x01 ‖ rlp([chainId, nonce, gasPrice, gas, to, value, data, accessList])`            |
//! | 2    | `0x02 ‖ rlp([chainId, nonce, tip, maxFee, gas, to, value, data, accessList])`         |
//! | 3    | `0x03 ‖ rlp([... type 2 fields ..., maxFeePerBlobGas, blobVersionedHashes])`          |

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::{BufMut, Encodable, Header, EMPTY_STRING_CODE};

use chainwatch_core::{DeriveError, TransactionRecord};

/// Everything needed to recover a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningData {
    /// Bytes whose keccak-256 was signed.
    pub payload: Vec<u8>,
    /// secp256k1 recovery id (0 or 1).
    pub recovery_id: u8,
    /// Chain id committed to by the signature; `None` for pre-EIP-155.
    pub chain_id: Option<u64>,
}

/// Receiver field: 20 bytes, or the empty string for contract creation.
struct Receiver(Option<Address>);

impl Encodable for Receiver {
    fn encode(&self, out: &mut dyn BufMut) {
        match &self.0 {
            Some(addr) => addr.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match &self.0 {
            Some(addr) => addr.length(),
            None => 1,
        }
    }
}

fn rlp_list(fields: &[&dyn Encodable], out: &mut Vec<u8>) {
    let payload_length = fields.iter().map(|f| f.length()).sum();
    out.reserve(payload_length + alloy_rlp::length_of_length(payload_length));
    Header {
        list: true,
        payload_length,
    }
    .encode(out);
    for field in fields {
        field.encode(out);
    }
}

fn required(value: Option<U256>, name: &'static str) -> Result<U256, DeriveError> {
    value.ok_or(DeriveError::MissingField(name))
}

/// Split a legacy `v` into (chain id, recovery id).
fn legacy_v(v: u64) -> Result<(Option<u64>, u8), DeriveError> {
    match v {
        27 | 28 => Ok((None, (v - 27) as u8)),
        v if v >= 35 => Ok((Some((v - 35) / 2), ((v - 35) % 2) as u8)),
        other => Err(DeriveError::InvalidRecoveryId(other)),
    }
}

fn typed_parity(record: &TransactionRecord) -> Result<u8, DeriveError> {
    let sig = &record.signature;
    let parity = sig.y_parity.map(u64::from).unwrap_or(sig.v);
    match parity {
        0 | 1 => Ok(parity as u8),
        other => Err(DeriveError::InvalidRecoveryId(other)),
    }
}

/// Build the signing payload and recovery parameters for `record`.
pub fn signing_payload(record: &TransactionRecord) -> Result<SigningData, DeriveError> {
    let to = Receiver(record.to);
    let mut payload = Vec::new();

    match record.tx_type {
        0 => {
            let gas_price = required(record.gas_price, "gasPrice")?;
            let (chain_id, recovery_id) = legacy_v(record.signature.v)?;
            match chain_id {
                Some(id) => rlp_list(
                    &[
                        &record.nonce,
                        &gas_price,
                        &record.gas_limit,
                        &to,
                        &record.value,
                        &record.input,
                        &id,
                        &0u8,
                        &0u8,
                    ],
                    &mut payload,
                ),
                None => rlp_list(
                    &[
                        &record.nonce,
                        &gas_price,
                        &record.gas_limit,
                        &to,
                        &record.value,
                        &record.input,
                    ],
                    &mut payload,
                ),
            }
            Ok(SigningData {
                payload,
                recovery_id,
                chain_id,
            })
        }
        1 => {
            let chain_id = record.chain_id.ok_or(DeriveError::MissingField("chainId"))?;
            let gas_price = required(record.gas_price, "gasPrice")?;
            payload.push(1);
            rlp_list(
                &[
                    &chain_id,
                    &record.nonce,
                    &gas_price,
                    &record.gas_limit,
                    &to,
                    &record.value,
                    &record.input,
                    &record.access_list,
                ],
                &mut payload,
            );
            Ok(SigningData {
                payload,
                recovery_id: typed_parity(record)?,
                chain_id: Some(chain_id),
            })
        }
        2 | 3 => {
            let chain_id = record.chain_id.ok_or(DeriveError::MissingField("chainId"))?;
            let tip = required(record.max_priority_fee_per_gas, "maxPriorityFeePerGas")?;
            let max_fee = required(record.max_fee_per_gas, "maxFeePerGas")?;
            payload.push(record.tx_type);
            if record.tx_type == 2 {
                rlp_list(
                    &[
                        &chain_id,
                        &record.nonce,
                        &tip,
                        &max_fee,
                        &record.gas_limit,
                        &to,
                        &record.value,
                        &record.input,
                        &record.access_list,
                    ],
                    &mut payload,
                );
            } else {
                let blob_fee = required(record.max_fee_per_blob_gas, "maxFeePerBlobGas")?;
                rlp_list(
                    &[
                        &chain_id,
                        &record.nonce,
                        &tip,
                        &max_fee,
                        &record.gas_limit,
                        &to,
                        &record.value,
                        &record.input,
                        &record.access_list,
                        &blob_fee,
                        &record.blob_versioned_hashes,
                    ],
                    &mut payload,
                );
            }
            Ok(SigningData {
                payload,
                recovery_id: typed_parity(record)?,
                chain_id: Some(chain_id),
            })
        }
        other => Err(DeriveError::UnsupportedType(other)),
    }
}

/// keccak-256 of the signing payload.
pub fn signature_hash(record: &TransactionRecord) -> Result<B256, DeriveError> {
    signing_payload(record).map(|data| keccak256(&data.payload))
}
