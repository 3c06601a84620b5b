//! The `eth_getTransactionByHash` result object.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Deserialize;
use thiserror::Error;

use chainwatch_core::{AccessListItem, TransactionRecord, TxSignature};

/// A transaction as returned by `eth_getTransactionByHash`.
///
/// Quantities arrive as `0x`-prefixed hex strings; fields that only exist on
/// some transaction types are optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    pub nonce: U256,
    pub gas: U256,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_fee_per_blob_gas: Option<U256>,
    pub value: U256,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default, rename = "type")]
    pub tx_type: Option<U256>,
    #[serde(default)]
    pub chain_id: Option<U256>,
    #[serde(default)]
    pub access_list: Option<Vec<AccessListItem>>,
    #[serde(default)]
    pub blob_versioned_hashes: Option<Vec<B256>>,
    pub v: U256,
    pub r: U256,
    pub s: U256,
    #[serde(default)]
    pub y_parity: Option<U256>,
}

/// A field did not fit the range its type allows.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("field '{field}' out of range: {value}")]
pub struct TxParseError {
    pub field: &'static str,
    pub value: U256,
}

fn narrow<T: TryFrom<U256>>(field: &'static str, value: U256) -> Result<T, TxParseError> {
    T::try_from(value).map_err(|_| TxParseError { field, value })
}

impl RpcTransaction {
    /// `true` while the transaction has not been included in a block.
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }

    /// Convert into the pipeline's record type.
    pub fn into_record(self) -> Result<TransactionRecord, TxParseError> {
        let pending = self.is_pending();
        let tx_type = match self.tx_type {
            Some(t) => narrow::<u8>("type", t)?,
            None => 0,
        };
        let chain_id = self
            .chain_id
            .map(|c| narrow::<u64>("chainId", c))
            .transpose()?;
        let y_parity = self
            .y_parity
            .map(|p| narrow::<u8>("yParity", p))
            .transpose()?;

        Ok(TransactionRecord {
            hash: self.hash,
            tx_type,
            chain_id,
            nonce: narrow("nonce", self.nonce)?,
            gas_limit: narrow("gas", self.gas)?,
            to: self.to,
            value: self.value,
            input: self.input,
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            max_fee_per_blob_gas: self.max_fee_per_blob_gas,
            access_list: self.access_list.unwrap_or_default(),
            blob_versioned_hashes: self.blob_versioned_hashes.unwrap_or_default(),
            signature: TxSignature {
                v: narrow("v", self.v)?,
                y_parity,
                r: self.r,
                s: self.s,
            },
            reported_from: self.from,
            pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PENDING_1559: &str = r#"{
        "blockHash": null,
        "blockNumber": null,
        "from": "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f",
        "gas": "0x5208",
        "gasPrice": "0x6fc23ac00",
        "maxFeePerGas": "0x6fc23ac00",
        "maxPriorityFeePerGas": "0x3b9aca00",
        "hash": "0x3333333333333333333333333333333333333333333333333333333333333333",
        "input": "0x",
        "nonce": "0x9",
        "to": "0x3535353535353535353535353535353535353535",
        "transactionIndex": null,
        "value": "0x1bc16d674ec80000",
        "type": "0x2",
        "accessList": [],
        "chainId": "0x1",
        "v": "0x1",
        "r": "0x28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
        "s": "0x67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83",
        "yParity": "0x1"
    }"#;

    #[test]
    fn decode_pending_eip1559() {
        let tx: RpcTransaction = serde_json::from_str(PENDING_1559).unwrap();
        assert!(tx.is_pending());
        let rec = tx.into_record().unwrap();
        assert_eq!(rec.tx_type, 2);
        assert_eq!(rec.chain_id, Some(1));
        assert_eq!(rec.nonce, 9);
        assert_eq!(rec.gas_limit, 21_000);
        assert_eq!(rec.value, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(rec.price_per_gas(), U256::from(30_000_000_000u64));
        assert_eq!(rec.signature.y_parity, Some(1));
        assert!(rec.pending);
        assert_eq!(rec.to, Some(Address::repeat_byte(0x35)));
    }

    #[test]
    fn decode_mined_contract_creation() {
        let json = PENDING_1559
            .replace(r#""blockNumber": null"#, r#""blockNumber": "0x10""#)
            .replace(r#""to": "0x3535353535353535353535353535353535353535""#, r#""to": null"#);
        let tx: RpcTransaction = serde_json::from_str(&json).unwrap();
        assert!(!tx.is_pending());
        let rec = tx.into_record().unwrap();
        assert!(!rec.pending);
        assert!(rec.is_contract_creation());
    }

    #[test]
    fn oversized_type_is_rejected() {
        let json = PENDING_1559.replace(r#""type": "0x2""#, r#""type": "0x1ff""#);
        let tx: RpcTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(
            tx.into_record().unwrap_err(),
            TxParseError {
                field: "type",
                value: U256::from(0x1ffu64)
            }
        );
    }
}
