//! Node-shaped fixtures run through enrichment and sender recovery.
//!
//! Each fixture is the JSON a node returns for `eth_getTransactionByHash`;
//! the recovered sender must match the node-reported `from`.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};

use chainwatch_core::{
    units, EnrichmentClient, FetchResult, JsonRpcRequest, JsonRpcResponse, RpcTransport,
    SenderRecovery, TransportError, TxHash,
};
use chainwatch_evm::{
    address_from_key, signature_hash, EvmSenderRecovery, RpcEnrichmentClient, RpcTransaction,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Transport that always answers with one fixed transaction object.
struct Fixture(Value);

#[async_trait]
impl RpcTransport for Fixture {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        Ok(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: req.id,
            result: Some(self.0.clone()),
            error: None,
        })
    }

    fn url(&self) -> &str {
        "fixture://"
    }
}

/// The signed example transaction from EIP-155, as a mainnet node reports it.
fn eip155_fixture() -> Value {
    json!({
        "blockHash": null,
        "blockNumber": null,
        "transactionIndex": null,
        "hash": "0x33469b22e9f636356c4160a87eb19df52b7412e8eac32a4a55ffe88ea8350788",
        "from": "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f",
        "to": "0x3535353535353535353535353535353535353535",
        "gas": "0x5208",
        "gasPrice": "0x4a817c800",
        "input": "0x",
        "nonce": "0x9",
        "value": "0xde0b6b3a7640000",
        "type": "0x0",
        "chainId": "0x1",
        "v": "0x25",
        "r": "0x28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
        "s": "0x67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
    })
}

fn found(result: FetchResult) -> chainwatch_core::TransactionRecord {
    match result {
        FetchResult::Found(rec) => rec,
        FetchResult::NotAvailable(reason) => panic!("fixture not available: {reason}"),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn eip155_fixture_recovers_reported_sender() {
    let client = RpcEnrichmentClient::new(Fixture(eip155_fixture()));
    let rec = found(client.fetch_detail(TxHash::ZERO).await);

    let sender = EvmSenderRecovery::new(1).recover_sender(&rec).unwrap();
    assert_eq!(Some(sender), rec.reported_from);
    assert_eq!(
        sender,
        "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F"
            .parse::<Address>()
            .unwrap()
    );

    assert_eq!(units::format_ether(rec.value), "1.0000");
    assert_eq!(units::format_gwei(rec.price_per_gas()), "20.00");
}

#[tokio::test]
async fn eip1559_fixture_recovers_reported_sender() {
    let key = SigningKey::from_slice(&[0x11; 32]).unwrap();
    let from = address_from_key(key.verifying_key());

    let mut fixture = json!({
        "blockNumber": null,
        "hash": "0x4444444444444444444444444444444444444444444444444444444444444444",
        "from": from,
        "to": null,
        "gas": "0x30d40",
        "maxFeePerGas": "0x6fc23ac00",
        "maxPriorityFeePerGas": "0x3b9aca00",
        "gasPrice": "0x6fc23ac00",
        "input": "0x6080604052",
        "nonce": "0x0",
        "value": "0x0",
        "type": "0x2",
        "chainId": "0x89",
        "accessList": [{
            "address": "0x0000000000000000000000000000000000000001",
            "storageKeys": ["0x0000000000000000000000000000000000000000000000000000000000000001"]
        }],
        "v": "0x0",
        "r": "0x1",
        "s": "0x1",
        "yParity": "0x0"
    });

    // Sign the fixture's own payload, then patch the signature in.
    let unsigned: RpcTransaction = serde_json::from_value(fixture.clone()).unwrap();
    let hash = signature_hash(&unsigned.into_record().unwrap()).unwrap();
    let (sig, recid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
    let (r, s) = sig.split_bytes();
    fixture["r"] = json!(U256::from_be_slice(&r));
    fixture["s"] = json!(U256::from_be_slice(&s));
    fixture["v"] = json!(format!("0x{:x}", recid.to_byte()));
    fixture["yParity"] = json!(format!("0x{:x}", recid.to_byte()));

    let client = RpcEnrichmentClient::new(Fixture(fixture));
    let rec = found(client.fetch_detail(TxHash::ZERO).await);
    assert!(rec.is_contract_creation());

    let sender = EvmSenderRecovery::new(137).recover_sender(&rec).unwrap();
    assert_eq!(sender, from);

    assert!(EvmSenderRecovery::new(1).recover_sender(&rec).is_err());
}
