//! Write operations against a scripted facade: key guard, nonce
//! sequencing, signing and broadcast.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use alloy_primitives::B256;
use common::{config, MockChain, KEY, KEY_ADDRESS, RECIPIENT};
use token_client::token_abi::{AbiValue, TokenFunction};
use token_client::{Address, ChainError, DecimalAmount, TokenClient, TokenError, U256};

fn amount(s: &str) -> DecimalAmount {
    s.parse().unwrap()
}

fn signer(chain: MockChain) -> TokenClient<MockChain> {
    TokenClient::new(config(), chain, Some(KEY)).unwrap()
}

// ─── Missing-key guard ────────────────────────────────────────────

#[test]
fn transfer_without_key_makes_no_network_calls() {
    let client = TokenClient::new(config(), MockChain::default(), None).unwrap();

    let err = client.transfer(RECIPIENT, &amount("100")).unwrap_err();
    assert!(matches!(err, TokenError::MissingKey(ref f) if f == "transfer"));

    let err = client.approve(RECIPIENT, &amount("100")).unwrap_err();
    assert!(matches!(err, TokenError::MissingKey(ref f) if f == "approve"));

    assert_eq!(client.chain().total_requests(), 0);
}

#[test]
fn missing_key_is_reported_before_address_validation() {
    let client = TokenClient::new(config(), MockChain::default(), None).unwrap();
    assert!(matches!(
        client.transfer("garbage", &amount("1")),
        Err(TokenError::MissingKey(_))
    ));
}

// ─── Local validation ─────────────────────────────────────────────

#[test]
fn invalid_recipient_makes_no_network_calls() {
    let client = signer(MockChain::default());
    assert!(matches!(
        client.transfer("0x1234", &amount("1")),
        Err(TokenError::InvalidAddress { .. })
    ));
    assert_eq!(client.chain().total_requests(), 0);
}

#[test]
fn negative_amount_makes_no_network_calls() {
    let client = signer(MockChain::default());
    assert!(matches!(
        client.transfer(RECIPIENT, &amount("-1.5")),
        Err(TokenError::NegativeAmount(_))
    ));
    assert_eq!(client.chain().total_requests(), 0);
}

#[test]
fn amount_beyond_uint256_is_a_precision_error() {
    let client = signer(MockChain::default());
    let huge = format!("1{}", "0".repeat(78));
    assert!(matches!(
        client.transfer(RECIPIENT, &amount(&huge)),
        Err(TokenError::Precision(_))
    ));
}

// ─── Transaction contents ─────────────────────────────────────────

#[test]
fn transfer_signs_and_broadcasts_expected_transaction() {
    let client = signer(MockChain::default());
    let submitted = client.transfer(RECIPIENT, &amount("100.0")).unwrap();

    let broadcasts = client.chain().broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let signed = &broadcasts[0];
    assert_eq!(signed, &submitted.signed);

    let tx = &signed.transaction;
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.gas_price, 3_000_000_000);
    assert_eq!(tx.gas_limit, 100_000);
    assert_eq!(tx.to, config().contract_address);
    assert_eq!(tx.value, U256::ZERO);
    assert_eq!(signed.chain_id, 56);
    assert!(signed.v == 147 || signed.v == 148);

    let args = client.codec().decode_call("transfer", &tx.data).unwrap();
    let recipient: Address = RECIPIENT.parse().unwrap();
    assert_eq!(
        args,
        vec![AbiValue::Address(recipient), AbiValue::Uint(U256::from(100_000_000u64))]
    );

    // The node reported no hash, so the local one is used.
    assert_eq!(submitted.hash, signed.hash);
    assert_eq!(submitted.nonce(), 5);
}

#[test]
fn approve_encodes_approve_call() {
    let client = signer(MockChain::default());
    let submitted = client.approve(RECIPIENT, &amount("0.5")).unwrap();

    let data = &submitted.signed.transaction.data;
    let selector = client.codec().descriptor(TokenFunction::Approve).selector();
    assert_eq!(&data[..4], &selector);
    assert_eq!(hex::encode(&data[..4]), "095ea7b3");

    let args = client.codec().decode_call("approve", data).unwrap();
    assert_eq!(args[1], AbiValue::Uint(U256::from(500_000u64)));
}

#[test]
fn fractional_digits_beyond_decimals_are_truncated() {
    let client = signer(MockChain::default());
    let submitted = client.transfer(RECIPIENT, &amount("1.23456789")).unwrap();

    let args = client
        .codec()
        .decode_call("transfer", &submitted.signed.transaction.data)
        .unwrap();
    assert_eq!(args[1], AbiValue::Uint(U256::from(1_234_567u64)));
}

#[test]
fn node_reported_hash_is_returned() {
    let reported = B256::repeat_byte(0xab);
    let client = signer(MockChain {
        reported_hash: Some(reported),
        ..MockChain::default()
    });

    let submitted = client.transfer(RECIPIENT, &amount("1")).unwrap();
    assert_eq!(submitted.hash, reported);
    assert_eq!(submitted.hash_hex(), format!("0x{}", "ab".repeat(32)));
}

#[test]
fn signer_address_matches_key() {
    let client = signer(MockChain::default());
    assert_eq!(client.address().unwrap().to_string(), KEY_ADDRESS);
}

// ─── Nonce sequencing ─────────────────────────────────────────────

#[test]
fn sequential_transfers_advance_past_stale_network_nonce() {
    let client = signer(MockChain::default());

    let first = client.transfer(RECIPIENT, &amount("1")).unwrap();
    let second = client.transfer(RECIPIENT, &amount("1")).unwrap();
    let third = client.approve(RECIPIENT, &amount("1")).unwrap();

    assert_eq!(
        [first.nonce(), second.nonce(), third.nonce()],
        [5, 6, 7]
    );
}

#[test]
fn concurrent_transfers_never_share_a_nonce() {
    let client = signer(MockChain {
        nonce_delay: Duration::from_millis(20),
        ..MockChain::default()
    });

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| client.transfer(RECIPIENT, &amount("1")).unwrap());
        }
    });

    let mut nonces: Vec<u64> = client
        .chain()
        .broadcasts()
        .iter()
        .map(|tx| tx.transaction.nonce)
        .collect();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![5, 6, 7, 8]);
}

#[test]
fn network_nonce_ahead_of_reservation_wins() {
    let mut chain = MockChain::default();
    chain.network_nonce = 40;
    let client = signer(chain);

    assert_eq!(client.transfer(RECIPIENT, &amount("1")).unwrap().nonce(), 40);
}

// ─── Pre-broadcast failures ───────────────────────────────────────

#[test]
fn gas_price_failure_stops_before_broadcast() {
    let client = signer(MockChain::default());
    client
        .chain()
        .fail_gas_price_next(ChainError::Transport("connection reset".into()));

    let err = client.transfer(RECIPIENT, &amount("1")).unwrap_err();
    assert!(matches!(
        err,
        TokenError::GasPriceFetch(ChainError::Transport(ref m)) if m == "connection reset"
    ));
    assert_eq!(client.chain().broadcast_count.load(Ordering::SeqCst), 0);
    assert!(client.chain().broadcasts().is_empty());

    let next = client.transfer(RECIPIENT, &amount("1")).unwrap();
    assert_eq!(next.nonce(), 5);
}

#[test]
fn chain_id_without_room_for_v_fails_before_broadcast() {
    let mut config = config();
    config.chain_id = u64::MAX / 2;
    let client = TokenClient::new(config, MockChain::default(), Some(KEY)).unwrap();

    let err = client.transfer(RECIPIENT, &amount("1")).unwrap_err();
    assert!(matches!(err, TokenError::Signing(_)));
    assert_eq!(client.chain().broadcast_count.load(Ordering::SeqCst), 0);
}

// ─── Broadcast failures ───────────────────────────────────────────

#[test]
fn broadcast_rejection_is_surfaced_verbatim() {
    let client = signer(MockChain::default());
    client.chain().reject_next(ChainError::Rpc {
        code: -32000,
        message: "insufficient funds for gas * price + value".into(),
    });

    let err = client.transfer(RECIPIENT, &amount("1")).unwrap_err();
    assert!(matches!(
        err,
        TokenError::Broadcast { ref function, source: ChainError::Rpc { ref message, .. } }
            if function == "transfer" && message == "insufficient funds for gas * price + value"
    ));
    assert!(err
        .to_string()
        .ends_with("insufficient funds for gas * price + value"));
}

#[test]
fn rejected_broadcast_does_not_consume_the_nonce() {
    let client = signer(MockChain::default());
    client.chain().reject_next(ChainError::Rpc {
        code: -32000,
        message: "replacement transaction underpriced".into(),
    });

    assert!(client.transfer(RECIPIENT, &amount("1")).is_err());
    let retried = client.transfer(RECIPIENT, &amount("1")).unwrap();
    assert_eq!(retried.nonce(), 5);
}
