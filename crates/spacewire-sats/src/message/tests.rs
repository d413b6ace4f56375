//! Field-order tests for the message codec.

use spacewire_core::error::{DecodingErrorKind, ErrorKind};

use super::*;
use crate::{
    bsatn::Bsatn,
    int::{U128, U256},
    types::{ConnectionId, Identity, TimeDuration, Timestamp},
};

fn le32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

#[test]
fn test_call_reducer_layout() {
    let message = ClientMessage::CallReducer {
        reducer: "say_hello".into(),
        args: vec![],
        request_id: 42,
        flags: 0,
    };

    let mut expected = vec![0u8];
    expected.extend_from_slice(&le32(9));
    expected.extend_from_slice(b"say_hello");
    expected.extend_from_slice(&le32(0));
    expected.extend_from_slice(&le32(42));
    expected.push(0);

    let bytes = message.to_bytes();
    assert_eq!(bytes, expected);

    match ClientMessage::from_bytes(&bytes).unwrap() {
        ClientMessage::CallReducer { reducer, args, request_id, flags } => {
            assert_eq!(reducer, "say_hello");
            assert!(args.is_empty());
            assert_eq!(request_id, 42);
            assert_eq!(flags, 0);
        }
        other => panic!("decoded {:?}", other),
    }
}

#[test]
fn test_subscribe_single_layout() {
    let message = ClientMessage::SubscribeSingle {
        query: "q".into(),
        request_id: 1,
        query_id: 2,
    };
    let mut expected = vec![3u8];
    expected.extend_from_slice(&le32(1));
    expected.push(b'q');
    expected.extend_from_slice(&le32(1));
    expected.extend_from_slice(&le32(2));
    assert_eq!(message.to_bytes(), expected);
}

#[test]
fn test_unsubscribe_variants_share_layout_but_not_tag() {
    let single = ClientMessage::Unsubscribe { request_id: 7, query_id: 8 }.to_bytes();
    let multi = ClientMessage::UnsubscribeMulti { request_id: 7, query_id: 8 }.to_bytes();
    assert_eq!(single[0], 5);
    assert_eq!(multi[0], 6);
    assert_eq!(single[1..], multi[1..]);
    assert_eq!(&single[1..5], &le32(7));
}

#[test]
fn test_one_off_query_puts_message_id_first() {
    let bytes = ClientMessage::OneOffQuery {
        message_id: vec![0xEE],
        query_string: "SELECT 1".into(),
    }
    .to_bytes();
    assert_eq!(bytes[0], 2);
    assert_eq!(&bytes[1..5], &le32(1));
    assert_eq!(bytes[5], 0xEE);
    assert_eq!(&bytes[6..10], &le32(8));
}

#[test]
fn test_identity_token_layout() {
    let identity = Identity::new(U256::new(U128::new(1, 2), U128::new(3, 4)));
    let connection_id = ConnectionId::new(U128::new(5, 6));
    let message = ServerMessage::IdentityToken(IdentityToken {
        identity,
        token: "tok".into(),
        connection_id,
    });

    let bytes = message.to_bytes();
    assert_eq!(bytes[0], 3);
    let words: Vec<u64> = bytes[1..33]
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(words, vec![1, 2, 3, 4]);
    assert_eq!(&bytes[33..37], &le32(3));
    assert_eq!(&bytes[37..40], b"tok");
    assert_eq!(&bytes[40..48], &5u64.to_le_bytes());
    assert_eq!(&bytes[48..56], &6u64.to_le_bytes());
    assert_eq!(bytes.len(), 56);

    assert_eq!(ServerMessage::from_bytes(&bytes).unwrap(), message);
}

#[test]
fn test_subscription_error_optionals() {
    let message = ServerMessage::SubscriptionError(SubscriptionError {
        total_host_execution_duration_micros: 10,
        request_id: Some(3),
        query_id: None,
        table_id: Some(9),
        error: "bad".into(),
    });
    let bytes = message.to_bytes();

    let mut expected = vec![7u8];
    expected.extend_from_slice(&10u64.to_le_bytes());
    expected.push(1);
    expected.extend_from_slice(&le32(3));
    expected.push(0);
    expected.push(1);
    expected.extend_from_slice(&le32(9));
    expected.extend_from_slice(&le32(3));
    expected.extend_from_slice(b"bad");
    assert_eq!(bytes, expected);
    assert_eq!(ServerMessage::from_bytes(&bytes).unwrap(), message);
}

#[test]
fn test_transaction_update_nested_round_trip() {
    let table = TableUpdate {
        table_id: 4,
        table_name: "player".into(),
        num_rows: 2,
        updates: vec![
            CompressableQueryUpdate::Uncompressed(QueryUpdate {
                deletes: RowList::fixed(4, vec![1, 0, 0, 0]),
                inserts: RowList::with_offsets(vec![0, 2], vec![7, 7, 8]),
            }),
            CompressableQueryUpdate::Gzip(vec![0x1f, 0x8b]),
        ],
    };
    let message = ServerMessage::TransactionUpdate(TransactionUpdate {
        status: UpdateStatus::Committed(DatabaseUpdate { tables: vec![table] }),
        timestamp: Timestamp::from_micros(1_700_000_000_000_000),
        caller_identity: Identity::new(U256::new(U128::new(0, 1), U128::ZERO)),
        caller_connection_id: ConnectionId::new(U128::new(0, 77)),
        reducer_call: ReducerCallInfo {
            reducer_name: "move".into(),
            reducer_id: 12,
            args: vec![1, 2, 3],
            request_id: 99,
        },
        energy_quanta_used: EnergyQuanta { quanta: U128::new(0, 5000) },
        total_host_execution_duration: TimeDuration::from_micros(321),
    });

    let bytes = message.to_bytes();
    assert_eq!(bytes[0], 1);
    assert_eq!(ServerMessage::from_bytes(&bytes).unwrap(), message);
}

#[test]
fn test_multi_applied_variants_keep_their_tag() {
    let update = MultiSubscriptionUpdate {
        request_id: 1,
        total_host_execution_duration_micros: 2,
        query_id: 3,
        update: DatabaseUpdate::default(),
    };
    let applied = ServerMessage::SubscribeMultiApplied(update.clone());
    let removed = ServerMessage::UnsubscribeMultiApplied(update);

    assert_eq!(ServerMessage::from_bytes(&applied.to_bytes()).unwrap(), applied);
    assert_eq!(ServerMessage::from_bytes(&removed.to_bytes()).unwrap(), removed);
    assert_eq!(removed.kind(), "UnsubscribeMultiApplied");
}

#[test]
fn test_subscription_rows_layout_and_tags() {
    let rows = SubscriptionRows {
        request_id: 7,
        total_host_execution_duration_micros: 9,
        query_id: 3,
        rows: SubscribeRows {
            table_id: 4,
            table_name: "t".into(),
            table_rows: TableUpdate {
                table_id: 4,
                table_name: "t".into(),
                num_rows: 0,
                updates: vec![],
            },
        },
    };

    let mut body = Vec::new();
    body.extend_from_slice(&le32(7));
    body.extend_from_slice(&9u64.to_le_bytes());
    body.extend_from_slice(&le32(3));
    body.extend_from_slice(&le32(4));
    body.extend_from_slice(&le32(1));
    body.push(b't');
    body.extend_from_slice(&le32(4));
    body.extend_from_slice(&le32(1));
    body.push(b't');
    body.extend_from_slice(&0u64.to_le_bytes());
    body.extend_from_slice(&le32(0));

    let applied = ServerMessage::SubscribeApplied(rows.clone());
    let removed = ServerMessage::UnsubscribeApplied(rows);
    let applied_bytes = applied.to_bytes();
    let removed_bytes = removed.to_bytes();

    assert_eq!(applied_bytes[0], 5);
    assert_eq!(removed_bytes[0], 6);
    assert_eq!(&applied_bytes[1..], body.as_slice());
    assert_eq!(&removed_bytes[1..], body.as_slice());

    assert_eq!(ServerMessage::from_bytes(&applied_bytes).unwrap(), applied);
    assert_eq!(ServerMessage::from_bytes(&removed_bytes).unwrap(), removed);
}

#[test]
fn test_initial_subscription_layout() {
    let message = ServerMessage::InitialSubscription(InitialSubscription {
        database_update: DatabaseUpdate::default(),
        request_id: 11,
        total_host_execution_duration: TimeDuration::from_micros(250),
    });

    let mut expected = vec![0u8];
    expected.extend_from_slice(&le32(0));
    expected.extend_from_slice(&le32(11));
    expected.extend_from_slice(&250i64.to_le_bytes());

    let bytes = message.to_bytes();
    assert_eq!(bytes, expected);
    assert_eq!(ServerMessage::from_bytes(&bytes).unwrap(), message);
}

#[test]
fn test_unknown_server_discriminant() {
    match ServerMessage::from_bytes(&[42, 0, 0]) {
        Err(ErrorKind::DecodingError(kind)) => {
            assert_eq!(kind, DecodingErrorKind::ServerMessage(42));
        }
        other => panic!("expected decoding error, got {:?}", other),
    }
}

#[test]
fn test_unknown_client_discriminant() {
    assert!(matches!(
        ClientMessage::from_bytes(&[7]),
        Err(ErrorKind::DecodingError(DecodingErrorKind::ClientMessage(7)))
    ));
}

#[test]
fn test_truncated_message_is_out_of_data() {
    let mut bytes = ClientMessage::Unsubscribe { request_id: 1, query_id: 2 }.to_bytes();
    bytes.truncate(6);
    assert!(matches!(ClientMessage::from_bytes(&bytes), Err(ErrorKind::OutOfData { .. })));
}

#[test]
fn test_unknown_nested_status_fails_the_message() {
    let mut bytes = vec![1u8];
    bytes.push(9);
    bytes.extend_from_slice(&[0; 64]);
    assert!(matches!(
        ServerMessage::from_bytes(&bytes),
        Err(ErrorKind::DecodingError(DecodingErrorKind::UpdateStatus(9)))
    ));
}
