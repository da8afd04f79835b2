//! Shared transaction fixtures

#![allow(dead_code)]

use zkwire_prover::wire::WireWriter;

pub const SEND_TYPE: &[u8] = b"/bank.MsgSend";
pub const VOTE_TYPE: &[u8] = b"/gov.MsgVote";

/// `Any { type_url, value }`
pub fn any(type_url: &[u8], payload: WireWriter) -> WireWriter {
    WireWriter::new().bytes(0x0a, type_url).nested(0x12, payload)
}

pub fn send_payload(amount: &[u8]) -> WireWriter {
    WireWriter::new()
        .bytes(0x0a, b"cosmos1alice")
        .bytes(0x12, b"cosmos1bob")
        .nested(0x1a, WireWriter::new().bytes(0x0a, b"uatom").bytes(0x12, amount))
}

/// `MsgVote { proposal_id, voter, option }`, with varint id and option
pub fn vote_payload() -> WireWriter {
    WireWriter::new()
        .varint(0x08, 7)
        .bytes(0x12, b"cosmos1voter")
        .varint(0x18, 1)
}

/// `TxRaw { body: TxBody { messages, memo }, auth_info }`
pub fn tx(messages: Vec<WireWriter>) -> Vec<u8> {
    let body = messages
        .into_iter()
        .fold(WireWriter::new(), |body, message| body.nested(0x0a, message))
        .bytes(0x12, b"memo");
    WireWriter::new()
        .nested(0x0a, body)
        .bytes(0x12, b"auth")
        .finish()
}

/// A send followed by a vote
pub fn send_and_vote() -> Vec<u8> {
    tx(vec![
        any(SEND_TYPE, send_payload(b"250")),
        any(VOTE_TYPE, vote_payload()),
    ])
}

/// Two short messages, asserted as `[0x1a, 0x12]`
pub fn two_messages() -> Vec<u8> {
    tx(vec![
        any(b"/x.A", WireWriter::new().bytes(0x0a, b"a").bytes(0x1a, b"5")),
        any(b"/x.B", WireWriter::new().bytes(0x12, b"b")),
    ])
}

/// Smallest useful transaction: one message with two short fields
pub fn tiny_tx() -> Vec<u8> {
    let payload = WireWriter::new().bytes(0x0a, b"a").bytes(0x1a, b"5");
    WireWriter::new()
        .nested(0x0a, WireWriter::new().nested(0x0a, any(b"/x.Send", payload)))
        .finish()
}
