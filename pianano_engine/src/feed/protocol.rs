//! Wire shapes for the node's confirmation WebSocket.
use pnn_common::{RawNano, RawNanoConversionError};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const CONFIRMATION_TOPIC: &str = "confirmation";

/// A parsed, matchable confirmation. `recipient` is only present for send-type blocks; events
/// without one can never match a monitored address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEvent {
    pub sender: String,
    pub recipient: Option<String>,
    pub amount: RawNano,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed feed message. {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unparseable amount in feed message. {0}")]
    BadAmount(#[from] RawNanoConversionError),
}

/// The subscribe request the node expects:
/// `{"action":"subscribe","topic":"confirmation","options":{"accounts":[...]}}`.
pub fn subscribe_message<S: AsRef<str>>(accounts: &[S]) -> String {
    let accounts = accounts.iter().map(|a| a.as_ref()).collect::<Vec<_>>();
    json!({
        "action": "subscribe",
        "topic": CONFIRMATION_TOPIC,
        "options": { "accounts": accounts }
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    message: Option<ConfirmationBody>,
}

#[derive(Debug, Deserialize)]
struct ConfirmationBody {
    account: String,
    amount: String,
    #[serde(default)]
    block: Option<BlockContents>,
}

#[derive(Debug, Deserialize)]
struct BlockContents {
    /// The credited address. Only send-type blocks carry it.
    #[serde(default)]
    link_as_account: Option<String>,
}

/// Parses one inbound frame. `Ok(None)` means a well-formed message we don't care about (wrong
/// topic, no message body); `Err` means the frame was malformed and should be discarded with a
/// warning.
pub fn parse_event(text: &str) -> Result<Option<ConfirmationEvent>, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.topic.as_deref() != Some(CONFIRMATION_TOPIC) {
        return Ok(None);
    }
    let Some(body) = envelope.message else {
        return Ok(None);
    };
    let amount = body.amount.parse::<RawNano>()?;
    Ok(Some(ConfirmationEvent {
        sender: body.account,
        recipient: body.block.and_then(|b| b.link_as_account),
        amount,
    }))
}
