//! # Confirmation feed client
//!
//! The feed client owns the single logical WebSocket connection to the remote Nano node and
//! delivers parsed confirmation events, in arrival order, to the payment flow. It comprises
//! three co-operating parts:
//!
//! # FeedClient
//! [`FeedClient`] is the connection loop: connect, subscribe to every monitored address, then
//! pump inbound messages and subscription commands until the transport drops. Any drop, error or
//! timeout sends it back around the loop; subscriptions are not assumed to survive a reconnect,
//! so each successful connect re-subscribes the whole registry.
//!
//! # ReconnectPolicy
//! [`ReconnectPolicy`] is the backoff schedule between connection attempts: a short initial
//! delay grown by a fixed factor and capped, with a very large but finite retry ceiling.
//! Exhausting the ceiling is the one fatal condition in the system, surfaced as
//! [`FeedError::RetriesExhausted`] from the client task.
//!
//! # Protocol
//! [`protocol`] holds the wire shapes: the subscribe request and the inbound confirmation
//! envelope. Malformed inbound messages are logged and discarded; they never take the
//! connection down.
mod backoff;
mod client;
pub mod protocol;

pub use backoff::ReconnectPolicy;
pub use client::{FeedClient, FeedCommand, FeedConnectionState, FeedError, FeedHandle};
pub use protocol::ConfirmationEvent;

#[cfg(test)]
pub(crate) use client::test_handle;
