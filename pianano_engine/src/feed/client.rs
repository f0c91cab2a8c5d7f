use std::fmt::Display;

use futures_util::{SinkExt, StreamExt};
use log::*;
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};

use crate::{
    feed::{
        backoff::ReconnectPolicy,
        protocol::{self, ConfirmationEvent},
    },
    registry::AddressRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl Display for FeedConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Subscribe(String),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Gave up reconnecting to the confirmation feed after {0} attempts")]
    RetriesExhausted(u32),
}

/// Cheap, cloneable front door to the feed task.
///
/// Subscriptions are fire-and-forget: commands sent while the connection is down sit in the
/// channel and flush after the next successful connect, which also re-subscribes the whole
/// registry anyway.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<FeedCommand>,
    state: watch::Receiver<FeedConnectionState>,
}

impl FeedHandle {
    pub fn subscribe(&self, address: &str) {
        if self.commands.send(FeedCommand::Subscribe(address.to_string())).is_err() {
            warn!("📡️ Feed client is gone; dropping subscription for {address}");
        }
    }

    /// Advisory only. Subscriptions are shared between every client watching an address, so the
    /// feed keeps listening; the request is noted and nothing is sent upstream.
    pub fn unsubscribe(&self, address: &str) {
        debug!("📡️ Unsubscribe for {address} noted. The shared subscription stays live.");
    }

    pub fn state(&self) -> FeedConnectionState {
        *self.state.borrow()
    }
}

/// The confirmation feed connection loop. Owns the WebSocket for its whole lifetime; everyone
/// else goes through a [`FeedHandle`] or receives [`ConfirmationEvent`]s on the event channel.
pub struct FeedClient {
    url: String,
    events: mpsc::Sender<ConfirmationEvent>,
    commands: mpsc::UnboundedReceiver<FeedCommand>,
    state_tx: watch::Sender<FeedConnectionState>,
    policy: ReconnectPolicy,
}

impl FeedClient {
    pub fn new(url: String, events: mpsc::Sender<ConfirmationEvent>) -> (Self, FeedHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(FeedConnectionState::Disconnected);
        let client = Self {
            url,
            events,
            commands: cmd_rx,
            state_tx,
            policy: ReconnectPolicy::default(),
        };
        (client, FeedHandle { commands: cmd_tx, state: state_rx })
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs until the reconnect budget is spent. Do not await the handle unless you want to block
    /// until that fatal condition.
    pub fn spawn(self, registry: AddressRegistry) -> JoinHandle<Result<(), FeedError>> {
        tokio::spawn(async move { self.run(registry).await })
    }

    async fn run(mut self, registry: AddressRegistry) -> Result<(), FeedError> {
        loop {
            self.set_state(FeedConnectionState::Connecting);
            info!("📡️ Connecting to confirmation feed at {}", self.url);
            match connect_async(self.url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!("📡️ Connected to confirmation feed");
                    self.policy.reset();
                    self.set_state(FeedConnectionState::Open);
                    let (mut write, mut read) = ws_stream.split();

                    // Subscriptions do not survive a reconnect; re-arm every monitored address.
                    let accounts = registry.addresses();
                    if !accounts.is_empty() {
                        let msg = protocol::subscribe_message(&accounts);
                        match write.send(WsMessage::Text(msg.into())).await {
                            Ok(()) => info!("📡️ Re-subscribed to {} monitored addresses", accounts.len()),
                            Err(e) => {
                                error!("📡️ Could not re-subscribe after connect: {e}");
                                self.set_state(FeedConnectionState::Closed);
                                self.wait_to_retry().await?;
                                continue;
                            },
                        }
                    }

                    loop {
                        tokio::select! {
                            Some(cmd) = self.commands.recv() => {
                                let FeedCommand::Subscribe(address) = cmd;
                                debug!("📡️ Subscribing to {address}");
                                let msg = protocol::subscribe_message(&[address]);
                                if let Err(e) = write.send(WsMessage::Text(msg.into())).await {
                                    error!("📡️ Failed to send subscription: {e}");
                                    break;
                                }
                            },
                            msg = read.next() => match msg {
                                Some(Ok(WsMessage::Text(text))) => self.handle_text(text.as_str()).await,
                                Some(Ok(WsMessage::Close(frame))) => {
                                    info!("📡️ Feed closed the connection: {frame:?}");
                                    break;
                                },
                                Some(Ok(_)) => {},
                                Some(Err(e)) => {
                                    error!("📡️ Feed transport error: {e}");
                                    break;
                                },
                                None => {
                                    info!("📡️ Feed stream ended");
                                    break;
                                },
                            },
                        }
                    }
                    self.set_state(FeedConnectionState::Closed);
                },
                Err(e) => {
                    warn!("📡️ Could not connect to the confirmation feed: {e}");
                },
            }
            self.set_state(FeedConnectionState::Disconnected);
            self.wait_to_retry().await?;
        }
    }

    async fn wait_to_retry(&mut self) -> Result<(), FeedError> {
        let Some(delay) = self.policy.next_delay() else {
            error!("📡️ Reconnection budget exhausted. The confirmation feed is unreachable.");
            return Err(FeedError::RetriesExhausted(self.policy.attempts()));
        };
        trace!("📡️ Retrying the feed connection in {delay:?}");
        tokio::time::sleep(delay).await;
        Ok(())
    }

    async fn handle_text(&self, text: &str) {
        match protocol::parse_event(text) {
            Ok(Some(event)) => {
                trace!("📡️ Confirmation observed from {}", event.sender);
                if self.events.send(event).await.is_err() {
                    error!("📡️ Confirmation event channel is closed; event dropped");
                }
            },
            Ok(None) => trace!("📡️ Ignoring feed message"),
            Err(e) => warn!("📡️ Discarding malformed feed message: {e}"),
        }
    }

    fn set_state(&self, state: FeedConnectionState) {
        trace!("📡️ Feed connection is {state}");
        let _ = self.state_tx.send(state);
    }
}

#[cfg(test)]
pub(crate) fn test_handle() -> (FeedHandle, mpsc::UnboundedReceiver<FeedCommand>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (_state_tx, state_rx) = watch::channel(FeedConnectionState::Open);
    (FeedHandle { commands: cmd_tx, state: state_rx }, cmd_rx)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn a_fresh_client_is_disconnected() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let (_client, handle) = FeedClient::new("ws://127.0.0.1:1".to_string(), event_tx);
        assert_eq!(handle.state(), FeedConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn exhausting_the_reconnect_budget_is_fatal() {
        let _ = env_logger::try_init();
        let (event_tx, _event_rx) = mpsc::channel(8);
        // Nothing listens on port 1, so every attempt fails fast.
        let (client, handle) = FeedClient::new("ws://127.0.0.1:1".to_string(), event_tx);
        let client = client.with_policy(ReconnectPolicy::new(
            Duration::from_millis(1),
            1.3,
            Duration::from_millis(2),
            3,
        ));
        let registry = AddressRegistry::new(handle.clone());
        let result = client.spawn(registry).await.expect("the feed task must not panic");
        assert!(matches!(result, Err(FeedError::RetriesExhausted(3))));
        assert_eq!(handle.state(), FeedConnectionState::Disconnected);
    }
}
