use std::{fmt::Display, io, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::device::link::{DeviceError, DeviceLink, LinkOpener};

/// The single control byte that actuates the test mechanism.
pub const PULSE_BYTE: u8 = b'h';
/// Payloads are newline-terminated so the controller knows the command is complete.
pub const PAYLOAD_TERMINATOR: u8 = b'\n';

const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
/// The controller resets when the port opens; give it a moment before the first write.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceConnectionState {
    Unopened,
    Discovering,
    Opening,
    Open,
    Error,
}

impl Display for DeviceConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unopened => "unopened",
            Self::Discovering => "discovering",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

enum DeviceCommand {
    TriggerPulse(oneshot::Sender<Result<(), DeviceError>>),
    SendPayload(String, oneshot::Sender<Result<(), DeviceError>>),
}

/// Cloneable front door to the device task. Requests are answered one at a time in arrival
/// order, so concurrent payloads queue rather than interleave.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    commands: mpsc::Sender<DeviceCommand>,
}

impl DeviceHandle {
    /// Actuates the test mechanism once. Fails if the link is not open (a reopen is attempted
    /// for the benefit of the next caller).
    pub async fn trigger_pulse(&self) -> Result<(), DeviceError> {
        self.request(DeviceCommand::TriggerPulse).await
    }

    /// Transmits a note score. Success means the transport confirmed the bytes were physically
    /// flushed; on any error the payload must be assumed undelivered.
    pub async fn send_payload<S: Into<String>>(&self, data: S) -> Result<(), DeviceError> {
        let data = data.into();
        self.request(|reply| DeviceCommand::SendPayload(data, reply)).await
    }

    async fn request<F>(&self, make: F) -> Result<(), DeviceError>
    where F: FnOnce(oneshot::Sender<Result<(), DeviceError>>) -> DeviceCommand {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands.send(make(reply_tx)).await.map_err(|_| DeviceError::ManagerGone)?;
        reply_rx.await.map_err(|_| DeviceError::ManagerGone)?
    }
}

/// Owns the physical link. See the [module docs](crate::device) for the state machine.
pub struct DeviceManager<O: LinkOpener> {
    opener: O,
    configured_path: Option<String>,
    probe_interval: Duration,
    settle_delay: Duration,
    state: DeviceConnectionState,
    link: Option<O::Link>,
    commands: mpsc::Receiver<DeviceCommand>,
}

impl<O: LinkOpener> DeviceManager<O> {
    /// `configured_path` skips discovery when the device path is known up front.
    pub fn new(opener: O, configured_path: Option<String>) -> (Self, DeviceHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let manager = Self {
            opener,
            configured_path,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            state: DeviceConnectionState::Unopened,
            link: None,
            commands: cmd_rx,
        };
        (manager, DeviceHandle { commands: cmd_tx })
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(mut self) {
        info!("🎹️ Device manager started");
        // Startup doubles as the first connection attempt; the probe timer takes over from there.
        if let Err(e) = self.reopen().await {
            debug!("🎹️ Output device unavailable at startup: {e}");
        }
        let mut probe = tokio::time::interval(self.probe_interval);
        probe.tick().await;
        loop {
            tokio::select! {
                _ = probe.tick() => {
                    if self.state != DeviceConnectionState::Open {
                        if let Err(e) = self.reopen().await {
                            debug!("🕰️ Output device unavailable: {e}");
                        }
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(DeviceCommand::TriggerPulse(reply)) => {
                        let _ = reply.send(self.trigger_pulse().await);
                    },
                    Some(DeviceCommand::SendPayload(data, reply)) => {
                        let _ = reply.send(self.send_payload(data).await);
                    },
                    None => {
                        info!("🎹️ All device handles dropped. Device manager stopping.");
                        return;
                    },
                },
            }
        }
    }

    async fn reopen(&mut self) -> Result<(), DeviceError> {
        self.link = None;
        let path = match &self.configured_path {
            Some(path) => path.clone(),
            None => {
                self.set_state(DeviceConnectionState::Discovering);
                let opener = self.opener.clone();
                let found = run_blocking(move || opener.discover()).await;
                match found {
                    Ok(path) => path,
                    Err(e) => {
                        self.set_state(DeviceConnectionState::Unopened);
                        return Err(e);
                    },
                }
            },
        };
        self.set_state(DeviceConnectionState::Opening);
        info!("🎹️ Opening output device on {path}");
        let opener = self.opener.clone();
        let opened = run_blocking(move || opener.open(&path)).await;
        match opened {
            Ok(link) => {
                self.link = Some(link);
                self.set_state(DeviceConnectionState::Open);
                info!("🎹️ Output device is open");
            },
            Err(e) => {
                self.set_state(DeviceConnectionState::Error);
                warn!("🎹️ Could not open the output device: {e}");
                return Err(e);
            },
        }
        tokio::time::sleep(self.settle_delay).await;
        match self.write_bytes(vec![PULSE_BYTE]).await {
            Ok(()) => {
                info!("🎹️ Test pulse sent");
                Ok(())
            },
            Err(e) => {
                warn!("🎹️ Test pulse failed: {e}");
                Err(e)
            },
        }
    }

    async fn trigger_pulse(&mut self) -> Result<(), DeviceError> {
        if self.state != DeviceConnectionState::Open {
            debug!("🎹️ Pulse requested while the device is {}", self.state);
            // Try to bring the link back for the next caller; this call still fails.
            let _ = self.reopen().await;
            return Err(DeviceError::NotConnected);
        }
        self.write_bytes(vec![PULSE_BYTE]).await
    }

    async fn send_payload(&mut self, data: String) -> Result<(), DeviceError> {
        if self.state != DeviceConnectionState::Open {
            warn!("🎹️ Payload requested while the device is {}. Nothing sent.", self.state);
            return Err(DeviceError::NotConnected);
        }
        let mut bytes = data.into_bytes();
        bytes.push(PAYLOAD_TERMINATOR);
        let len = bytes.len();
        self.write_bytes(bytes).await?;
        debug!("🎹️ {len} bytes written and flushed to the device");
        Ok(())
    }

    /// Write-then-flush on the blocking pool. Success requires the flush; any failure drops the
    /// link so the probe timer can rediscover the device.
    async fn write_bytes(&mut self, bytes: Vec<u8>) -> Result<(), DeviceError> {
        let Some(mut link) = self.link.take() else {
            return Err(DeviceError::NotConnected);
        };
        let outcome = tokio::task::spawn_blocking(move || {
            let result = link
                .write_all(&bytes)
                .map_err(DeviceError::WriteFailed)
                .and_then(|_| link.flush().map_err(DeviceError::FlushFailed));
            (link, result)
        })
        .await;
        match outcome {
            Ok((link, Ok(()))) => {
                self.link = Some(link);
                Ok(())
            },
            Ok((_, Err(e))) => {
                error!("🎹️ Device write failed: {e}");
                self.set_state(DeviceConnectionState::Error);
                Err(e)
            },
            Err(e) => {
                error!("🎹️ Device write task failed: {e}");
                self.set_state(DeviceConnectionState::Error);
                Err(DeviceError::WriteFailed(io::Error::new(io::ErrorKind::Other, e.to_string())))
            },
        }
    }

    fn set_state(&mut self, state: DeviceConnectionState) {
        if self.state != state {
            trace!("🎹️ Device connection is {state}");
            self.state = state;
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, DeviceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DeviceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(DeviceError::OpenFailed(format!("blocking task failed: {e}"))),
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::test_support::ScriptedOpener;

    fn manager(opener: ScriptedOpener) -> (DeviceManager<ScriptedOpener>, DeviceHandle) {
        let (manager, handle) = DeviceManager::new(opener, None);
        let manager = manager
            .with_probe_interval(Duration::from_millis(10))
            .with_settle_delay(Duration::ZERO);
        (manager, handle)
    }

    #[tokio::test]
    async fn pulse_is_sent_on_open_and_on_request() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let writes = opener.writes();
        let (manager, handle) = manager(opener);
        manager.spawn();
        handle.trigger_pulse().await.expect("pulse should succeed");
        let writes = writes.lock().unwrap();
        // One pulse from the open sequence, one from the explicit request.
        assert_eq!(writes.as_slice(), [vec![PULSE_BYTE], vec![PULSE_BYTE]]);
    }

    #[tokio::test]
    async fn payload_is_terminated_and_flushed() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let writes = opener.writes();
        let flushes = opener.flushes();
        let (manager, handle) = manager(opener);
        manager.spawn();
        handle.send_payload("1,5/200.3/100").await.expect("payload should succeed");
        let writes = writes.lock().unwrap();
        assert_eq!(writes.last().unwrap().as_slice(), b"1,5/200.3/100\n");
        assert!(flushes.load(std::sync::atomic::Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn flush_failure_is_not_success() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let script = opener.script();
        let (manager, handle) = manager(opener);
        manager.spawn();
        // Let the open sequence (and its pulse) finish cleanly first.
        handle.trigger_pulse().await.expect("initial pulse should succeed");
        script.lock().unwrap().fail_flush = true;
        let result = handle.send_payload("1/100").await;
        assert!(matches!(result, Err(DeviceError::FlushFailed(_))));
    }

    #[tokio::test]
    async fn write_failure_is_not_success() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let script = opener.script();
        let (manager, handle) = manager(opener);
        manager.spawn();
        handle.trigger_pulse().await.expect("initial pulse should succeed");
        script.lock().unwrap().fail_write = true;
        let result = handle.send_payload("1/100").await;
        assert!(matches!(result, Err(DeviceError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn payload_fails_fast_when_no_device_is_present() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::no_device();
        let (manager, handle) = manager(opener);
        manager.spawn();
        let result = handle.send_payload("1/100").await;
        assert!(matches!(result, Err(DeviceError::NotConnected)));
    }

    #[tokio::test]
    async fn device_recovers_after_a_failed_write() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let script = opener.script();
        let (manager, handle) = manager(opener);
        manager.spawn();
        handle.trigger_pulse().await.expect("initial pulse should succeed");
        script.lock().unwrap().fail_write = true;
        assert!(handle.send_payload("1/100").await.is_err());
        script.lock().unwrap().fail_write = false;
        // The probe timer rediscovers and reopens; eventually a payload goes through again.
        let mut recovered = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if handle.send_payload("2/100").await.is_ok() {
                recovered = true;
                break;
            }
        }
        assert!(recovered, "device did not recover after the link came back");
    }

    #[tokio::test]
    async fn configured_path_skips_discovery() {
        let _ = env_logger::try_init();
        let opener = ScriptedOpener::working();
        let opens = opener.opened_paths();
        let (manager, handle) = DeviceManager::new(opener, Some("/dev/ttyACM7".to_string()));
        let manager = manager
            .with_probe_interval(Duration::from_millis(10))
            .with_settle_delay(Duration::ZERO);
        manager.spawn();
        handle.trigger_pulse().await.expect("pulse should succeed");
        assert_eq!(opens.lock().unwrap().as_slice(), ["/dev/ttyACM7".to_string()]);
    }
}
