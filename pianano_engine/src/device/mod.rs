//! # Device connection manager
//!
//! Owns the single serial link to the piano controller: discovery, open, health-checks, writes.
//!
//! # DeviceManager
//! [`DeviceManager`] is a task that holds the link for its whole lifetime. Commands arrive on a
//! channel and are answered one at a time, which is also what keeps writes from interleaving:
//! two payloads woven together byte-by-byte would corrupt the controller's input stream. A probe
//! timer re-runs discovery whenever the link is down, since the hardware may be plugged in (or
//! yanked out) at any time and the transport does not always say so synchronously.
//!
//! # DeviceHandle
//! [`DeviceHandle`] is the cloneable front door: [`trigger_pulse`](DeviceHandle::trigger_pulse)
//! actuates the test mechanism, [`send_payload`](DeviceHandle::send_payload) transmits a note
//! score. A payload write only reports success after the transport has confirmed the bytes were
//! physically flushed; any non-success result means the payload may not have been delivered.
//!
//! # Links and openers
//! [`DeviceLink`] and [`LinkOpener`] abstract the transport so tests can script failures; the
//! production pair ([`SerialOpener`]) sits on the `serialport` crate.
mod link;
mod manager;

pub use link::{DeviceError, DeviceLink, LinkOpener, SerialOpener, DEFAULT_BAUD_RATE};
pub use manager::{
    DeviceConnectionState, DeviceHandle, DeviceManager, PAYLOAD_TERMINATOR, PULSE_BYTE,
};
