//! # Pianano Engine
//!
//! The pianano engine bridges the Nano confirmation feed to a serial-attached piano controller:
//! when a payment confirms for an address tied to a song, the song's note score is forwarded to
//! the instrument. This library contains everything with real state: the monitored-address
//! registry, the feed client, the device connection manager and the matching pipeline, plus the
//! SQLite store that keeps songs and payments.
//!
//! The library is divided into four main sections:
//! 1. Connection management ([`mod@feed`] and [`mod@device`]). Both sides of the bridge drop and
//!    reconnect independently; each owns its own lifecycle and never escalates transport errors
//!    to its callers.
//! 2. Matching ([`mod@registry`] and [`mod@payment_flow`]). The registry is the single source of
//!    truth for "has this address been paid since monitoring started"; the payment flow consumes
//!    confirmation events in arrival order and drives the store and the device.
//! 3. Persistence ([`MusicStore`] and its SQLite backend). You should never need to touch the
//!    database directly; the trait is the seam, and it is what the HTTP layer and the tests mock.
//! 4. The note score grammar ([`mod@notes`]) the device understands.
mod db;

pub mod db_types;
pub mod device;
pub mod feed;
pub mod helpers;
pub mod notes;
pub mod payment_flow;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::{
    sqlite::{db_url, SqliteDatabase},
    traits::{DonationTotals, MusicStore, StoreError},
};
pub use payment_flow::PaymentFlow;
pub use registry::AddressRegistry;
