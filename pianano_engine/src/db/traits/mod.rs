//! The persistence seam of the engine.
//!
//! The orchestrator and the HTTP layer only ever talk to a [`MusicStore`]; concrete backends
//! (SQLite in production, mocks in tests) implement this trait.
use std::future::Future;

use pnn_common::RawNano;
use thiserror::Error;

use crate::db_types::{NewPayment, NewSong, Payment, Song};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error. {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("A song is already registered for address {0}")]
    DuplicateAddress(String),
    #[error("Could not run database migrations. {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Corrupt row in the database. {0}")]
    CorruptRow(String),
}

/// Donation totals for the whole catalogue, one row per confirmed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationTotals {
    pub count: i64,
    pub total: RawNano,
}

/// Backend storage for songs and payments.
///
/// The engine only reads `address` and `notes` from songs; everything else exists for the
/// HTTP layer.
pub trait MusicStore {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a new song and returns its id. The deposit address is unique per song; inserting a
    /// second song for the same address fails with [`StoreError::DuplicateAddress`].
    fn insert_song(&self, song: NewSong) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// All songs, ordered by name.
    fn fetch_songs(&self) -> impl Future<Output = Result<Vec<Song>, StoreError>> + Send;

    fn fetch_song_by_id(&self, id: i64) -> impl Future<Output = Result<Option<Song>, StoreError>> + Send;

    /// The note score for the song tied to `address`, if any. This is the lookup on the playback
    /// hot path.
    fn fetch_notes_by_address(&self, address: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Every deposit address in the catalogue. Used at startup to pre-populate the monitoring
    /// registry.
    fn list_addresses(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Appends a payment row. Payments are never unique per address; each confirmation gets its
    /// own row.
    fn insert_payment(&self, payment: NewPayment) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn fetch_payments_for_address(&self, address: &str) -> impl Future<Output = Result<Vec<Payment>, StoreError>> + Send;

    /// Count and sum of all recorded payments.
    fn donation_totals(&self) -> impl Future<Output = Result<DonationTotals, StoreError>> + Send;
}
