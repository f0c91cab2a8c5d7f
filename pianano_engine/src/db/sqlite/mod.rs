//! # SQLite database methods
//!
//! Low-level interactions live in [`songs`] and [`payments`] as simple functions that accept a
//! `&mut SqliteConnection`, so callers can use a pooled connection or a transaction without any
//! other changes. [`SqliteDatabase`] is the [`MusicStore`](crate::MusicStore) implementation
//! built on top of them.
mod db;
mod payments;
mod songs;

pub use db::{db_url, SqliteDatabase};
