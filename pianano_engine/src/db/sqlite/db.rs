use std::{env, fmt::Debug};

use log::*;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

use super::{payments, songs};
use crate::{
    db::traits::{DonationTotals, MusicStore, StoreError},
    db_types::{NewPayment, NewSong, Payment, Song},
};

const SQLITE_DB_URL: &str = "sqlite://data/music.db";

pub fn db_url() -> String {
    let result = env::var("PNN_DATABASE_URL").unwrap_or_else(|_| {
        info!("PNN_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to (and creates, if missing) the database at `url`.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        if !url.contains(":memory:") && !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("🗃️ Creating sqlite database {url}");
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl MusicStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_song(&self, song: NewSong) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = songs::insert_song(song, &mut conn).await?;
        debug!("🗃️ Song #{id} has been saved in the DB");
        Ok(id)
    }

    async fn fetch_songs(&self) -> Result<Vec<Song>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        songs::fetch_songs(&mut conn).await
    }

    async fn fetch_song_by_id(&self, id: i64) -> Result<Option<Song>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        songs::fetch_song_by_id(id, &mut conn).await
    }

    async fn fetch_notes_by_address(&self, address: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        songs::fetch_notes_by_address(address, &mut conn).await
    }

    async fn list_addresses(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        songs::list_addresses(&mut conn).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = payments::insert_payment(payment, &mut conn).await?;
        debug!("🗃️ Payment #{id} has been saved in the DB");
        Ok(id)
    }

    async fn fetch_payments_for_address(&self, address: &str) -> Result<Vec<Payment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_address(address, &mut conn).await
    }

    async fn donation_totals(&self) -> Result<DonationTotals, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::donation_totals(&mut conn).await
    }
}
