use chrono::{DateTime, Utc};
use pnn_common::RawNano;
use sqlx::{sqlite::SqliteRow, FromRow, Row};

//--------------------------------------     Song       --------------------------------------------------------------

/// A song in the catalogue. `address` is the deposit address that triggers playback and `notes`
/// is the score in the device's textual grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub price: RawNano,
    pub notes: String,
}

// Prices are stored as TEXT because raw Nano amounts overflow sqlite integers, so the row is
// decoded by hand rather than derived.
impl FromRow<'_, SqliteRow> for Song {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let price: String = row.try_get("price")?;
        let price = price.parse::<RawNano>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "price".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            price,
            notes: row.try_get("notes")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub name: String,
    pub address: String,
    pub price: RawNano,
    pub notes: String,
}

impl NewSong {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        name: S1,
        address: S2,
        price: RawNano,
        notes: S3,
    ) -> Self {
        Self { name: name.into(), address: address.into(), price, notes: notes.into() }
    }
}

//--------------------------------------     Payment       -----------------------------------------------------------

/// One confirmed transfer to a monitored address. Append-only; an address that is paid twice gets
/// two rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: i64,
    pub address: String,
    pub amount: RawNano,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let amount: String = row.try_get("amount")?;
        let amount = amount.parse::<RawNano>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            address: row.try_get("address")?,
            amount,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub address: String,
    pub amount: RawNano,
}

impl NewPayment {
    pub fn new<S: Into<String>>(address: S, amount: RawNano) -> Self {
        Self { address: address.into(), amount }
    }
}
