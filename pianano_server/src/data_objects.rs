use std::fmt::Display;

use pianano_engine::db_types::Song;
use pnn_common::RawNano;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NewSongRequest {
    pub name: String,
    /// The score in the device grammar, e.g. `1,5/200.3/100`.
    pub notes: String,
    /// Deposit address for this song. Generated when absent.
    #[serde(default)]
    pub address: Option<String>,
    /// Price in raw units, as a decimal string. Defaults to 0.1 Nano.
    #[serde(default)]
    pub price: Option<RawNano>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SongAddedResponse {
    pub id: i64,
    pub message: String,
    pub name: String,
}

/// The public view of a song: everything except the score, which clients have no use for.
#[derive(Debug, Clone, Serialize)]
pub struct SongSummary {
    pub id: i64,
    pub name: String,
    pub address: String,
    /// Raw units, as a decimal string.
    pub price: String,
}

impl From<Song> for SongSummary {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            name: song.name,
            address: song.address,
            price: song.price.value().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalDonationsResponse {
    pub count: i64,
    /// Raw units, as a decimal string.
    pub total_raw: String,
    /// Human-readable total, e.g. `1.300Ӿ`.
    pub total: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}
