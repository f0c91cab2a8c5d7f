//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go
//! into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the store so the endpoint tests can run against a mock; concrete
//! registration happens in [`register`], which the server instantiates with the SQLite backend.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use pianano_engine::{
    db_types::NewSong, feed::FeedHandle, helpers, notes, AddressRegistry, MusicStore,
};
use pnn_common::RawNano;

use crate::{
    data_objects::{
        JsonResponse, NewSongRequest, PaymentStatusResponse, SongAddedResponse, SongSummary,
        TotalDonationsResponse,
    },
    errors::ServerError,
};

/// Price of a play when a song is submitted without one: 0.1 Nano in raw units.
const DEFAULT_PRICE_RAW: u128 = 100_000_000_000_000_000_000_000_000_000;

pub fn register<B: MusicStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .route("/songs", web::get().to(songs::<B>))
        .route("/songs", web::post().to(add_song::<B>))
        .route("/songs/{id}", web::get().to(song_by_id::<B>))
        .route("/start-monitoring/{address}", web::post().to(start_monitoring))
        .route("/stop-monitoring/{address}", web::post().to(stop_monitoring))
        .route("/payment-status/{address}", web::get().to(payment_status))
        .route("/total-donations", web::get().to(total_donations::<B>));
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️ pianano server is running")
}

/// Route handler for `GET /songs`. Listing a song also (re)arms monitoring for its address, so a
/// payment made straight from the list is caught even after a restart.
pub async fn songs<B: MusicStore>(
    api: web::Data<B>,
    registry: web::Data<AddressRegistry>,
) -> Result<HttpResponse, ServerError> {
    let songs = api.fetch_songs().await?;
    for song in &songs {
        registry.ensure(&song.address);
    }
    debug!("🎵️ Retrieved {} songs. {} addresses monitored.", songs.len(), registry.len());
    let summaries = songs.into_iter().map(SongSummary::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(summaries))
}

/// Route handler for `GET /songs/{id}`
pub async fn song_by_id<B: MusicStore>(
    path: web::Path<i64>,
    api: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let song = api
        .fetch_song_by_id(id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Song {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(SongSummary::from(song)))
}

/// Route handler for `POST /songs`. The score is validated up front so the device never sees a
/// malformed payload; a missing deposit address is generated on the spot.
pub async fn add_song<B: MusicStore>(
    body: web::Json<NewSongRequest>,
    api: web::Data<B>,
    registry: web::Data<AddressRegistry>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    if request.name.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("Song name is required".to_string()));
    }
    notes::validate_score(&request.notes)?;
    let address = request.address.unwrap_or_else(helpers::random_nano_address);
    let price = request.price.unwrap_or_else(|| RawNano::from(DEFAULT_PRICE_RAW));
    let name = request.name.clone();
    let id = api.insert_song(NewSong::new(request.name, address.clone(), price, request.notes)).await?;
    registry.ensure(&address);
    info!("🎵️ Song #{id} ({name}) added. Monitoring {address}.");
    Ok(HttpResponse::Ok().json(SongAddedResponse {
        id,
        message: "Song added successfully".to_string(),
        name,
    }))
}

/// Route handler for `POST /start-monitoring/{address}`. Re-arms the address for a fresh play.
pub async fn start_monitoring(
    path: web::Path<String>,
    registry: web::Data<AddressRegistry>,
) -> impl Responder {
    let address = path.into_inner();
    registry.reset(&address);
    info!("👁️ Monitoring started for {address}");
    HttpResponse::Ok().json(JsonResponse::success(format!("Started monitoring address: {address}")))
}

/// Route handler for `POST /stop-monitoring/{address}`. Advisory only: other clients may be
/// watching the same address, so the subscription and the registry entry are left intact.
pub async fn stop_monitoring(path: web::Path<String>, feed: web::Data<FeedHandle>) -> impl Responder {
    let address = path.into_inner();
    feed.unsubscribe(&address);
    info!("👁️ Active monitoring stopped for {address}");
    HttpResponse::Ok()
        .json(JsonResponse::success(format!("Stopped active monitoring for address: {address}")))
}

/// Route handler for `GET /payment-status/{address}`
pub async fn payment_status(
    path: web::Path<String>,
    registry: web::Data<AddressRegistry>,
) -> impl Responder {
    let address = path.into_inner();
    let paid = registry.is_paid(&address);
    debug!("👁️ Payment status for {address}: {paid}");
    HttpResponse::Ok().json(PaymentStatusResponse { paid })
}

/// Route handler for `GET /total-donations`
pub async fn total_donations<B: MusicStore>(api: web::Data<B>) -> Result<HttpResponse, ServerError> {
    let totals = api.donation_totals().await?;
    Ok(HttpResponse::Ok().json(TotalDonationsResponse {
        count: totals.count,
        total_raw: totals.total.value().to_string(),
        total: totals.total.to_string(),
    }))
}
