use actix_web::{http::StatusCode, web};
use pianano_engine::db_types::Song;
use pnn_common::RawNano;
use serde_json::json;

use super::{
    helpers::{get_request, post_request, test_context},
    mocks::MockMusicDb,
};
use crate::routes;

fn song(id: i64, name: &str, address: &str) -> Song {
    Song {
        id,
        name: name.to_string(),
        address: address.to_string(),
        price: RawNano::from(100u128),
        notes: "1,5/200.3/100".to_string(),
    }
}

#[actix_web::test]
async fn list_songs_returns_summaries_and_arms_monitoring() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let mut db = MockMusicDb::new();
    db.expect_fetch_songs()
        .returning(|| Ok(vec![song(1, "Arabesque", "nano_1aaa"), song(2, "Clair de Lune", "nano_1bbb")]));

    let registry = ctx.registry.clone();
    let (status, body) = get_request("/songs", move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        json!([
            { "id": 1, "name": "Arabesque", "address": "nano_1aaa", "price": "100" },
            { "id": 2, "name": "Clair de Lune", "address": "nano_1bbb", "price": "100" }
        ])
    );
    // The score never leaves the server.
    assert!(!body.contains("1,5/200"));
    // Listing arms monitoring for every song.
    assert!(!ctx.registry.is_paid("nano_1aaa"));
    assert_eq!(ctx.registry.len(), 2);
}

#[actix_web::test]
async fn unknown_song_is_a_404() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let mut db = MockMusicDb::new();
    db.expect_fetch_song_by_id().returning(|_| Ok(None));

    let registry = ctx.registry.clone();
    let (status, body) = get_request("/songs/42", move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Song 42 does not exist"));
}

#[actix_web::test]
async fn add_song_with_explicit_address() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let mut db = MockMusicDb::new();
    db.expect_insert_song()
        .withf(|s| {
            s.name == "Gymnopédie No.1"
                && s.address == "nano_1ccc"
                && s.notes == "1/100.2/100"
                && s.price == RawNano::from(42u128)
        })
        .times(1)
        .returning(|_| Ok(7));

    let registry = ctx.registry.clone();
    let body = json!({
        "name": "Gymnopédie No.1",
        "notes": "1/100.2/100",
        "address": "nano_1ccc",
        "price": "42"
    });
    let (status, response) = post_request("/songs", Some(body), move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["message"], "Song added successfully");
    assert_eq!(ctx.registry.addresses(), vec!["nano_1ccc".to_string()]);
}

#[actix_web::test]
async fn add_song_generates_address_and_price_when_absent() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let mut db = MockMusicDb::new();
    db.expect_insert_song()
        .withf(|s| {
            s.address.starts_with("nano_")
                && s.address.len() == 65
                && s.price == RawNano::from(100_000_000_000_000_000_000_000_000_000u128)
        })
        .times(1)
        .returning(|_| Ok(1));

    let registry = ctx.registry.clone();
    let body = json!({ "name": "Für Elise", "notes": "3/100" });
    let (status, _) = post_request("/songs", Some(body), move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.registry.len(), 1, "the generated address is monitored");
}

#[actix_web::test]
async fn add_song_rejects_a_malformed_score() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    // No insert expectation: reaching the store would fail the test.
    let db = MockMusicDb::new();

    let registry = ctx.registry.clone();
    let body = json!({ "name": "Noise", "notes": "not a score" });
    let (status, response) = post_request("/songs", Some(body), move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Invalid note score"));
    assert!(ctx.registry.is_empty(), "nothing is monitored for a rejected song");
}

#[actix_web::test]
async fn add_song_requires_a_name() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let db = MockMusicDb::new();

    let registry = ctx.registry.clone();
    let body = json!({ "name": "  ", "notes": "1/100" });
    let (status, response) = post_request("/songs", Some(body), move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Song name is required"));
}

#[actix_web::test]
async fn add_song_for_a_taken_address_conflicts() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let mut db = MockMusicDb::new();
    db.expect_insert_song()
        .returning(|s| Err(pianano_engine::StoreError::DuplicateAddress(s.address)));

    let registry = ctx.registry.clone();
    let body = json!({ "name": "Again", "notes": "1/100", "address": "nano_1ccc" });
    let (status, response) = post_request("/songs", Some(body), move |cfg| {
        cfg.app_data(web::Data::new(db)).app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(response.contains("already registered"));
}
