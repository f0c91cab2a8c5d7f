use actix_web::{http::StatusCode, web};
use pianano_engine::DonationTotals;
use pnn_common::RawNano;
use serde_json::json;

use super::{
    helpers::{get_request, post_request, test_context},
    mocks::MockMusicDb,
};
use crate::routes;

#[actix_web::test]
async fn health_is_ok() {
    let _ = env_logger::try_init();
    let (status, body) = get_request("/health", |cfg| {
        routes::register::<MockMusicDb>(cfg);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("running"));
}

#[actix_web::test]
async fn unknown_address_is_unpaid() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    let registry = ctx.registry.clone();
    let (status, body) = get_request("/payment-status/nano_1zzz", move |cfg| {
        cfg.app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"paid":false}"#);
}

#[actix_web::test]
async fn start_monitoring_rearms_a_paid_address() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    ctx.registry.ensure("nano_1aaa");
    assert!(ctx.registry.mark_paid("nano_1aaa"));

    let registry = ctx.registry.clone();
    let (status, body) = post_request("/start-monitoring/nano_1aaa", None, move |cfg| {
        cfg.app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Started monitoring"));
    assert!(!ctx.registry.is_paid("nano_1aaa"), "starting monitoring clears the paid flag");
}

#[actix_web::test]
async fn payment_status_reflects_the_registry() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    ctx.registry.ensure("nano_1aaa");
    ctx.registry.mark_paid("nano_1aaa");

    let registry = ctx.registry.clone();
    let (status, body) = get_request("/payment-status/nano_1aaa", move |cfg| {
        cfg.app_data(web::Data::new(registry));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"paid":true}"#);
}

#[actix_web::test]
async fn stop_monitoring_is_advisory_only() {
    let _ = env_logger::try_init();
    let ctx = test_context();
    ctx.registry.ensure("nano_1aaa");
    ctx.registry.mark_paid("nano_1aaa");

    let feed = ctx.feed.clone();
    let (status, body) = post_request("/stop-monitoring/nano_1aaa", None, move |cfg| {
        cfg.app_data(web::Data::new(feed));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Stopped active monitoring"));
    // Non-binding: the registry entry and its state survive for other watchers.
    assert_eq!(ctx.registry.len(), 1);
    assert!(ctx.registry.is_paid("nano_1aaa"));
}

#[actix_web::test]
async fn total_donations_reports_count_and_sum() {
    let _ = env_logger::try_init();
    let mut db = MockMusicDb::new();
    db.expect_donation_totals().returning(|| {
        Ok(DonationTotals {
            count: 3,
            total: "300000000000000000000000000000".parse::<RawNano>().unwrap(),
        })
    });

    let (status, body) = get_request("/total-donations", move |cfg| {
        cfg.app_data(web::Data::new(db));
        routes::register::<MockMusicDb>(cfg);
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        json!({ "count": 3, "total_raw": "300000000000000000000000000000", "total": "0.300Ӿ" })
    );
}
