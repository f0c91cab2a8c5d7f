use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use pianano_engine::{
    feed::{FeedClient, FeedHandle},
    AddressRegistry,
};
use tokio::sync::mpsc;

/// A registry and feed handle wired to an unspawned feed client, so subscriptions queue
/// harmlessly instead of hitting the network.
pub struct TestContext {
    pub registry: AddressRegistry,
    pub feed: FeedHandle,
    _client: FeedClient,
}

pub fn test_context() -> TestContext {
    let (event_tx, _event_rx) = mpsc::channel(8);
    let (client, feed) = FeedClient::new("ws://localhost:7076".to_string(), event_tx);
    TestContext { registry: AddressRegistry::new(feed.clone()), feed, _client: client }
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let req = TestRequest::get().uri(path).to_request();
    let res = test::call_service(&app, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).to_string())
}

pub async fn post_request<F>(path: &str, body: Option<serde_json::Value>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let mut req = TestRequest::post().uri(path);
    if let Some(body) = body {
        req = req.set_json(body);
    }
    let res = test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).to_string())
}
