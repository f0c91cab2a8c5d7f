use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use pianano_engine::{
    device::{DeviceManager, SerialOpener},
    feed::{ConfirmationEvent, FeedClient, FeedHandle},
    AddressRegistry, MusicStore, PaymentFlow, SqliteDatabase,
};
use tokio::sync::mpsc;

use crate::{config::ServerConfig, errors::ServerError, routes};

/// Confirmation events that arrive while the matcher is busy queue here rather than drop.
const EVENT_BUFFER: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let (event_tx, event_rx) = mpsc::channel::<ConfirmationEvent>(EVENT_BUFFER);
    let (feed_client, feed_handle) = FeedClient::new(config.feed.ws_url.clone(), event_tx);
    let registry = AddressRegistry::new(feed_handle.clone());

    // Arm monitoring for the whole catalogue up front. The subscribe commands queue in the feed
    // channel and flush once the first connection opens.
    match db.list_addresses().await {
        Ok(addresses) => {
            for address in &addresses {
                registry.ensure(address);
            }
            info!("🚀️ Monitoring {} addresses from the song catalogue", addresses.len());
        },
        Err(e) => warn!("🚀️ Could not pre-load monitored addresses: {e}"),
    }

    let opener = SerialOpener::new(config.device.baud_rate);
    let (device_manager, device_handle) = DeviceManager::new(opener, config.device.serial_port.clone());
    device_manager
        .with_probe_interval(Duration::from_secs(config.device.probe_interval_secs))
        .spawn();

    let feed_task = feed_client.spawn(registry.clone());

    PaymentFlow::new(db.clone(), registry.clone(), device_handle.clone(), event_rx).spawn();

    let srv = create_server_instance(&config, db, registry, feed_handle)?;
    tokio::select! {
        result = srv => result.map_err(ServerError::from),
        result = feed_task => match result {
            // The feed task only ever returns by exhausting its reconnect budget, and the
            // process cannot fulfil its purpose without the feed.
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ServerError::FeedFailure(e.to_string())),
            Err(e) => Err(ServerError::FeedFailure(format!("The feed task panicked: {e}"))),
        },
    }
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    registry: AddressRegistry,
    feed: FeedHandle,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pnn::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(feed.clone()))
            .configure(routes::register::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
