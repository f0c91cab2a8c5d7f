use std::env;

use log::*;
use pianano_engine::{db_url, device::DEFAULT_BAUD_RATE};

const DEFAULT_PNN_HOST: &str = "127.0.0.1";
const DEFAULT_PNN_PORT: u16 = 3000;
const DEFAULT_NODE_WS_URL: &str = "wss://node.somenano.com/websocket";
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub feed: FeedConfig,
    pub device: DeviceConfig,
}

#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// WebSocket URL of the Nano node publishing confirmation events.
    pub ws_url: String,
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    /// Explicit serial device path. When `None`, the device manager discovers one.
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    /// Seconds between device health checks / rediscovery attempts.
    pub probe_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PNN_HOST.to_string(),
            port: DEFAULT_PNN_PORT,
            database_url: String::default(),
            feed: FeedConfig { ws_url: DEFAULT_NODE_WS_URL.to_string() },
            device: DeviceConfig {
                serial_port: None,
                baud_rate: DEFAULT_BAUD_RATE,
                probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            },
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("PNN_HOST").ok().unwrap_or_else(|| DEFAULT_PNN_HOST.into());
        let port = env::var("PNN_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PNN_PORT. {e} Using the default, {DEFAULT_PNN_PORT}, instead."
                    );
                    DEFAULT_PNN_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PNN_PORT);
        let database_url = db_url();
        let ws_url = env::var("PNN_NODE_WS_URL").ok().unwrap_or_else(|| {
            info!("🪛️ PNN_NODE_WS_URL is not set. Using the default public node, {DEFAULT_NODE_WS_URL}.");
            DEFAULT_NODE_WS_URL.to_string()
        });
        let serial_port = env::var("PNN_SERIAL_PORT").ok();
        match &serial_port {
            Some(path) => info!("🪛️ Using configured serial device {path}"),
            None => info!("🪛️ PNN_SERIAL_PORT is not set. The piano controller will be discovered."),
        }
        let baud_rate = env::var("PNN_BAUD_RATE")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PNN_BAUD_RATE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_BAUD_RATE);
        let probe_interval_secs = env::var("PNN_DEVICE_PROBE_INTERVAL")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PNN_DEVICE_PROBE_INTERVAL. {e}"))
                    .ok()
            })
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PROBE_INTERVAL_SECS);
        Self {
            host,
            port,
            database_url,
            feed: FeedConfig { ws_url },
            device: DeviceConfig { serial_port, baud_rate, probe_interval_secs },
        }
    }
}
