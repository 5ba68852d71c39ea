use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use tracing::level_filters::LevelFilter;

use crate::poller::PollerSettings;

/// Tunnel address of the original deployment.
pub const DEFAULT_BASE_URL: &str = "https://topologic-quarrelingly-terri.ngrok-free.app";

/// Remote control for a distance sensor and two character displays.
#[derive(Parser, Debug, Clone)]
#[command(name = "lcd-remote", version)]
pub struct Config {
    /// Base URL of the device's HTTP control API.
    #[arg(long, env = "LCD_REMOTE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Milliseconds between telemetry cycles.
    #[arg(
        long,
        env = "LCD_REMOTE_POLL_INTERVAL_MS",
        default_value_t = 1500,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    /// Milliseconds to wait for a telemetry response before giving up.
    #[arg(
        long,
        env = "LCD_REMOTE_FETCH_TIMEOUT_MS",
        default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub fetch_timeout_ms: u64,

    /// Maximum log level written to stderr (off, error, warn, info, debug, trace).
    #[arg(long, env = "LCD_REMOTE_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Config {
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }
}
