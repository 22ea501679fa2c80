use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::dispatch::DispatchConfig;
use crate::gateway::GatewayConfig;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway used by sessions that do not bring their own credentials
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub otel: OtelConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Console log output
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Largest accepted request body (CSV uploads included)
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    /// Lower bound of the delay between sends, in milliseconds
    #[serde(default = "default_pacing_min_ms")]
    pub pacing_min_ms: u64,
    /// Upper bound of the delay between sends, in milliseconds
    #[serde(default = "default_pacing_max_ms")]
    pub pacing_max_ms: u64,
    #[serde(default = "default_pause_poll_interval_ms")]
    pub pause_poll_interval_ms: u64,
    #[serde(default = "default_message_ttl_seconds")]
    pub message_ttl_seconds: u64,
    /// Upper bound on one send; unset means wait for the gateway
    #[serde(default)]
    pub send_timeout_ms: Option<u64>,
    #[serde(default = "default_max_recipients")]
    pub max_recipients: usize,
    /// How long shutdown waits for cancelled sessions to wind down, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024 // 10 MB
}

fn default_pacing_min_ms() -> u64 {
    1000
}

fn default_pacing_max_ms() -> u64 {
    2000
}

fn default_pause_poll_interval_ms() -> u64 {
    100
}

fn default_message_ttl_seconds() -> u64 {
    3600 // 1 hour
}

fn default_max_recipients() -> usize {
    10_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "wa-bulk-sender".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("dispatch.pacing_min_ms", 1000)?
            .set_default("dispatch.pacing_max_ms", 2000)?
            .set_default("dispatch.message_ttl_seconds", 3600)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_PORT, GATEWAY_ENDPOINT, GATEWAY_USERNAME, OTEL_ENABLED, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether a usable default gateway is configured
    pub fn has_default_gateway(&self) -> bool {
        self.gateway.validate().is_empty()
    }
}

impl DispatchSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl From<&DispatchSettings> for DispatchConfig {
    fn from(settings: &DispatchSettings) -> Self {
        let (min, max) = if settings.pacing_min_ms <= settings.pacing_max_ms {
            (settings.pacing_min_ms, settings.pacing_max_ms)
        } else {
            (settings.pacing_max_ms, settings.pacing_min_ms)
        };

        Self {
            pacing_min: Duration::from_millis(min),
            pacing_max: Duration::from_millis(max),
            pause_poll_interval: Duration::from_millis(settings.pause_poll_interval_ms.max(1)),
            message_ttl_seconds: settings.message_ttl_seconds,
            send_timeout: settings.send_timeout_ms.map(Duration::from_millis),
            max_recipients: settings.max_recipients,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            pacing_min_ms: default_pacing_min_ms(),
            pacing_max_ms: default_pacing_max_ms(),
            pause_poll_interval_ms: default_pause_poll_interval_ms(),
            message_ttl_seconds: default_message_ttl_seconds(),
            send_timeout_ms: None,
            max_recipients: default_max_recipients(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8081);

        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8081");
        assert!(!settings.has_default_gateway());
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_dispatch_config_conversion() {
        let config = DispatchConfig::from(&DispatchSettings::default());
        assert_eq!(config.pacing_min, Duration::from_millis(1000));
        assert_eq!(config.pacing_max, Duration::from_millis(2000));
        assert_eq!(config.message_ttl_seconds, 3600);
        assert!(config.send_timeout.is_none());
    }

    #[test]
    fn test_inverted_pacing_window_is_swapped() {
        let settings = DispatchSettings {
            pacing_min_ms: 500,
            pacing_max_ms: 100,
            send_timeout_ms: Some(2500),
            ..DispatchSettings::default()
        };
        let config = DispatchConfig::from(&settings);
        assert_eq!(config.pacing_min, Duration::from_millis(100));
        assert_eq!(config.pacing_max, Duration::from_millis(500));
        assert_eq!(config.send_timeout, Some(Duration::from_millis(2500)));
    }
}
