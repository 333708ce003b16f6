//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables (`DATABASE_URL`, `NATS__URL`,
//! `RELAY__BASE_URL`, ...).

use serde::Deserialize;

/// Server configuration composed from section configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// NATS inbound-message stream configuration.
    #[serde(default)]
    pub nats: NatsConfig,

    /// Messaging relay configuration.
    pub relay: RelayConfig,

    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSettings,
}

/// NATS connection and subject configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub url: String,

    /// Subject the channel-webhook adapter publishes inbound messages on.
    #[serde(default = "default_inbound_subject")]
    pub inbound_subject: String,
}

/// The relay service that speaks the chat provider's wire protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Base URL outbound sends are posted to.
    pub base_url: String,

    /// Per-send timeout in seconds.
    #[serde(default = "default_relay_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Engine tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Maximum nodes dispatched per invocation.
    #[serde(default = "default_step_ceiling")]
    pub step_ceiling: u32,

    /// Interval between due-timer sweeps, in seconds.
    #[serde(default = "default_timer_poll_seconds")]
    pub timer_poll_seconds: u64,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_inbound_subject() -> String {
    "copper-sparrow.inbound".to_string()
}

fn default_relay_timeout_seconds() -> u64 {
    10
}

fn default_step_ceiling() -> u32 {
    256
}

fn default_timer_poll_seconds() -> u64 {
    5
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            inbound_subject: default_inbound_subject(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            step_ceiling: default_step_ceiling(),
            timer_poll_seconds: default_timer_poll_seconds(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_settings_have_safe_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.step_ceiling, 256);
        assert_eq!(settings.timer_poll_seconds, 5);
    }

    #[test]
    fn nats_defaults_point_at_localhost() {
        let nats = NatsConfig::default();
        assert_eq!(nats.url, "nats://localhost:4222");
        assert_eq!(nats.inbound_subject, "copper-sparrow.inbound");
    }
}
