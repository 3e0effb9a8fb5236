//! Configuration management for the mock tenant server
//!
//! Built-in defaults are layered under an optional `config.toml` and then
//! `MOCK_TENANT_*` environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    pub server: StartupConfig,
    pub limits: LimitsConfig,
}

/// How per-user connection endpoints are exposed
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointMode {
    /// WebSocket route per user, multiplexed on the HTTP listener
    #[default]
    Channel,
    /// Dedicated TCP listener per user, bound from the endpoint port range
    Tcp,
}

/// Network and endpoint settings, read once at startup
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    // ═══ HTTP SHELL ═══
    /// IP address for the HTTP listener and for tcp-mode endpoints
    pub bind_address: String,

    /// Port for the HTTP API
    pub http_port: u16,

    // ═══ CONNECTION ENDPOINTS ═══
    pub endpoint_mode: EndpointMode,

    /// Port range for tcp-mode endpoints (max is exclusive)
    pub endpoint_port_min: u16,
    pub endpoint_port_max: u16,

    /// Buffered events per endpoint channel
    pub channel_capacity: usize,

    // ═══ IDENTITY ═══
    /// How many generated ids to try before giving up
    pub id_generation_attempts: usize,
}

/// Capacity limits for the per-user stores
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Maximum number of state records
    pub max_users: usize,

    /// Maximum number of live connection endpoints
    pub max_endpoints: usize,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            http_port: 3333,
            endpoint_mode: EndpointMode::Channel,
            endpoint_port_min: 4000,
            endpoint_port_max: 4500,
            channel_capacity: 64,
            id_generation_attempts: 8,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_users: 10_000,
            max_endpoints: 10_000,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml (if any) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        // Packaged layout first, then the working directory
        let config_paths = ["mock-tenant-server/config", "config"];

        let path = config_paths
            .iter()
            .find(|path| std::path::Path::new(&format!("{path}.toml")).exists())
            .copied();

        Self::load_from(path)
    }

    /// Load configuration from an explicit file (without extension), or from
    /// defaults and environment alone when `path` is `None`
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("server.bind_address", defaults.server.bind_address.clone())?
            .set_default("server.http_port", i64::from(defaults.server.http_port))?
            .set_default("server.endpoint_mode", "channel")?
            .set_default(
                "server.endpoint_port_min",
                i64::from(defaults.server.endpoint_port_min),
            )?
            .set_default(
                "server.endpoint_port_max",
                i64::from(defaults.server.endpoint_port_max),
            )?
            .set_default(
                "server.channel_capacity",
                defaults.server.channel_capacity as i64,
            )?
            .set_default(
                "server.id_generation_attempts",
                defaults.server.id_generation_attempts as i64,
            )?
            .set_default("limits.max_users", defaults.limits.max_users as i64)?
            .set_default("limits.max_endpoints", defaults.limits.max_endpoints as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("MOCK_TENANT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_port == 0 {
            return Err(ConfigError::Message("http_port cannot be 0".into()));
        }

        if self.server.endpoint_mode == EndpointMode::Tcp
            && self.server.endpoint_port_min >= self.server.endpoint_port_max
        {
            return Err(ConfigError::Message(
                "endpoint_port_min must be less than endpoint_port_max".into(),
            ));
        }

        if self.server.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "channel_capacity must be greater than 0".into(),
            ));
        }

        if self.server.id_generation_attempts == 0 {
            return Err(ConfigError::Message(
                "id_generation_attempts must be greater than 0".into(),
            ));
        }

        if self.limits.max_users == 0 || self.limits.max_endpoints == 0 {
            return Err(ConfigError::Message(
                "max_users and max_endpoints must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Bind address and HTTP port as a socket address string
    pub fn http_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }

    /// Port range for tcp-mode endpoints
    pub fn endpoint_port_range(&self) -> std::ops::Range<u16> {
        self.endpoint_port_min..self.endpoint_port_max
    }

    /// Socket address for a tcp-mode endpoint on `port`
    pub fn endpoint_socket(&self, port: u16) -> Option<SocketAddr> {
        format!("{}:{}", self.bind_address, port).parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.endpoint_mode, EndpointMode::Channel);
        assert_eq!(config.server.http_socket(), "127.0.0.1:3333");
    }

    #[test]
    fn rejects_empty_tcp_port_range() {
        let mut config = ServerConfig::default();
        config.server.endpoint_mode = EndpointMode::Tcp;
        config.server.endpoint_port_min = 5000;
        config.server.endpoint_port_max = 5000;
        assert!(config.validate().is_err());

        // Range is irrelevant in channel mode
        config.server.endpoint_mode = EndpointMode::Channel;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = ServerConfig::default();
        config.limits.max_users = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.id_generation_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_defaults_without_file() {
        let config = ServerConfig::load_from(None).unwrap();
        assert_eq!(config.limits.max_endpoints, 10_000);
        assert_eq!(config.server.endpoint_port_range(), 4000..4500);
    }
}
