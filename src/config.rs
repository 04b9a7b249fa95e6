//! Configuration management for the RAX FTP engine
//!
//! Settings come from an optional `config.toml` with `RAX_FTP_*` environment
//! overrides (`RAX_FTP_CONTROL_PORT=2121`, `RAX_FTP_MAX_CONNECTIONS=50`, ...).
//! Every loaded configuration is validated before use.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the control listener binds to
    pub bind_address: String,

    /// Control connection port; 0 picks an ephemeral port
    pub control_port: i64,

    /// Live session ceiling; 0 disables it
    pub max_connections: i64,

    /// Address announced and bound for PASV/EPSV; defaults to `bind_address`
    pub passive_address: Option<String>,

    /// Port range for passive listeners; both unset means ephemeral ports
    pub data_port_min: Option<u16>,
    pub data_port_max: Option<u16>,

    // ═══ STORAGE ═══
    /// Root directory of the local storage backend
    pub server_root: String,

    // ═══ TRANSFER BEHAVIOUR ═══
    /// Chunk size of the transfer engine
    pub buffer_size: usize,

    /// Bound on dialing or accepting a data connection
    pub data_connection_timeout_secs: u64,

    /// Longest accepted control line, terminator excluded
    pub max_command_length: usize,

    // ═══ AUTHORIZATION ═══
    pub use_authorization: bool,

    /// username -> password
    pub users: HashMap<String, String>,

    // ═══ TLS ═══
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            max_connections: 10,
            passive_address: None,
            data_port_min: Some(2122),
            data_port_max: Some(2222),
            server_root: "./server_root".to_string(),
            buffer_size: 8192,
            data_connection_timeout_secs: 30,
            max_command_length: 512,
            use_authorization: false,
            users: HashMap::new(),
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

impl ServerConfig {
    /// Loads `path` (extension optional, file optional) with environment
    /// overrides, then validates the result.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("RAX_FTP")
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
        if !(0..65536).contains(&self.control_port) {
            return Err(ConfigError::InvalidPort(self.control_port));
        }

        if self.max_connections < 0 {
            return Err(ConfigError::InvalidMaxConnections(self.max_connections));
        }

        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidAddress(self.bind_address.clone()));
        }

        if let Some(addr) = &self.passive_address {
            if addr.parse::<IpAddr>().is_err() {
                return Err(ConfigError::InvalidAddress(addr.clone()));
            }
        }

        if self.server_root.trim().is_empty() {
            return Err(ConfigError::EmptyServerRoot);
        }

        if let (Some(min), Some(max)) = (self.data_port_min, self.data_port_max) {
            if min > max {
                return Err(ConfigError::InvalidPortRange(min, max));
            }
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }

        if self.tls_cert_file.is_some() != self.tls_key_file.is_some() {
            return Err(ConfigError::IncompleteTls);
        }

        Ok(())
    }

    /// Control listener address
    pub fn control_socket(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidAddress(self.bind_address.clone()))?;
        let port =
            u16::try_from(self.control_port).map_err(|_| ConfigError::InvalidPort(self.control_port))?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Address used for passive listeners
    pub fn passive_ip(&self) -> Result<IpAddr, ConfigError> {
        let addr = self.passive_address.as_deref().unwrap_or(&self.bind_address);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr.to_string()))
    }

    /// Passive port range; a single bound pins both ends
    pub fn data_port_range(&self) -> Option<(u16, u16)> {
        match (self.data_port_min, self.data_port_max) {
            (Some(min), Some(max)) => Some((min, max)),
            (Some(port), None) | (None, Some(port)) => Some((port, port)),
            (None, None) => None,
        }
    }

    /// Session ceiling, 0 meaning unlimited
    pub fn connection_limit(&self) -> usize {
        usize::try_from(self.max_connections).unwrap_or(0)
    }

    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn data_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connection_timeout_secs)
    }

    /// Certificate and key paths when TLS is configured
    pub fn tls_files(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_socket().unwrap(), "127.0.0.1:2121".parse().unwrap());
        assert_eq!(config.data_port_range(), Some((2122, 2222)));
    }

    #[test]
    fn rejects_out_of_range_ports() {
        for port in [-1, 65536, 100_000] {
            let config = ServerConfig {
                control_port: port,
                ..ServerConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(p)) if p == port));
        }
        let edge = ServerConfig {
            control_port: 0,
            ..ServerConfig::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn rejects_negative_ceiling_and_accepts_zero() {
        let negative = ServerConfig {
            max_connections: -1,
            ..ServerConfig::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidMaxConnections(-1))
        ));

        let unlimited = ServerConfig {
            max_connections: 0,
            ..ServerConfig::default()
        };
        assert!(unlimited.validate().is_ok());
        assert_eq!(unlimited.connection_limit(), 0);
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let reversed = ServerConfig {
            data_port_min: Some(3000),
            data_port_max: Some(2000),
            ..ServerConfig::default()
        };
        assert!(matches!(
            reversed.validate(),
            Err(ConfigError::InvalidPortRange(3000, 2000))
        ));

        let half_tls = ServerConfig {
            tls_cert_file: Some("cert.pem".into()),
            ..ServerConfig::default()
        };
        assert!(matches!(half_tls.validate(), Err(ConfigError::IncompleteTls)));

        let no_root = ServerConfig {
            server_root: " ".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(no_root.validate(), Err(ConfigError::EmptyServerRoot)));
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
bind_address = "0.0.0.0"
control_port = 2100
max_connections = 3
use_authorization = true

[users]
alice = "alice123"
"#,
        )
        .unwrap();

        let config = ServerConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.control_port, 2100);
        assert_eq!(config.max_connections, 3);
        assert!(config.use_authorization);
        assert_eq!(config.users.get("alice").map(String::as_str), Some("alice123"));
        // missing keys keep their defaults
        assert_eq!(config.buffer_size, 8192);
    }

    #[test]
    fn load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "control_port = 70000\n").unwrap();
        assert!(matches!(
            ServerConfig::load(path.to_str().unwrap()),
            Err(ConfigError::InvalidPort(70000))
        ));
    }
}
