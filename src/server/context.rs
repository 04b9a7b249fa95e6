//! Shared server context
//!
//! Collaborators and settings every session and handler reads. Built once
//! per server and shared behind an `Arc`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_rustls::TlsAcceptor;

use crate::auth::Authorization;
use crate::client::{LoggingObserver, SessionObserver};
use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::storage::Storage;

/// Per-session settings derived from `ServerConfig`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub passive_ip: IpAddr,
    pub passive_ports: Option<(u16, u16)>,
    pub buffer_size: usize,
    pub data_timeout: Duration,
    pub max_command_length: usize,
    pub max_connections: usize,
}

impl SessionSettings {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            passive_ip: config.passive_ip()?,
            passive_ports: config.data_port_range(),
            buffer_size: config.buffer_size,
            data_timeout: config.data_connection_timeout(),
            max_command_length: config.max_command_length,
            max_connections: config.connection_limit(),
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            passive_ip: IpAddr::from([127, 0, 0, 1]),
            passive_ports: None,
            buffer_size: 8192,
            data_timeout: Duration::from_secs(30),
            max_command_length: 512,
            max_connections: 0,
        }
    }
}

pub struct ServerContext {
    pub storage: Arc<dyn Storage>,
    pub authorization: Arc<dyn Authorization>,
    pub tls: Option<TlsAcceptor>,
    pub observer: Arc<dyn SessionObserver>,
    pub settings: SessionSettings,
}

impl ServerContext {
    pub fn new(
        storage: Arc<dyn Storage>,
        authorization: Arc<dyn Authorization>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            storage,
            authorization,
            tls: None,
            observer: Arc::new(LoggingObserver),
            settings,
        }
    }

    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn use_authorization(&self) -> bool {
        self.authorization.use_authorization()
    }
}
