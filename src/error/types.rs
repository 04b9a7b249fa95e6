//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Authentication module errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid password for user: {0}")]
    InvalidPassword(String),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),
    #[error("File already exists: {0}")]
    FileAlreadyExists(String),
    #[error("Restart offset {1} is past the end of {0}")]
    InvalidOffset(String, u64),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Data channel and transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to bind to {0}: {1}")]
    PortBindingFailed(SocketAddr, io::Error),
    #[error("No available port for data connection")]
    NoAvailablePort,
    #[error("Timeout waiting for data connection with {0}")]
    ConnectionTimeout(String),
    #[error("Failed to connect to {0}: {1}")]
    ConnectFailed(SocketAddr, io::Error),
    #[error("Failed to accept data connection: {0}")]
    AcceptFailed(io::Error),
    #[error("Invalid PORT command: {0}")]
    InvalidPortCommand(String),
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] io::Error),
}

/// Navigate module errors
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("Empty path provided")]
    EmptyPath,
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
}

/// TLS setup and handshake errors
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to load TLS certificate: {0}")]
    CertificateLoad(String),
    #[error("Failed to load TLS private key: {0}")]
    PrivateKeyLoad(String),
    #[error("TLS configuration error: {0}")]
    Config(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(io::Error),
    #[error("TLS not configured")]
    NotConfigured,
    #[error("Control connection already encrypted")]
    AlreadyUpgraded,
    #[error("Unread plaintext pending before TLS handshake")]
    PendingPlaintext,
}

/// Errors that end a control session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Control connection I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Control connection upgrade failed: {0}")]
    Tls(#[from] TlsError),
    #[error("Control connection closed")]
    Closed,
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Port {0} is outside [0, 65536)")]
    InvalidPort(i64),
    #[error("max_connections must be >= 0, got {0}")]
    InvalidMaxConnections(i64),
    #[error("Invalid bind address {0}")]
    InvalidAddress(String),
    #[error("server_root cannot be empty")]
    EmptyServerRoot,
    #[error("data_port_min ({0}) must not exceed data_port_max ({1})")]
    InvalidPortRange(u16, u16),
    #[error("buffer_size must be greater than 0")]
    InvalidBufferSize,
    #[error("tls_cert_file and tls_key_file must be set together")]
    IncompleteTls,
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Listener lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,
    #[error("Server is not running")]
    NotRunning,
    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, io::Error),
    #[error("Server I/O error: {0}")]
    Io(#[from] io::Error),
}

/// General FTP server error that encompasses all error types
#[derive(Debug, Error)]
pub enum FtpServerError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
    #[error("Navigate error: {0}")]
    Navigate(#[from] NavigateError),
    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
