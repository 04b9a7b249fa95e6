//! RAX FTP Server - Entry Point
//!
//! Loads `config.toml` (plus `RAX_FTP_*` overrides), serves the configured
//! root directory and stops on Ctrl-C.

use std::sync::Arc;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use rax_ftp_engine::auth::StaticCredentials;
use rax_ftp_engine::storage::LocalFileSystem;
use rax_ftp_engine::{FtpServerError, Server, ServerConfig, ServerContext, SessionSettings, tls};

#[tokio::main]
async fn main() -> Result<(), FtpServerError> {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config = ServerConfig::load(&config_path).inspect_err(|e| error!("{}", e))?;

    info!("Launching FTP server...");
    let storage = LocalFileSystem::new(config.server_root_path())?;
    info!("Server root directory: {}", storage.root().display());

    let credentials = StaticCredentials::new(config.use_authorization, config.users.clone());
    let mut ctx = ServerContext::new(
        Arc::new(storage),
        Arc::new(credentials),
        SessionSettings::from_config(&config)?,
    );
    if let Some((cert, key)) = config.tls_files() {
        ctx = ctx.with_tls(tls::load_acceptor(&cert, &key)?);
        info!("AUTH TLS enabled with certificate {}", cert.display());
    }

    let server = Arc::new(Server::new(config.control_socket()?, ctx));
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            signal_token.cancel();
        }
    });

    server.start(token).await?;
    Ok(())
}
