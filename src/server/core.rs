//! Server core functionality
//!
//! Control listener, accept loop, connection ceiling and start/stop
//! lifecycle. Each accepted connection runs as its own session task.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientRegistry, Session, SessionHandle, TransferControl};
use crate::error::ServerError;
use crate::protocol::{CommandRegistry, CommandResult, responses};
use crate::server::ServerContext;

/// Pause after a failed accept, e.g. when file descriptors run out.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    bind_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    commands: Arc<CommandRegistry>,
    clients: ClientRegistry,
    running: AtomicBool,
    shutdown: Mutex<Option<CancellationToken>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    pub fn new(bind_addr: SocketAddr, ctx: ServerContext) -> Self {
        Self::with_commands(bind_addr, ctx, CommandRegistry::with_defaults())
    }

    /// Server dispatching through a custom command table.
    pub fn with_commands(bind_addr: SocketAddr, ctx: ServerContext, commands: CommandRegistry) -> Self {
        Self {
            bind_addr,
            ctx: Arc::new(ctx),
            commands: Arc::new(commands),
            clients: ClientRegistry::new(),
            running: AtomicBool::new(false),
            shutdown: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address of the bound listener while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live sessions.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Binds the configured address and serves until `token` fires or
    /// `stop` is called.
    pub async fn start(&self, token: CancellationToken) -> Result<(), ServerError> {
        let run_token = self.claim(&token)?;
        let listener = match TcpListener::bind(self.bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.release();
                return Err(ServerError::Bind(self.bind_addr, e));
            }
        };
        self.run(listener, run_token).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener, token: CancellationToken) -> Result<(), ServerError> {
        let run_token = self.claim(&token)?;
        self.run(listener, run_token).await
    }

    /// Stops the accept loop and disconnects every live session.
    ///
    /// Only the first call per run succeeds, even while the run is still
    /// winding down.
    pub fn stop(&self) -> Result<(), ServerError> {
        let token = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match token {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(ServerError::NotRunning),
        }
    }

    /// Marks the server running and installs the token `stop` cancels.
    fn claim(&self, parent: &CancellationToken) -> Result<CancellationToken, ServerError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ServerError::AlreadyRunning)?;
        let run_token = parent.child_token();
        *self.shutdown.lock().unwrap_or_else(PoisonError::into_inner) = Some(run_token.clone());
        Ok(run_token)
    }

    fn release(&self) {
        self.shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.running.store(false, Ordering::SeqCst);
    }

    async fn run(&self, listener: TcpListener, run_token: CancellationToken) -> Result<(), ServerError> {
        let result = self.accept_loop(&listener, &run_token).await;
        // ends every session spawned by this run
        run_token.cancel();
        self.release();
        info!("Server stopped");
        result
    }

    async fn accept_loop(&self, listener: &TcpListener, run_token: &CancellationToken) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(local);
        info!(
            "Starting Rax FTP server on {} (max {} connections)",
            local,
            match self.ctx.settings.max_connections {
                0 => "unlimited".to_string(),
                n => n.to_string(),
            }
        );

        loop {
            let (stream, addr) = tokio::select! {
                biased;
                _ = run_token.cancelled() => return Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::select! {
                            _ = run_token.cancelled() => return Ok(()),
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                        }
                    }
                },
            };
            self.admit(stream, addr, run_token);
        }
    }

    /// Registers and spawns a session, or turns the client away when the
    /// ceiling is reached.
    fn admit(&self, stream: TcpStream, addr: SocketAddr, run_token: &CancellationToken) {
        let token = run_token.child_token();
        let transfer = TransferControl::default();
        let handle = SessionHandle::new(addr, token.clone(), transfer.clone());

        let Some(guard) = self
            .clients
            .try_register(handle, self.ctx.settings.max_connections)
        else {
            warn!("Rejecting client {}: server full", addr);
            tokio::spawn(reject_full(stream));
            return;
        };

        info!("Client {} connected ({} live)", addr, self.clients.len());
        let session = Session::new(
            stream,
            addr,
            Arc::clone(&self.ctx),
            Arc::clone(&self.commands),
            token,
            transfer,
        )
        .with_registration(guard);

        tokio::spawn(async move {
            match session.run().await {
                Ok(end) => debug!("Session {} ended: {:?}", addr, end),
                Err(e) => warn!("Session {} ended with error: {}", addr, e),
            }
        });
    }
}

async fn reject_full(mut stream: TcpStream) {
    let reply = CommandResult::new(responses::CLOSING, "The server is full!");
    let _ = stream.write_all(reply.to_line().as_bytes()).await;
    let _ = stream.shutdown().await;
}
