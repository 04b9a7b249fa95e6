//! Client session management
//!
//! Drives one control connection: greeting, command loop, data phases and
//! teardown. The next command is not read until a data phase has finished.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Local;
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::client::events::SessionObserver;
use crate::client::registry::RegistrationGuard;
use crate::client::state::{ClientState, ResumeOrigin, TransferControl};
use crate::client::transport::{ControlTransport, ReadLine};
use crate::error::{FtpServerError, SessionError, TlsError, TransferError, error_to_ftp_code};
use crate::protocol::handlers::transfer::opening;
use crate::protocol::responses;
use crate::protocol::{Command, CommandRegistry, CommandResult};
use crate::server::ServerContext;
use crate::storage::listing::{format_long, format_names};
use crate::transfer::{
    CopyOptions, CopyOutcome, DataConnectionOperation, LineDirection, TransferKind, TransferType,
    copy_stream,
};

/// How the command loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// A 221 reply was written (QUIT).
    Quit,
    /// The peer closed its side.
    PeerClosed,
    /// Disconnected by the connection manager or server shutdown.
    Kicked,
}

/// One control connection.
pub struct Session {
    state: ClientState,
    transport: ControlTransport,
    ctx: Arc<ServerContext>,
    commands: Arc<CommandRegistry>,
    token: CancellationToken,
    connected_notified: bool,
    _registration: Option<RegistrationGuard>,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        remote_addr: SocketAddr,
        ctx: Arc<ServerContext>,
        commands: Arc<CommandRegistry>,
        token: CancellationToken,
        transfer: TransferControl,
    ) -> Self {
        let transport = ControlTransport::new(stream, ctx.settings.max_command_length);
        Self {
            state: ClientState::with_transfer_control(remote_addr, transfer),
            transport,
            ctx,
            commands,
            token,
            connected_notified: false,
            _registration: None,
        }
    }

    /// Ties the registry slot to this session; it is freed on drop.
    pub fn with_registration(mut self, guard: RegistrationGuard) -> Self {
        self._registration = Some(guard);
        self
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Runs the session to completion and tears it down.
    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        let result = self.serve().await;
        self.teardown().await;
        result
    }

    async fn serve(&mut self) -> Result<SessionEnd, SessionError> {
        self.write(&CommandResult::new(responses::READY, "Service Ready."))
            .await?;
        if !self.ctx.use_authorization() {
            self.notify_connected();
        }
        let control = self.state.transfer_control().clone();

        loop {
            let read = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    let _ = self.write(&CommandResult::new(responses::CLOSING, "Bye!")).await;
                    return Ok(SessionEnd::Kicked);
                }
                _ = control.restore_requested() => {
                    self.restore().await?;
                    continue;
                }
                read = self.transport.read_line() => read?,
            };

            let line = match read {
                ReadLine::Line(line) => line,
                ReadLine::Closed => return Ok(SessionEnd::PeerClosed),
                ReadLine::TooLong => {
                    warn!("[{}] Command too long", self.state.remote_addr());
                    self.write(&CommandResult::new(responses::SYNTAX_ERROR, "Command too long."))
                        .await?;
                    continue;
                }
            };

            let command = Command::parse(&line);
            info!("[{}][{}] C -> S: {}", self.state.remote_addr(), self.user(), command);

            let result = self
                .commands
                .dispatch(&mut self.state, &self.ctx, &command)
                .await;
            self.write(&result).await?;

            if !self.connected_notified && self.state.is_authorized() {
                self.notify_connected();
            }

            if result.is_closing() {
                return Ok(SessionEnd::Quit);
            }

            if self.state.take_tls_request() {
                self.upgrade().await?;
            }

            if result.code == responses::OPENING_DATA_CONNECTION {
                self.data_phase().await?;
            }
        }
    }

    /// Replays the last cancelled operation for a restore request.
    async fn restore(&mut self) -> Result<(), SessionError> {
        let Some(offset) = self.state.transfer_control().take_restore() else {
            return Ok(());
        };
        if !self.state.restore_last_operation(offset) {
            warn!(
                "[{}] Restore at {} ignored: no cancelled transfer",
                self.state.remote_addr(),
                offset
            );
            return Ok(());
        }
        let Some(kind) = self.state.pending_operation().map(|op| op.kind) else {
            return Ok(());
        };
        info!("[{}] Restoring {} at {}", self.state.remote_addr(), kind.verb(), offset);
        self.write(&opening(&self.state, kind)).await?;
        self.data_phase().await
    }

    async fn upgrade(&mut self) -> Result<(), SessionError> {
        let acceptor = self.ctx.tls.clone().ok_or(TlsError::NotConfigured)?;
        self.transport.upgrade(&acceptor).await?;
        self.state.set_tls_active();
        info!("[{}] Control connection secured", self.state.remote_addr());
        Ok(())
    }

    /// Opens the data channel, runs the pending operation and writes its
    /// final reply.
    async fn data_phase(&mut self) -> Result<(), SessionError> {
        let Some(operation) = self.state.take_pending_operation() else {
            return Ok(());
        };
        let result = self.execute(operation).await;
        self.write(&result).await
    }

    async fn execute(&mut self, operation: DataConnectionOperation) -> CommandResult {
        let addr = self.state.remote_addr();
        let resume = self.state.begin_resume();

        let Some(channel) = self.state.take_data_channel() else {
            warn!("[{}] {}: no data channel negotiated", addr, operation);
            return cant_open();
        };

        let control = self.state.transfer_control().clone();
        let token = control.begin(&self.token);

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => Err(TransferError::ConnectionTimeout("cancelled".into())),
            opened = channel.open(self.ctx.settings.data_timeout) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                control.finish();
                warn!("[{}] {}: {}", addr, operation, e);
                return cant_open();
            }
        };
        debug!("[{}] Data connection open for {}", addr, operation);
        self.ctx
            .observer
            .on_transfer_started(self.state.session(), &operation);

        let outcome = self.transfer(&operation, &mut stream, resume, &token).await;
        let _ = stream.shutdown().await;
        drop(stream);
        control.finish();

        match outcome {
            Ok(outcome) => {
                self.ctx.observer.on_transfer_finished(
                    self.state.session(),
                    &operation,
                    outcome.offset,
                    outcome.cancelled,
                );
                if operation.kind.is_resumable() {
                    self.state
                        .record_transfer_outcome(outcome.offset, outcome.cancelled);
                } else {
                    self.state.clear_resume();
                }
                if outcome.cancelled {
                    aborted()
                } else {
                    CommandResult::new(responses::TRANSFER_COMPLETE, "Transfer complete.")
                }
            }
            Err(e) => {
                error!("[{}] {} failed: {}", addr, operation, e);
                self.state.clear_resume();
                match error_to_ftp_code(&e) {
                    responses::TRANSFER_ABORTED => aborted(),
                    code => CommandResult::new(code, "Requested action not taken."),
                }
            }
        }
    }

    /// Moves the bytes of one operation over an open data stream.
    async fn transfer(
        &self,
        operation: &DataConnectionOperation,
        stream: &mut TcpStream,
        resume: Option<(u64, ResumeOrigin)>,
        token: &CancellationToken,
    ) -> Result<CopyOutcome, FtpServerError> {
        let storage = self.ctx.storage.as_ref();
        let session = self.state.session();
        let observer: &dyn SessionObserver = self.ctx.observer.as_ref();
        let progress = |offset: u64, chunk: usize| {
            observer.on_progress(session, operation, offset, chunk);
        };
        let mut options = CopyOptions {
            buffer_size: self.ctx.settings.buffer_size,
            transfer_type: self.state.transfer_type(),
            direction: operation.kind.direction(),
            resume_offset: 0,
        };
        let path = operation.path.as_str();

        let outcome = match operation.kind {
            TransferKind::Retrieve => {
                options.resume_offset = resume.map_or(0, |(offset, _)| offset);
                let mut source = storage.download(session, path).await?;
                copy_stream(&mut source, stream, &options, token, progress).await
            }
            TransferKind::Store | TransferKind::Append => {
                // a replayed source starts over, so its delivered prefix is skipped
                if let Some((offset, ResumeOrigin::Restore)) = resume {
                    options.resume_offset = offset;
                }
                let mut sink = match resume {
                    _ if operation.kind == TransferKind::Append => {
                        storage.append(session, path).await?
                    }
                    Some((offset, _)) => storage.upload_at(session, path, offset).await?,
                    None => storage.upload(session, path).await?,
                };
                copy_stream(stream, &mut sink, &options, token, progress).await
            }
            TransferKind::List | TransferKind::NameList => {
                let listing = storage.list(session, path).await?;
                let body = if operation.kind == TransferKind::List {
                    format_long(&listing, Local::now())
                } else {
                    format_names(&listing)
                };
                // listings are produced with CRLF already
                options.transfer_type = TransferType::Binary;
                options.direction = LineDirection::ToNetwork;
                let mut source = body.as_bytes();
                copy_stream(&mut source, stream, &options, token, progress).await
            }
        };
        outcome.map_err(|e| TransferError::TransferFailed(e).into())
    }

    fn notify_connected(&mut self) {
        self.connected_notified = true;
        self.ctx.observer.on_connected(self.state.session());
    }

    fn user(&self) -> &str {
        self.state
            .username()
            .or(self.state.pending_username())
            .unwrap_or("-")
    }

    async fn write(&mut self, result: &CommandResult) -> Result<(), SessionError> {
        self.transport.write_line(&result.to_line()).await?;
        info!("[{}][{}] S -> C: {}", self.state.remote_addr(), self.user(), result);
        Ok(())
    }

    async fn teardown(&mut self) {
        self.state.transfer_control().stop();
        self.transport.shutdown().await;
        self.ctx.observer.on_end_of_processing(self.state.session());
    }
}

fn cant_open() -> CommandResult {
    CommandResult::new(responses::CANT_OPEN_DATA_CONNECTION, "Can't open data connection.")
}

fn aborted() -> CommandResult {
    CommandResult::new(responses::TRANSFER_ABORTED, "Connection closed; transfer aborted.")
}
