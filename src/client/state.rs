//! Module `state`
//!
//! Defines `ClientState`, the per-connection protocol state mutated by the
//! command handlers: identity, working directory, negotiated transfer
//! parameters, the pending data connection operation and resume bookkeeping.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::transfer::{
    DataChannel, DataConnectionMode, DataConnectionOperation, FileStructure, TransferType,
};

/// Session identity handed to storage calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub remote_addr: SocketAddr,
    /// Empty until the session is authorized.
    pub username: Option<String>,
}

impl SessionInfo {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            username: None,
        }
    }
}

/// Where the current resume offset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOrigin {
    /// Set by the client with REST; a STOR then carries only the tail.
    Rest,
    /// Replayed by `restore_last_operation`; the source is sent again from
    /// the start and the already delivered prefix is skipped.
    Restore,
}

/// Cancellation handle for whatever transfer is in flight, plus the slot a
/// restore request waits in until the command loop picks it up.
///
/// Shared between the session task and its `SessionHandle`.
#[derive(Debug, Clone, Default)]
pub struct TransferControl {
    current: Arc<Mutex<Option<CancellationToken>>>,
    restore: Arc<Mutex<Option<u64>>>,
    restore_ready: Arc<Notify>,
}

impl TransferControl {
    /// Installs a fresh child of `parent` for one transfer attempt.
    pub fn begin(&self, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    /// Discards the token of the finished attempt.
    pub fn finish(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Cancels the in-flight transfer. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        match self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Asks the session to replay its last cancelled operation from
    /// `offset`. A newer request replaces one not yet picked up.
    pub fn request_restore(&self, offset: u64) {
        *self.restore.lock().unwrap_or_else(PoisonError::into_inner) = Some(offset);
        self.restore_ready.notify_one();
    }

    pub fn take_restore(&self) -> Option<u64> {
        self.restore
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Resolves once a restore has been requested.
    pub async fn restore_requested(&self) {
        self.restore_ready.notified().await;
    }
}

/// Represents the protocol state of a connected FTP client.
#[derive(Debug)]
pub struct ClientState {
    session: SessionInfo,
    pending_username: Option<String>,
    is_authorized: bool,
    current_directory: String,

    connection_mode: DataConnectionMode,
    active_endpoint: Option<SocketAddr>,
    passive_listener: Option<TcpListener>,
    file_structure: FileStructure,
    transfer_type: TransferType,

    pending_operation: Option<DataConnectionOperation>,
    last_operation: Option<DataConnectionOperation>,
    resume_offset: u64,
    resume_origin: ResumeOrigin,
    resume_armed: bool,
    last_cancelled: bool,
    transfer: TransferControl,

    rename_from: Option<String>,
    tls_requested: bool,
    tls_active: bool,
}

impl ClientState {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self::with_transfer_control(remote_addr, TransferControl::default())
    }

    /// State whose transfers are cancelled through `transfer`.
    pub fn with_transfer_control(remote_addr: SocketAddr, transfer: TransferControl) -> Self {
        Self {
            session: SessionInfo::new(remote_addr),
            pending_username: None,
            is_authorized: false,
            current_directory: "/".to_string(),
            connection_mode: DataConnectionMode::default(),
            active_endpoint: None,
            passive_listener: None,
            file_structure: FileStructure::default(),
            transfer_type: TransferType::default(),
            pending_operation: None,
            last_operation: None,
            resume_offset: 0,
            resume_origin: ResumeOrigin::Rest,
            resume_armed: false,
            last_cancelled: false,
            transfer,
            rename_from: None,
            tls_requested: false,
            tls_active: false,
        }
    }

    // --------------------
    // Identity
    // --------------------

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.session.remote_addr
    }

    pub fn username(&self) -> Option<&str> {
        self.session.username.as_deref()
    }

    pub fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    /// Remembers the name given by USER; any earlier login is dropped.
    pub fn set_pending_username(&mut self, username: Option<String>) {
        self.pending_username = username;
        self.is_authorized = false;
        self.session.username = None;
    }

    pub fn pending_username(&self) -> Option<&str> {
        self.pending_username.as_deref()
    }

    /// Marks the session authorized as `username`.
    pub fn authorize(&mut self, username: Option<String>) {
        self.session.username = username;
        self.pending_username = None;
        self.is_authorized = true;
    }

    // --------------------
    // Navigation
    // --------------------

    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    pub fn set_current_directory(&mut self, path: String) {
        self.current_directory = path;
    }

    // --------------------
    // Transfer parameters
    // --------------------

    pub fn connection_mode(&self) -> DataConnectionMode {
        self.connection_mode
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn set_transfer_type(&mut self, transfer_type: TransferType) {
        self.transfer_type = transfer_type;
    }

    pub fn file_structure(&self) -> FileStructure {
        self.file_structure
    }

    pub fn set_file_structure(&mut self, structure: FileStructure) {
        self.file_structure = structure;
    }

    /// Switches to active mode; a previously opened passive listener is closed.
    pub fn set_active(&mut self, endpoint: SocketAddr) {
        self.connection_mode = DataConnectionMode::Active;
        self.active_endpoint = Some(endpoint);
        self.passive_listener = None;
    }

    /// Switches to passive mode with a freshly bound listener.
    pub fn set_passive(&mut self, listener: TcpListener) {
        self.connection_mode = DataConnectionMode::Passive;
        self.passive_listener = Some(listener);
    }

    /// Data channel for the next transfer. A passive listener is handed out
    /// once; the active endpoint stays valid until the next PORT/PASV.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        match self.connection_mode {
            DataConnectionMode::Active => self.active_endpoint.map(DataChannel::Active),
            DataConnectionMode::Passive => {
                let owner = self.session.remote_addr.ip();
                self.passive_listener
                    .take()
                    .map(|listener| DataChannel::Passive(listener, owner))
            }
        }
    }

    // --------------------
    // Operations and resume
    // --------------------

    /// Registers the operation to run once the data channel is open,
    /// replacing any unconsumed one.
    pub fn set_pending_operation(&mut self, operation: DataConnectionOperation) {
        self.pending_operation = Some(operation);
    }

    pub fn pending_operation(&self) -> Option<&DataConnectionOperation> {
        self.pending_operation.as_ref()
    }

    /// Consumes the pending operation and records it as the last one.
    pub fn take_pending_operation(&mut self) -> Option<DataConnectionOperation> {
        let operation = self.pending_operation.take()?;
        self.last_operation = Some(operation.clone());
        Some(operation)
    }

    pub fn last_operation(&self) -> Option<&DataConnectionOperation> {
        self.last_operation.as_ref()
    }

    pub fn resume_offset(&self) -> u64 {
        self.resume_offset
    }

    pub fn resume_origin(&self) -> ResumeOrigin {
        self.resume_origin
    }

    /// Offset requested with REST for the next transfer.
    pub fn set_rest_offset(&mut self, offset: u64) {
        self.resume_offset = offset;
        self.resume_origin = ResumeOrigin::Rest;
        self.resume_armed = true;
    }

    /// Offset to apply to the transfer about to start. An offset left over
    /// from a cancelled attempt only counts once restored; a fresh transfer
    /// starts from zero.
    pub fn begin_resume(&mut self) -> Option<(u64, ResumeOrigin)> {
        if std::mem::take(&mut self.resume_armed) && self.resume_offset > 0 {
            Some((self.resume_offset, self.resume_origin))
        } else {
            self.resume_offset = 0;
            None
        }
    }

    /// Records how a transfer attempt ended. A completed attempt clears the
    /// resume offset; a cancelled one keeps the offset it reached.
    pub fn record_transfer_outcome(&mut self, offset: u64, cancelled: bool) {
        self.last_cancelled = cancelled;
        self.resume_offset = if cancelled { offset } else { 0 };
    }

    /// Clears the offset after a transfer that could not resume.
    pub fn clear_resume(&mut self) {
        self.resume_offset = 0;
        self.resume_armed = false;
        self.last_cancelled = false;
    }

    /// Re-registers the last operation so it continues from `offset`.
    ///
    /// Only valid after a cancelled attempt. Returns false otherwise.
    pub fn restore_last_operation(&mut self, offset: u64) -> bool {
        if !self.last_cancelled {
            return false;
        }
        let Some(operation) = self.last_operation.clone() else {
            return false;
        };
        self.pending_operation = Some(operation);
        self.resume_offset = offset;
        self.resume_origin = ResumeOrigin::Restore;
        self.resume_armed = true;
        self.last_cancelled = false;
        true
    }

    pub fn transfer_control(&self) -> &TransferControl {
        &self.transfer
    }

    // --------------------
    // Rename and TLS
    // --------------------

    pub fn set_rename_from(&mut self, path: Option<String>) {
        self.rename_from = path;
    }

    pub fn take_rename_from(&mut self) -> Option<String> {
        self.rename_from.take()
    }

    /// Set by AUTH once a 234 has been decided; the session performs the
    /// handshake after writing the reply.
    pub fn request_tls(&mut self) {
        self.tls_requested = true;
    }

    pub fn take_tls_request(&mut self) -> bool {
        std::mem::take(&mut self.tls_requested)
    }

    pub fn is_tls_active(&self) -> bool {
        self.tls_active
    }

    pub fn set_tls_active(&mut self) {
        self.tls_active = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferKind;

    fn state() -> ClientState {
        ClientState::new("127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn starts_at_root_unauthorized() {
        let state = state();
        assert_eq!(state.current_directory(), "/");
        assert!(!state.is_authorized());
        assert_eq!(state.username(), None);
        assert_eq!(state.transfer_type(), TransferType::Ascii);
    }

    #[test]
    fn new_operation_supersedes_pending_one() {
        let mut state = state();
        state.set_pending_operation(DataConnectionOperation::new(TransferKind::Store, "/a"));
        state.set_pending_operation(DataConnectionOperation::new(TransferKind::Retrieve, "/b"));
        let op = state.take_pending_operation().unwrap();
        assert_eq!(op.kind, TransferKind::Retrieve);
        assert!(state.take_pending_operation().is_none());
        assert_eq!(state.last_operation(), Some(&op));
    }

    #[test]
    fn cancelled_transfer_keeps_offset_for_restore() {
        let mut state = state();
        state.set_pending_operation(DataConnectionOperation::new(TransferKind::Store, "/f"));
        state.take_pending_operation();
        state.record_transfer_outcome(1234, true);
        assert_eq!(state.resume_offset(), 1234);

        assert!(state.restore_last_operation(1234));
        assert_eq!(state.pending_operation().unwrap().path, "/f");
        assert_eq!(state.begin_resume(), Some((1234, ResumeOrigin::Restore)));
        assert!(!state.restore_last_operation(1234));
    }

    #[test]
    fn fresh_transfer_ignores_leftover_offset() {
        let mut state = state();
        state.record_transfer_outcome(500, true);
        assert_eq!(state.begin_resume(), None);
        assert_eq!(state.resume_offset(), 0);

        state.set_rest_offset(42);
        assert_eq!(state.begin_resume(), Some((42, ResumeOrigin::Rest)));
    }

    #[test]
    fn completed_transfer_clears_offset() {
        let mut state = state();
        state.set_rest_offset(10);
        state.record_transfer_outcome(100, false);
        assert_eq!(state.resume_offset(), 0);
        assert!(!state.restore_last_operation(0));
    }

    #[test]
    fn transfer_control_stops_only_running_attempt() {
        let control = TransferControl::default();
        assert!(!control.stop());
        let parent = CancellationToken::new();
        let token = control.begin(&parent);
        assert!(control.stop());
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
        control.finish();
        assert!(!control.stop());
    }

    #[tokio::test]
    async fn passive_listener_is_consumed_once() {
        let mut state = state();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        state.set_passive(listener);
        assert!(matches!(state.take_data_channel(), Some(DataChannel::Passive(..))));
        assert!(state.take_data_channel().is_none());

        let endpoint = "127.0.0.1:2000".parse().unwrap();
        state.set_active(endpoint);
        assert!(matches!(state.take_data_channel(), Some(DataChannel::Active(a)) if a == endpoint));
        assert!(matches!(state.take_data_channel(), Some(DataChannel::Active(_))));
    }

    #[tokio::test]
    async fn restore_request_is_kept_until_taken() {
        let control = TransferControl::default();
        assert_eq!(control.take_restore(), None);

        control.request_restore(10);
        control.request_restore(20);
        // the stored permit makes a later wait return at once
        tokio::time::timeout(std::time::Duration::from_secs(1), control.restore_requested())
            .await
            .unwrap();
        assert_eq!(control.take_restore(), Some(20));
        assert_eq!(control.take_restore(), None);
    }
}
