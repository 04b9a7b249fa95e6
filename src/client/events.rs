//! Session lifecycle events
//!
//! Hooks fired by a session as it connects, moves data and ends. Every hook
//! has an empty default so observers implement only what they need.

use log::{debug, info};

use crate::client::SessionInfo;
use crate::transfer::DataConnectionOperation;

pub trait SessionObserver: Send + Sync {
    /// Fired once per session: at the greeting when authorization is off,
    /// otherwise after the first command that leaves the session authorized.
    fn on_connected(&self, _session: &SessionInfo) {}

    /// Fired once the data connection of an operation is open.
    fn on_transfer_started(&self, _session: &SessionInfo, _operation: &DataConnectionOperation) {}

    /// Fired after each chunk of a transfer.
    fn on_progress(
        &self,
        _session: &SessionInfo,
        _operation: &DataConnectionOperation,
        _offset: u64,
        _chunk: usize,
    ) {
    }

    fn on_transfer_finished(
        &self,
        _session: &SessionInfo,
        _operation: &DataConnectionOperation,
        _offset: u64,
        _cancelled: bool,
    ) {
    }

    /// Fired once when the session is torn down, whatever the cause.
    fn on_end_of_processing(&self, _session: &SessionInfo) {}
}

/// Observer that writes lifecycle events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_connected(&self, session: &SessionInfo) {
        info!(
            "Client {} connected as {}",
            session.remote_addr,
            session.username.as_deref().unwrap_or("anonymous")
        );
    }

    fn on_transfer_started(&self, session: &SessionInfo, operation: &DataConnectionOperation) {
        info!("[{}] {} started", session.remote_addr, operation);
    }

    fn on_progress(
        &self,
        session: &SessionInfo,
        operation: &DataConnectionOperation,
        offset: u64,
        chunk: usize,
    ) {
        debug!(
            "[{}] {}: {} bytes (+{})",
            session.remote_addr, operation, offset, chunk
        );
    }

    fn on_transfer_finished(
        &self,
        session: &SessionInfo,
        operation: &DataConnectionOperation,
        offset: u64,
        cancelled: bool,
    ) {
        if cancelled {
            info!(
                "[{}] {} cancelled at offset {}",
                session.remote_addr, operation, offset
            );
        } else {
            info!("[{}] {} finished, {} bytes", session.remote_addr, operation, offset);
        }
    }

    fn on_end_of_processing(&self, session: &SessionInfo) {
        info!("Client {} disconnected", session.remote_addr);
    }
}
