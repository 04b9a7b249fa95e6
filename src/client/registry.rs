//! Client registry
//!
//! Live set of sessions and the connection ceiling. A slot is taken
//! atomically with the ceiling check and released by dropping the returned
//! guard.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::client::TransferControl;

/// Control handle on a live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    remote_addr: SocketAddr,
    token: CancellationToken,
    transfer: TransferControl,
}

impl SessionHandle {
    pub fn new(remote_addr: SocketAddr, token: CancellationToken, transfer: TransferControl) -> Self {
        Self {
            remote_addr,
            token,
            transfer,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Token cancelled when the session must end.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn transfer_control(&self) -> &TransferControl {
        &self.transfer
    }

    /// Cancels the in-flight transfer and leaves the session running.
    pub fn stop_transfer(&self) -> bool {
        self.transfer.stop()
    }

    /// Replays the last cancelled transfer from `offset` once the session is
    /// between commands.
    pub fn restore_transfer(&self, offset: u64) {
        self.transfer.request_restore(offset);
    }

    /// Disconnects the session. The client is told `221 Bye!` when the
    /// control connection can still be written.
    pub fn kick(&self) {
        self.token.cancel();
    }
}

type Sessions = Arc<Mutex<HashMap<SocketAddr, SessionHandle>>>;

/// Registry for tracking active sessions
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    sessions: Sessions,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handle` unless `max_connections` live sessions already
    /// exist. Zero means no limit.
    pub fn try_register(&self, handle: SessionHandle, max_connections: usize) -> Option<RegistrationGuard> {
        let mut sessions = self.lock();
        if max_connections > 0 && sessions.len() >= max_connections {
            return None;
        }
        let addr = handle.remote_addr;
        sessions.insert(addr, handle);
        Some(RegistrationGuard {
            addr,
            sessions: Arc::clone(&self.sessions),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<SessionHandle> {
        self.lock().get(addr).cloned()
    }

    /// Disconnects the session at `addr`.
    pub fn kick(&self, addr: &SocketAddr) -> bool {
        match self.get(addr) {
            Some(handle) => {
                handle.kick();
                true
            }
            None => false,
        }
    }

    /// Resumes the last cancelled transfer of the session at `addr`.
    pub fn restore_transfer(&self, addr: &SocketAddr, offset: u64) -> bool {
        match self.get(addr) {
            Some(handle) => {
                handle.restore_transfer(offset);
                true
            }
            None => false,
        }
    }

    /// Stops the transfer of the session at `addr`.
    pub fn stop_transfer(&self, addr: &SocketAddr) -> bool {
        self.get(addr).is_some_and(|handle| handle.stop_transfer())
    }
}

/// RAII guard that releases a session slot when dropped
#[derive(Debug)]
pub struct RegistrationGuard {
    addr: SocketAddr,
    sessions: Sessions,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(port: u16) -> SessionHandle {
        SessionHandle::new(
            SocketAddr::from(([127, 0, 0, 1], port)),
            CancellationToken::new(),
            TransferControl::default(),
        )
    }

    #[test]
    fn enforces_ceiling() {
        let registry = ClientRegistry::new();
        let first = registry.try_register(handle(1), 2);
        let second = registry.try_register(handle(2), 2);
        assert!(first.is_some() && second.is_some());
        assert!(registry.try_register(handle(3), 2).is_none());
        assert_eq!(registry.len(), 2);

        drop(first);
        assert_eq!(registry.len(), 1);
        assert!(registry.try_register(handle(3), 2).is_some());
    }

    #[test]
    fn zero_means_unlimited() {
        let registry = ClientRegistry::new();
        let guards: Vec<_> = (1..=50)
            .map(|p| registry.try_register(handle(p), 0).unwrap())
            .collect();
        assert_eq!(registry.len(), 50);
        drop(guards);
        assert!(registry.is_empty());
    }

    #[test]
    fn kick_cancels_session_token() {
        let registry = ClientRegistry::new();
        let h = handle(7);
        let token = h.token().clone();
        let _guard = registry.try_register(h, 0).unwrap();

        assert!(registry.kick(&SocketAddr::from(([127, 0, 0, 1], 7))));
        assert!(token.is_cancelled());
        assert!(!registry.kick(&SocketAddr::from(([127, 0, 0, 1], 8))));
    }

    #[test]
    fn stop_transfer_leaves_session_alive() {
        let registry = ClientRegistry::new();
        let h = handle(9);
        let session_token = h.token().clone();
        let transfer = h.transfer_control().begin(&session_token);
        let _guard = registry.try_register(h, 0).unwrap();

        assert!(registry.stop_transfer(&SocketAddr::from(([127, 0, 0, 1], 9))));
        assert!(transfer.is_cancelled());
        assert!(!session_token.is_cancelled());
    }
}
