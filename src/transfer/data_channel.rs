//! Module `data_channel`
//!
//! Negotiation and establishment of data connections. Active mode dials the
//! endpoint announced by PORT, passive mode accepts once on the listener
//! opened by PASV/EPSV.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout_at};

use crate::error::TransferError;

/// A data channel that has been negotiated but not yet opened.
#[derive(Debug)]
pub enum DataChannel {
    Active(SocketAddr),
    /// Listener plus the only peer IP allowed to connect to it.
    Passive(TcpListener, IpAddr),
}

impl DataChannel {
    /// Opens the channel, consuming a passive listener.
    pub async fn open(self, timeout: Duration) -> Result<TcpStream, TransferError> {
        match self {
            DataChannel::Active(addr) => connect_active(addr, timeout).await,
            DataChannel::Passive(listener, owner) => accept_passive(listener, owner, timeout).await,
        }
    }
}

async fn connect_active(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, TransferError> {
    info!("Connecting to client data socket at {}", addr);
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(TransferError::ConnectFailed(addr, e)),
        Err(_) => Err(TransferError::ConnectionTimeout(addr.to_string())),
    }
}

async fn accept_passive(
    listener: TcpListener,
    owner: IpAddr,
    timeout: Duration,
) -> Result<TcpStream, TransferError> {
    let deadline = Instant::now() + timeout;
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "passive listener".into());

    loop {
        let (stream, peer) = match timeout_at(deadline, listener.accept()).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => return Err(TransferError::AcceptFailed(e)),
            Err(_) => return Err(TransferError::ConnectionTimeout(local)),
        };

        if peer.ip() == owner {
            debug!("Accepted data connection from {} on {}", peer, local);
            return Ok(stream);
        }
        warn!(
            "Rejected data connection from {}: listener {} belongs to {}",
            peer, local, owner
        );
    }
}

/// Binds a passive listener on `ip`, trying each port of `range` in order,
/// or an ephemeral port when no range is configured.
pub async fn bind_passive(
    ip: IpAddr,
    range: Option<(u16, u16)>,
) -> Result<TcpListener, TransferError> {
    let Some((min, max)) = range else {
        let addr = SocketAddr::new(ip, 0);
        return TcpListener::bind(addr)
            .await
            .map_err(|e| TransferError::PortBindingFailed(addr, e));
    };

    for port in min..=max {
        let addr = SocketAddr::new(ip, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => debug!("Passive port {} unavailable: {}", port, e),
        }
    }
    Err(TransferError::NoAvailablePort)
}

/// Parses the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddr, TransferError> {
    let parts: Vec<u8> = arg
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| TransferError::InvalidPortCommand(arg.to_string()))?;

    let [h1, h2, h3, h4, p1, p2] = parts[..] else {
        return Err(TransferError::InvalidPortCommand(arg.to_string()));
    };

    let port = (u16::from(p1) << 8) | u16::from(p2);
    if port == 0 {
        return Err(TransferError::InvalidPortCommand(arg.to_string()));
    }
    Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(h1, h2, h3, h4)), port))
}

/// Formats the parenthesised part of a 227 reply.
pub fn format_pasv_address(ip: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = ip.octets();
    format!("{},{},{},{},{},{}", h1, h2, h3, h4, port >> 8, port & 0xff)
}
