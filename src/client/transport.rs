//! Control connection transport
//!
//! The control socket is read line by line through a `BufReader`. `AUTH TLS`
//! swaps the plain stream for a TLS stream over the same socket, once.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::debug;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    ReadBuf,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use crate::error::{SessionError, TlsError};

/// Plain or encrypted control stream.
pub enum ControlStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for ControlStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ControlStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Outcome of reading one control line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// Peer closed its side, or sent a blank line.
    Closed,
    TooLong,
}

/// Skips input up to and including the next `\n` without keeping it.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let (found, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

/// Line-oriented control channel.
pub struct ControlTransport {
    // None only while an upgrade is in progress or after it failed.
    inner: Option<BufReader<ControlStream>>,
    max_line: usize,
    // bytes of a line whose read was interrupted
    partial: Vec<u8>,
    discarding: bool,
}

impl ControlTransport {
    pub fn new(stream: TcpStream, max_line: usize) -> Self {
        Self {
            inner: Some(BufReader::new(ControlStream::Plain(stream))),
            max_line,
            partial: Vec::new(),
            discarding: false,
        }
    }

    fn stream(&mut self) -> Result<&mut BufReader<ControlStream>, SessionError> {
        self.inner.as_mut().ok_or(SessionError::Closed)
    }

    /// Reads one command line, stripped of its line terminator.
    ///
    /// Cancel safe: a line interrupted mid-read is completed by the next call.
    pub async fn read_line(&mut self) -> Result<ReadLine, SessionError> {
        let max_line = self.max_line;
        let reader = self.inner.as_mut().ok_or(SessionError::Closed)?;
        if self.discarding {
            discard_line(reader).await?;
            self.discarding = false;
            return Ok(ReadLine::TooLong);
        }

        let limit = (max_line as u64 + 2).saturating_sub(self.partial.len() as u64);
        (&mut *reader)
            .take(limit)
            .read_until(b'\n', &mut self.partial)
            .await?;
        let raw = std::mem::take(&mut self.partial);
        if raw.is_empty() {
            return Ok(ReadLine::Closed);
        }
        if !raw.ends_with(b"\n") && raw.len() > max_line {
            self.discarding = true;
            discard_line(reader).await?;
            self.discarding = false;
            return Ok(ReadLine::TooLong);
        }

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.len() > max_line {
            return Ok(ReadLine::TooLong);
        }
        if line.trim().is_empty() {
            return Ok(ReadLine::Closed);
        }
        Ok(ReadLine::Line(line.to_string()))
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        let stream = self.stream()?;
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Runs the server side TLS handshake and replaces the plain stream.
    pub async fn upgrade(&mut self, acceptor: &TlsAcceptor) -> Result<(), SessionError> {
        let reader = self.inner.take().ok_or(SessionError::Closed)?;
        if !reader.buffer().is_empty() || !self.partial.is_empty() {
            self.inner = Some(reader);
            return Err(TlsError::PendingPlaintext.into());
        }
        let tcp = match reader.into_inner() {
            ControlStream::Plain(tcp) => tcp,
            tls @ ControlStream::Tls(_) => {
                self.inner = Some(BufReader::new(tls));
                return Err(TlsError::AlreadyUpgraded.into());
            }
        };

        let tls = acceptor.accept(tcp).await.map_err(TlsError::Handshake)?;
        debug!("Control connection upgraded to TLS");
        self.inner = Some(BufReader::new(ControlStream::Tls(Box::new(tls))));
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        if let Some(stream) = self.inner.as_mut() {
            let _ = stream.get_mut().shutdown().await;
        }
    }
}
