//! Transfer engine
//!
//! Chunked stream copy with ASCII line-ending conversion, resume offsets and
//! cancellation at chunk boundaries.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::transfer::modes::TransferType;

/// Direction of an ASCII transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    /// Local `\n` becomes `\r\n` on the wire.
    ToNetwork,
    /// Wire `\r\n` becomes local `\n`.
    ToStorage,
}

/// Parameters of one copy attempt.
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    pub buffer_size: usize,
    pub transfer_type: TransferType,
    pub direction: LineDirection,
    /// Source bytes already delivered by an earlier attempt.
    pub resume_offset: u64,
}

/// Where a copy attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Source offset reached, skipped bytes included.
    pub offset: u64,
    pub cancelled: bool,
}

/// Stateful end-of-line rewriter; survives chunk boundaries.
#[derive(Debug)]
struct AsciiTranscoder {
    direction: LineDirection,
    last_was_cr: bool,
}

impl AsciiTranscoder {
    fn new(direction: LineDirection) -> Self {
        Self {
            direction,
            last_was_cr: false,
        }
    }

    fn transcode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        match self.direction {
            LineDirection::ToNetwork => {
                for &b in input {
                    if b == b'\n' && !self.last_was_cr {
                        out.push(b'\r');
                    }
                    out.push(b);
                    self.last_was_cr = b == b'\r';
                }
            }
            LineDirection::ToStorage => {
                for &b in input {
                    if self.last_was_cr {
                        self.last_was_cr = false;
                        if b != b'\n' {
                            out.push(b'\r');
                        }
                    }
                    if b == b'\r' {
                        self.last_was_cr = true;
                    } else {
                        out.push(b);
                    }
                }
            }
        }
    }

    /// Source bytes consumed but not yet written.
    fn pending(&self) -> u64 {
        match self.direction {
            LineDirection::ToStorage if self.last_was_cr => 1,
            _ => 0,
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending() > 0 {
            out.push(b'\r');
            self.last_was_cr = false;
        }
    }
}

/// Copies `src` into `dst`.
///
/// The first `resume_offset` source bytes are read and discarded. `progress`
/// runs after every written chunk with (offset reached, chunk size). The
/// cancellation token is observed between chunks; a cancelled copy returns
/// the exact source offset whose bytes were all written.
pub async fn copy_stream<R, W, F>(
    src: &mut R,
    dst: &mut W,
    options: &CopyOptions,
    cancel: &CancellationToken,
    mut progress: F,
) -> io::Result<CopyOutcome>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(u64, usize),
{
    let mut buffer = vec![0u8; options.buffer_size.max(1)];
    let mut transcoder = AsciiTranscoder::new(options.direction);
    let mut offset = 0u64;

    while offset < options.resume_offset {
        let want = buffer
            .len()
            .min(usize::try_from(options.resume_offset - offset).unwrap_or(usize::MAX));
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(CopyOutcome { offset, cancelled: true });
            }
            read = src.read(&mut buffer[..want]) => read?,
        };
        if n == 0 {
            break;
        }
        transcoder.last_was_cr =
            options.direction == LineDirection::ToNetwork && buffer[n - 1] == b'\r';
        offset += n as u64;
    }

    let mut converted = Vec::with_capacity(buffer.len() * 2);
    loop {
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                dst.flush().await?;
                return Ok(CopyOutcome {
                    offset: offset - transcoder.pending(),
                    cancelled: true,
                });
            }
            read = src.read(&mut buffer) => read?,
        };
        if n == 0 {
            break;
        }

        match options.transfer_type {
            TransferType::Binary => dst.write_all(&buffer[..n]).await?,
            TransferType::Ascii => {
                converted.clear();
                transcoder.transcode(&buffer[..n], &mut converted);
                dst.write_all(&converted).await?;
            }
        }
        offset += n as u64;
        progress(offset, n);
    }

    if options.transfer_type == TransferType::Ascii {
        converted.clear();
        transcoder.finish(&mut converted);
        dst.write_all(&converted).await?;
    }
    dst.flush().await?;

    Ok(CopyOutcome {
        offset,
        cancelled: false,
    })
}
