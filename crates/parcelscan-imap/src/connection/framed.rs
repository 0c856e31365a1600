//! Framed I/O for the IMAP protocol.
//!
//! IMAP responses are CRLF-terminated lines, optionally followed by
//! `{n}`-announced literals carrying exactly `n` raw bytes. The framed
//! stream reassembles one complete reply (line plus literals) per read.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Result;

/// Default buffer size for reading.
const READ_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Framed connection for the IMAP protocol.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    scratch: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
            scratch: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Reads one complete reply, following embedded literals.
    pub async fn read_reply(&mut self) -> Result<Vec<u8>> {
        let mut reply = Vec::new();

        loop {
            let start = reply.len();
            let line_len = self.read_line_into(&mut reply).await?;
            if line_len == 0 {
                return Err(crate::Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            match literal_length(&reply[start..]) {
                Some(len) if len > MAX_LITERAL_SIZE => {
                    return Err(crate::Error::Protocol(format!(
                        "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                    )));
                }
                Some(len) => {
                    // Literal bytes follow the announcing line verbatim.
                    let mark = reply.len();
                    reply.resize(mark + len, 0);
                    self.reader.read_exact(&mut reply[mark..]).await?;
                }
                None => break,
            }
        }

        Ok(reply)
    }

    /// Reads a single LF-terminated line into `buf`, returning its length.
    async fn read_line_into(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let before = buf.len();
        let n = self.reader.read_until(b'\n', buf).await?;
        if buf.len() - before > MAX_LINE_LENGTH {
            return Err(crate::Error::Protocol("line too long".to_string()));
        }
        Ok(n)
    }

    /// Writes a command to the stream and flushes it.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.scratch).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Parses a literal announcement from the end of a line.
///
/// Matches `{123}\r\n` and the non-synchronizing form `{123+}\r\n`.
fn literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n").or_else(|| line.strip_suffix(b"\n"))?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let inner = line
        .get(open + 1..line.len() - 1)
        .filter(|_| line.ends_with(b"}"))?;

    let digits = std::str::from_utf8(inner).ok()?;
    digits.strip_suffix('+').unwrap_or(digits).parse().ok()
}
