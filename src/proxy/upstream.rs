use std::io;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

#[derive(Debug, Error)]
#[error("failed to connect to origin {host}:{port}")]
pub struct OriginConnectError {
    pub host: String,
    pub port: String,
    #[source]
    pub source: io::Error,
}

/// Why relaying stopped before the origin closed its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayInterruption {
    OriginWrite,
    OriginRead,
    ClientWrite,
}

impl RelayInterruption {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayInterruption::OriginWrite => "origin_write_failed",
            RelayInterruption::OriginRead => "origin_read_failed",
            RelayInterruption::ClientWrite => "client_write_failed",
        }
    }
}

#[derive(Debug)]
pub struct FetchedResponse {
    /// Accumulated origin bytes. Growth stops once the buffer passes the
    /// accumulation limit, so this is only the whole response when
    /// `total_len` is within that limit.
    pub body: Bytes,
    pub total_len: usize,
    pub status: Option<u16>,
    pub upstream_addr: Option<SocketAddr>,
    pub interrupted: Option<RelayInterruption>,
}

impl FetchedResponse {
    /// The full response when it ended cleanly and fits in `max_object_size`.
    pub fn cacheable_body(&self, max_object_size: usize) -> Option<Bytes> {
        (self.interrupted.is_none() && self.total_len <= max_object_size)
            .then(|| self.body.clone())
    }
}

/// Connects to `host:port`, sends `request`, and relays the reply to `client`
/// chunk by chunk until the origin closes, keeping up to
/// `accumulate_limit` bytes (plus at most one chunk) for the cache.
pub async fn fetch_origin<W>(
    host: &str,
    port: &str,
    request: &[u8],
    client: &mut W,
    chunk_size: usize,
    accumulate_limit: usize,
) -> Result<FetchedResponse, OriginConnectError>
where
    W: AsyncWrite + Unpin,
{
    let mut origin = TcpStream::connect(format!("{host}:{port}"))
        .await
        .map_err(|source| OriginConnectError {
            host: host.to_string(),
            port: port.to_string(),
            source,
        })?;
    let upstream_addr = origin.peer_addr().ok();
    trace!(host, port, "connected to origin");

    let mut fetched = FetchedResponse {
        body: Bytes::new(),
        total_len: 0,
        status: None,
        upstream_addr,
        interrupted: None,
    };

    if let Err(err) = origin.write_all(request).await {
        debug!(host, error = %err, "failed to send request to origin");
        fetched.interrupted = Some(RelayInterruption::OriginWrite);
        return Ok(fetched);
    }

    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut body = BytesMut::new();
    let mut status_line = StatusLineSniffer::default();
    loop {
        let read = match origin.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                debug!(host, error = %err, "origin read failed");
                fetched.interrupted = Some(RelayInterruption::OriginRead);
                break;
            }
        };
        let data = &chunk[..read];
        if let Some(status) = status_line.feed(data) {
            fetched.status = status;
        }
        fetched.total_len = fetched.total_len.saturating_add(read);

        if let Err(err) = client.write_all(data).await {
            debug!(host, error = %err, "client write failed while relaying");
            fetched.interrupted = Some(RelayInterruption::ClientWrite);
            break;
        }
        if body.len() <= accumulate_limit {
            body.extend_from_slice(data);
        }
    }
    if let Some(status) = status_line.finish() {
        fetched.status = status;
    }
    if fetched.interrupted.is_none() {
        if let Err(err) = client.flush().await {
            debug!(host, error = %err, "failed to flush client stream");
        }
    }
    if let Err(err) = origin.shutdown().await {
        trace!(host, error = %err, "failed to shut down origin stream");
    }

    fetched.body = body.freeze();
    Ok(fetched)
}

const MAX_STATUS_LINE_PREFIX: usize = 64;

/// Collects the start of the response until the status line is complete, so
/// a status split across several reads is still recognised.
#[derive(Debug, Default)]
struct StatusLineSniffer {
    prefix: Vec<u8>,
    done: bool,
}

impl StatusLineSniffer {
    /// Returns `Some` once, when the status line has been decided.
    fn feed(&mut self, data: &[u8]) -> Option<Option<u16>> {
        if self.done {
            return None;
        }
        let room = MAX_STATUS_LINE_PREFIX - self.prefix.len();
        self.prefix.extend_from_slice(&data[..data.len().min(room)]);
        if self.prefix.contains(&b'\n') || self.prefix.len() == MAX_STATUS_LINE_PREFIX {
            return self.finish();
        }
        None
    }

    /// Decides on whatever arrived, for responses that end before a newline.
    fn finish(&mut self) -> Option<Option<u16>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(response_status(&self.prefix))
    }
}

/// Status code of an HTTP/1.x status line at the start of `data`, if present.
pub fn response_status(data: &[u8]) -> Option<u16> {
    let rest = data.strip_prefix(b"HTTP/")?;
    let space = rest.iter().position(|byte| *byte == b' ')?;
    let code = rest.get(space + 1..space + 4)?;
    if !code.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(code).ok()?.parse().ok()
}
