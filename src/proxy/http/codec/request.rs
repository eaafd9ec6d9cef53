use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, BufReader};
use tracing::debug;

use crate::proxy::request::RequestLine;

use super::headers::ExtraHeaders;
use super::line::read_line;

/// Reads the request line. `None` means the client closed the connection
/// before sending anything.
pub(crate) async fn read_request_line<S>(
    reader: &mut BufReader<S>,
    peer: SocketAddr,
    max_line_len: usize,
) -> Result<Option<RequestLine>>
where
    S: AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = read_line(reader, &mut line, peer, max_line_len)
        .await
        .with_context(|| format!("reading request line from {peer}"))?;
    if read == 0 {
        debug!(peer = %peer, "connection closed before request line");
        return Ok(None);
    }
    Ok(Some(RequestLine::parse(&line)))
}

/// Reads header lines up to the blank terminator (or end of stream), keeping
/// the ones the proxy does not rewrite.
pub(crate) async fn read_extra_headers<S>(
    reader: &mut BufReader<S>,
    peer: SocketAddr,
    max_line_len: usize,
) -> Result<ExtraHeaders>
where
    S: AsyncRead + Unpin,
{
    let mut headers = ExtraHeaders::new();
    let mut line = String::new();
    loop {
        let read = read_line(reader, &mut line, peer, max_line_len)
            .await
            .with_context(|| format!("reading request headers from {peer}"))?;
        if read == 0 || !headers.push_line(&line) {
            break;
        }
    }
    Ok(headers)
}
