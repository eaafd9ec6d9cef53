use anyhow::{Context, Result};
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const PAGE_TITLE: &str = "Proxy Error";
const PAGE_FOOTER: &str = "slotproxy";

/// A synthesized HTML error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub short_message: &'static str,
    pub long_message: &'static str,
    pub cause: String,
}

impl ErrorPage {
    pub fn not_implemented(method: &str) -> Self {
        Self {
            status: StatusCode::NOT_IMPLEMENTED,
            short_message: "Not Implemented",
            long_message: "Only the GET method is implemented",
            cause: method.to_string(),
        }
    }

    /// Reported with the configured status when the origin refuses or cannot
    /// be resolved.
    pub fn origin_unreachable(status: StatusCode, host: &str) -> Self {
        Self {
            status,
            short_message: "Server Error",
            long_message: "Could not connect to the origin server",
            cause: host.to_string(),
        }
    }

    pub fn bad_request(target: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            short_message: "Bad Request",
            long_message: "Request target must be an absolute http:// URL",
            cause: target.to_string(),
        }
    }

    pub fn body(&self) -> String {
        format!(
            "<html><title>{PAGE_TITLE}</title><body bgcolor=\"#FF8680\">\r\n\
             {code}: {short}\r\n\
             <p>{long}: {cause}\r\n\
             <hr><em>{PAGE_FOOTER}</em>\r\n",
            code = self.status.as_u16(),
            short = self.short_message,
            long = self.long_message,
            cause = escape_html(&self.cause),
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body();
        let mut response = format!(
            "HTTP/1.0 {} {}\r\nContent-type: text/html\r\nContent-length: {}\r\n\r\n",
            self.status.as_u16(),
            self.short_message,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body.as_bytes());
        response
    }
}

pub async fn send_error_page<S>(stream: &mut S, page: &ErrorPage) -> Result<usize>
where
    S: AsyncWrite + Unpin,
{
    let response = page.encode();
    stream
        .write_all(&response)
        .await
        .context("writing error page")?;
    Ok(response.len())
}

pub async fn shutdown_stream<S>(stream: &mut S) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream
        .shutdown()
        .await
        .context("shutting down client stream")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
