use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Result, ensure};
use http::StatusCode;

use crate::cli::{Cli, LogFormat};

pub const DEFAULT_CACHE_SLOTS: usize = 10;
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 102_400;
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1_049_000;
pub const DEFAULT_UNREACHABLE_STATUS: u16 = 404;

const DEFAULT_READ_CHUNK_SIZE: usize = 8192;
const DEFAULT_MAX_LINE_LEN: usize = 8192;

const USER_AGENT_HEADER: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";
const ACCEPT_HEADER: &str =
    "Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n";
const ACCEPT_ENCODING_HEADER: &str = "Accept-Encoding: gzip, deflate\r\n";

/// Immutable proxy configuration, built once at startup and shared through
/// [`crate::proxy::AppContext`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub log: LogFormat,
    pub metrics_listen: Option<SocketAddr>,
    pub cache_slots: usize,
    pub max_object_size: usize,
    pub max_cache_size: usize,
    pub unreachable_status: u16,
    /// Bytes requested from the origin per read.
    pub read_chunk_size: usize,
    /// Longest request or header line accepted from a client, CRLF included.
    pub max_line_len: usize,
    pub user_agent_header: &'static str,
    pub accept_header: &'static str,
    pub accept_encoding_header: &'static str,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let listen = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port));
        let settings = Self {
            log: cli.log,
            metrics_listen: cli.metrics_listen,
            cache_slots: cli.cache_slots,
            max_object_size: cli.max_object_size,
            max_cache_size: cli.max_cache_size,
            unreachable_status: cli.unreachable_status,
            ..Self::with_listen(listen)
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Built-in defaults bound to `listen`.
    pub fn with_listen(listen: SocketAddr) -> Self {
        Self {
            listen,
            log: LogFormat::Text,
            metrics_listen: None,
            cache_slots: DEFAULT_CACHE_SLOTS,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            unreachable_status: DEFAULT_UNREACHABLE_STATUS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            user_agent_header: USER_AGENT_HEADER,
            accept_header: ACCEPT_HEADER,
            accept_encoding_header: ACCEPT_ENCODING_HEADER,
        }
    }

    pub fn unreachable_status(&self) -> StatusCode {
        StatusCode::from_u16(self.unreachable_status).unwrap_or(StatusCode::NOT_FOUND)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cache_slots > 0,
            "cache_slots must be at least 1 (got {})",
            self.cache_slots
        );
        ensure!(
            self.max_object_size > 0,
            "max_object_size must be greater than 0 (got {})",
            self.max_object_size
        );
        ensure!(
            self.max_cache_size > 0,
            "max_cache_size must be greater than 0 (got {})",
            self.max_cache_size
        );
        ensure!(
            StatusCode::from_u16(self.unreachable_status).is_ok(),
            "unreachable_status must be a valid HTTP status code (got {})",
            self.unreachable_status
        );
        ensure!(
            self.read_chunk_size > 0,
            "read_chunk_size must be greater than 0 (got {})",
            self.read_chunk_size
        );
        ensure!(
            self.max_line_len > 0,
            "max_line_len must be greater than 0 (got {})",
            self.max_line_len
        );
        Ok(())
    }
}
