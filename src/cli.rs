use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "slotproxy", about = "Caching HTTP/1 forwarding proxy")]
pub struct Cli {
    /// TCP port to accept proxy clients on.
    pub port: u16,

    /// Number of fixed cache slots.
    #[arg(long, default_value_t = crate::settings::DEFAULT_CACHE_SLOTS)]
    pub cache_slots: usize,

    /// Largest origin response (in bytes) that is kept in the cache.
    #[arg(long, default_value_t = crate::settings::DEFAULT_MAX_OBJECT_SIZE)]
    pub max_object_size: usize,

    /// Upper bound for the cache footprint; slots * max-object-size must fit.
    #[arg(long, default_value_t = crate::settings::DEFAULT_MAX_CACHE_SIZE)]
    pub max_cache_size: usize,

    /// Status code reported when the origin cannot be reached.
    #[arg(long, default_value_t = crate::settings::DEFAULT_UNREACHABLE_STATUS)]
    pub unreachable_status: u16,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log: LogFormat,

    /// Serve prometheus metrics on this address.
    #[arg(long)]
    pub metrics_listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}
