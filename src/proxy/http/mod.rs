mod codec;
mod forward;
mod handler;
mod respond;

use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpStream;

use crate::proxy::AppContext;

pub(crate) use codec::read_line;
pub use respond::{ErrorPage, send_error_page, shutdown_stream};

use handler::ProxyRequestHandler;

pub async fn handle_http(stream: TcpStream, peer: SocketAddr, app: AppContext) -> Result<()> {
    ProxyRequestHandler::new(stream, peer, &app).run().await
}
