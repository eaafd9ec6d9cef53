use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const READ_TIMEOUT: StdDuration = StdDuration::from_secs(5);

pub struct ProxyClient {
    stream: TcpStream,
}

impl ProxyClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            stream: TcpStream::connect(addr).await?,
        })
    }

    pub async fn send(&mut self, request: impl AsRef<[u8]>) -> Result<()> {
        self.stream.write_all(request.as_ref()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        timeout(READ_TIMEOUT, self.stream.read_to_end(&mut buf))
            .await
            .context("proxy did not close the connection in time")??;
        Ok(buf)
    }

    pub async fn shutdown(mut self) {
        self.stream.shutdown().await.ok();
    }
}
