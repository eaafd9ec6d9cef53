use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Origin server that answers every request head with the same raw bytes and
/// closes. Remembers how many requests it saw and the last request head.
pub struct TestOrigin {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<String>>>,
    handle: JoinHandle<()>,
}

impl TestOrigin {
    pub async fn raw(response: impl Into<Vec<u8>>) -> Result<Self> {
        let response = Arc::new(response.into());
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));

        let handle = {
            let requests = requests.clone();
            let last_request = last_request.clone();
            tokio::spawn(async move {
                loop {
                    let (stream, _) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(_) => break,
                    };
                    let response = response.clone();
                    let requests = requests.clone();
                    let last_request = last_request.clone();
                    tokio::spawn(async move {
                        let mut stream = stream;
                        let Some(head) = read_request_head(&mut stream).await else {
                            return;
                        };
                        requests.fetch_add(1, Ordering::SeqCst);
                        *last_request.lock() = Some(head);
                        if stream.write_all(&response).await.is_ok() {
                            stream.shutdown().await.ok();
                        }
                    });
                }
            })
        };

        Ok(Self {
            addr,
            requests,
            last_request,
            handle,
        })
    }

    /// `HTTP/1.0 200 OK` with a Content-Length header and `body`.
    pub async fn ok(body: &[u8]) -> Result<Self> {
        let mut response =
            format!("HTTP/1.0 200 OK\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
        response.extend_from_slice(body);
        Self::raw(response).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<String> {
        self.last_request.lock().clone()
    }
}

impl Drop for TestOrigin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&data).to_string())
}
