#![allow(dead_code)]

pub mod harness;
pub mod net;
pub mod origin;
pub mod proxy_client;

pub use harness::{ProxyHarness, ProxyHarnessBuilder};
pub use net::{find_free_port, wait_for_listener};
pub use origin::TestOrigin;
pub use proxy_client::ProxyClient;

/// Status code from the first line of a raw HTTP response.
pub fn status_of(response: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(response).ok()?;
    text.lines().next()?.split_whitespace().nth(1)?.parse().ok()
}

pub fn body_of(response: &[u8]) -> &[u8] {
    match response.windows(4).position(|window| window == b"\r\n\r\n") {
        Some(idx) => &response[idx + 4..],
        None => &[],
    }
}
