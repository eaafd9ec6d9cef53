use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use slotproxy::{
    proxy::{self, AppContext, cache::ResponseCache},
    settings::Settings,
};

use super::net::{find_free_port, wait_for_listener};
use super::proxy_client::ProxyClient;

pub struct ProxyHarness {
    pub addr: SocketAddr,
    pub settings: Arc<Settings>,
    pub cache: Arc<ResponseCache>,
    handle: JoinHandle<()>,
}

impl ProxyHarness {
    pub async fn client(&self) -> Result<ProxyClient> {
        ProxyClient::connect(self.addr).await
    }

    /// Sends one request on a fresh connection and reads until the proxy closes it.
    pub async fn exchange(&self, request: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let mut client = self.client().await?;
        client.send(request).await?;
        client.read_response().await
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

#[derive(Default)]
pub struct ProxyHarnessBuilder {
    settings_override: Option<Box<dyn FnOnce(&mut Settings) + Send>>,
}

impl ProxyHarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings<F>(mut self, func: F) -> Self
    where
        F: FnOnce(&mut Settings) + Send + 'static,
    {
        self.settings_override = Some(Box::new(func));
        self
    }

    pub async fn spawn(mut self) -> Result<ProxyHarness> {
        let proxy_port = find_free_port()?;
        let proxy_addr: SocketAddr = format!("127.0.0.1:{proxy_port}").parse()?;

        let mut settings = Settings::with_listen(proxy_addr);
        if let Some(override_fn) = self.settings_override.take() {
            override_fn(&mut settings);
        }
        settings.validate()?;
        let proxy_addr = settings.listen;
        let cache = Arc::new(ResponseCache::from_settings(&settings)?);
        let settings = Arc::new(settings);

        let app = AppContext::new(settings.clone(), cache.clone());
        let handle = tokio::spawn(async move {
            if let Err(err) = proxy::run(app).await {
                tracing::error!(error = ?err, "proxy run failed");
            }
        });

        wait_for_listener(proxy_addr).await?;

        Ok(ProxyHarness {
            addr: proxy_addr,
            settings,
            cache,
            handle,
        })
    }
}
