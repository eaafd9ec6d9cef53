pub mod cli;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{proxy::cache::ResponseCache, settings::Settings};

pub async fn run(settings: Settings) -> Result<()> {
    let cache = ResponseCache::from_settings(&settings).context("invalid cache configuration")?;
    tracing::info!(
        slots = cache.capacity(),
        max_object_size = cache.max_object_size(),
        "response cache ready"
    );

    let settings = Arc::new(settings);
    if let Some(addr) = settings.metrics_listen {
        tokio::spawn(async move {
            if let Err(err) = crate::metrics::serve(addr).await {
                tracing::error!(error = %err, "metrics endpoint failed");
            }
        });
    }

    let app = proxy::AppContext::new(settings, Arc::new(cache));
    proxy::run(app).await
}
