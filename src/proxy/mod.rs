pub mod cache;
pub mod http;
pub mod listener;
pub mod request;
pub mod upstream;

use std::sync::Arc;

use anyhow::Result;

use crate::settings::Settings;

/// Everything a connection handler shares with the rest of the process.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub cache: Arc<cache::ResponseCache>,
}

impl AppContext {
    pub fn new(settings: Arc<Settings>, cache: Arc<cache::ResponseCache>) -> Self {
        Self { settings, cache }
    }
}

pub async fn run(app: AppContext) -> Result<()> {
    listener::start_listener(app).await
}
