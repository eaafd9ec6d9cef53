use anyhow::Result;
use clap::Parser;

use slotproxy::{cli::Cli, logging, run, settings::Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli)?;
    logging::init_logger(settings.log)?;
    run(settings).await
}
