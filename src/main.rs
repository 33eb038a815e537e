use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Pipeline;
use tracing::info;

mod clients;
mod config;
mod detail;
mod error;
mod listing;
mod pipeline;
mod ranking;
mod report;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::new()?;
    Pipeline::new(config).run().await?;

    info!("Scraping completed successfully!");
    Ok(())
}
