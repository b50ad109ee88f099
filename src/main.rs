// src/main.rs

use anyhow::Context;
use tracing::info;

use planwatch::config::Config;
use planwatch::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("starting planwatch");
    let cfg = Config::from_env().context("invalid configuration")?;

    let result = planwatch::run(cfg).await;
    info!("closing planwatch");
    result
}
