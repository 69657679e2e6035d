mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting TestLens - test and defect insights for Azure DevOps");
    cli.execute().await?;

    Ok(())
}
