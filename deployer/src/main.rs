use anyhow::{Context, Result};
use deployer::{Client, Configuration, DeployRequest, Pipeline};
use std::io::Read;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Read a JSON deploy request on stdin, ship it, and print the created objects.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Configuration::load()?;
    info!("Using cluster {} at {}", config.cluster.name, config.cluster.server);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Unable to read the deploy request from stdin")?;
    let request: DeployRequest =
        serde_json::from_str(&input).context("Failed to deserialize the deploy request")?;

    let client = Client::new(config.cluster)?;
    let outcome = Pipeline::new(&client)
        .run(&request, &request.steps())
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
