use anyhow::{Context, Result};

use converter::config::Config;
use converter::coordinator::{ClientConfig, CoordinatorClient, CoordinatorSession, NodeDirectory};
use converter::metrics::Metrics;

/// Run the registration walk once and print which coordinator accepted it
pub async fn register(config: Config) -> Result<()> {
    config.validate()?;

    let client = CoordinatorClient::new(
        ClientConfig::default()
            .with_register_timeout(config.register_timeout())
            .with_report_timeout(config.report_timeout()),
    )?;
    let mut directory = NodeDirectory::new(config.coordinator.nodes.clone())?;
    let metrics = Metrics::new()?;

    let session = CoordinatorSession::register(&client, &mut directory, &metrics)
        .await
        .context("Registration failed")?;

    println!("Registered with coordinator");
    println!("  Base URL: {}", session.base_url());
    println!("  Configured Nodes: {}", directory.len());

    Ok(())
}
