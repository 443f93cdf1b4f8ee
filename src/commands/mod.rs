pub mod register;
pub mod serve;

// Re-export command functions for convenience
pub use register::register;
pub use serve::serve;

use anyhow::{Context, Result};
use std::path::Path;

use converter::config::{parse_node_list, Config};

/// Load configuration from a TOML file or the environment, then apply `--node` overrides
pub fn load_config(path: Option<&Path>, nodes: &[String]) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    if !nodes.is_empty() {
        config.coordinator.nodes =
            parse_node_list(&nodes.join(",")).context("Invalid --node address")?;
    }

    Ok(config)
}
