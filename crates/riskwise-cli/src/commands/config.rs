//! Configuration display command implementation

use std::path::Path;

use anyhow::{Context, Result};
use riskwise_core::config::default_config_path;
use riskwise_core::EngineConfig;

/// Show the effective configuration and where it came from
pub fn cmd_config(config: &EngineConfig, explicit: Option<&Path>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let override_path = explicit.map(Path::to_path_buf).or_else(default_config_path);
    match override_path {
        Some(path) if path.exists() => println!("📄 Config: {}", path.display()),
        Some(path) => {
            println!("📄 Config: built-in defaults");
            println!("   Override location: {}", path.display());
        }
        None => println!("📄 Config: built-in defaults"),
    }
    println!();

    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    println!("{}", rendered.trim_end());

    Ok(())
}
