//! `ecore-proxy check` - validate a configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use ecore_proxy::BridgeConfig;

pub fn execute(config: &Path) -> Result<()> {
    let parsed = BridgeConfig::load(config)
        .with_context(|| format!("invalid configuration {}", config.display()))?;

    println!("{}: ok", config.display());
    println!();
    print!("{}", parsed.to_toml_string()?);
    Ok(())
}
