//! Loading of terrain configuration files.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use dustfield_core::TerrainConfig;

/// Reads and validates the configuration, falling back to the defaults when
/// no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<TerrainConfig> {
    let config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config from {}", path.display()))?;
            parse(&contents)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => TerrainConfig::default(),
    };
    Ok(config)
}

fn parse(contents: &str) -> Result<TerrainConfig> {
    let config: TerrainConfig =
        toml::from_str(contents).context("failed to parse terrain config toml contents")?;
    config.validate().context("terrain config is invalid")?;
    Ok(config)
}
