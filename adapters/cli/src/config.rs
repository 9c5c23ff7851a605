//! Versioned TOML configuration for the command-line adapter.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use chrono_weave_core::GridConfig;
use chrono_weave_system_pacing::DEFAULT_SIMULATION_DELAY;
use serde::Deserialize;

const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Settings resolved from the optional configuration file.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AppConfig {
    /// Grid the session starts from.
    pub(crate) grid: GridConfig,
    /// Presentation delay between starting and completing a pass.
    pub(crate) delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::standard(),
            delay: DEFAULT_SIMULATION_DELAY,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: u32,
    #[serde(default)]
    delay_ms: Option<u64>,
    #[serde(default)]
    grid: Option<GridConfig>,
}

/// Loads the configuration at `path`, or the defaults when no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn parse(contents: &str) -> Result<AppConfig> {
    let file: ConfigFile =
        toml::from_str(contents).context("failed to parse configuration toml contents")?;
    if file.version != SUPPORTED_CONFIG_VERSION {
        bail!(
            "unsupported configuration version {}; expected {}",
            file.version,
            SUPPORTED_CONFIG_VERSION
        );
    }

    let defaults = AppConfig::default();
    Ok(AppConfig {
        grid: file.grid.unwrap_or(defaults.grid),
        delay: file
            .delay_ms
            .map_or(defaults.delay, Duration::from_millis),
    })
}
