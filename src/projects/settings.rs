//! til.toml
//!
//! Every key is optional. A missing file means the defaults below.

use crate::{return_config_error, return_file_error};
use crate::til_frontend::til::til_display::TilDisplayOptions;
use crate::til_frontend::til_errors::TilError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "til.toml";

// CFGs bigger than this are skipped unless the config says otherwise
pub const DEFAULT_MAX_BLOCKS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dump: DumpConfig,
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    pub enabled: bool,
    pub show_instructions: bool,
    pub show_phi_status: bool,
    pub show_edges: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig {
            enabled: true,
            show_instructions: true,
            show_phi_status: true,
            show_edges: true,
        }
    }
}

impl DumpConfig {
    pub fn display_options(&self) -> TilDisplayOptions {
        TilDisplayOptions {
            show_instructions: self.show_instructions,
            show_phi_status: self.show_phi_status,
            show_edges: self.show_edges,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    pub max_blocks: usize,
    pub parallel: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            max_blocks: DEFAULT_MAX_BLOCKS,
            parallel: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str, path: &Path) -> Result<Config, TilError> {
        let config: Config = match toml::from_str(source) {
            Ok(config) => config,
            Err(e) => return_config_error!(path, e.to_string()),
        };

        if config.driver.max_blocks == 0 {
            return_config_error!(path, "driver.max_blocks must be greater than zero");
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config, TilError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => return_file_error!(path, format!("Could not read config: {e}")),
        };

        Config::from_toml_str(&source, path)
    }

    /// An explicit path has to exist. Otherwise til.toml next to the input is used if present.
    pub fn resolve(explicit: Option<&Path>, input: &Path) -> Result<Config, TilError> {
        if let Some(path) = explicit {
            return Config::load(path);
        }

        let beside_input = default_config_path(input);
        if beside_input.is_file() {
            return Config::load(&beside_input);
        }

        Ok(Config::default())
    }
}

pub fn default_config_path(input: &Path) -> PathBuf {
    match input.parent() {
        Some(dir) => dir.join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
