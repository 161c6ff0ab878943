//! Configuration handling for the tracy CLI
//!
//! Settings come from an optional tracy.toml; command-line flags override
//! whatever the file sets.

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracy_core::PipelineConfig;

const DEFAULT_CONFIG_FILE: &str = "tracy.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub peak_ratio: Option<f32>,
    pub kmer: Option<usize>,
    pub min_kmer_support: Option<usize>,
    pub max_indel: Option<usize>,
    pub trim_left: Option<usize>,
    pub trim_right: Option<usize>,
    pub madc: Option<f64>,
    pub call_variants: bool,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> CliResult<Self> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)
                } else {
                    log::debug!("Using default configuration");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::file_not_found(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Default configuration as TOML
    pub fn example_toml() -> CliResult<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Apply command-line overrides and check the result.
    pub fn with_overrides(mut self, overrides: &Overrides) -> CliResult<PipelineConfig> {
        let pipeline = &mut self.pipeline;
        if let Some(v) = overrides.peak_ratio {
            pipeline.peak_ratio = v;
        }
        if let Some(v) = overrides.kmer {
            pipeline.kmer = v;
        }
        if let Some(v) = overrides.min_kmer_support {
            pipeline.min_kmer_support = v;
        }
        if let Some(v) = overrides.max_indel {
            pipeline.max_indel = v;
        }
        if let Some(v) = overrides.trim_left {
            pipeline.trim_left = v;
        }
        if let Some(v) = overrides.trim_right {
            pipeline.trim_right = v;
        }
        if let Some(v) = overrides.madc {
            pipeline.madc = v;
        }
        pipeline.call_variants |= overrides.call_variants;

        let pipeline = self.pipeline.normalized();
        pipeline.validate()?;
        Ok(pipeline)
    }
}
