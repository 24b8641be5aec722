use crate::logging::LoggingConfig;
use crate::pipeline::ToleranceSpec;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod options;

pub use options::*;

/// File-backed defaults for comparison runs.
///
/// Every field may be omitted from the file. Command-line flags override
/// whatever is set here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tolerance: ToleranceSpec,
    pub masking: MaskingDefaults,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingDefaults {
    /// Target label
    pub label: u16,
    /// Value written into voxels the mask replaces
    pub fill_value: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Worker threads for the rayon pool (None = one per core)
    pub threads: Option<usize>,
}

impl ExecutionConfig {
    /// Size the global rayon pool. Must run before any parallel work.
    pub fn configure_thread_pool(&self) -> anyhow::Result<()> {
        if let Some(threads) = self.threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .context("failed to configure worker pool")?;
            tracing::debug!(threads, "Configured worker pool");
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;

        let config = if content.trim_start().starts_with('{') {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON config {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("invalid TOML config {}", path.display()))?
        };
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> anyhow::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path.as_ref(), content)
            .with_context(|| format!("cannot write config {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = validate_tolerance(&self.tolerance) {
            errors.push(e.to_string());
        }

        if self.masking.fill_value.is_nan() {
            errors.push("masking fill_value must be a number".to_string());
        }

        if self.execution.threads == Some(0) {
            errors.push("execution threads must be positive".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Load and validate `config_path`, or use defaults when none is given.
pub fn load_config_or_default(config_path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = config_path else {
        return Ok(Config::default());
    };

    let config = Config::load_from_file(path)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "invalid configuration in {}:\n  - {}",
            path.display(),
            errors.join("\n  - ")
        );
    }
    Ok(config)
}
