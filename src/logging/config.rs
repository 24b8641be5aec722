//! Logging configuration
//!
//! Per-component log levels, output destinations, and console format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Emit logs on stderr
    pub console_output: bool,

    /// Emit console logs as JSON lines instead of human-readable text
    pub json_console: bool,

    /// Directory for daily-rolling JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include source file and line in console logs
    pub include_file_location: bool,

    /// Level for pipeline stages and the numerical engines
    pub pipeline_level: String,

    /// Level for volume loading and writing
    pub io_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "warn".to_string(),
            console_output: true,
            json_console: false,
            log_directory: None,
            include_file_location: false,
            pipeline_level: "warn".to_string(),
            io_level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration for working on the tool itself
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            console_output: true,
            json_console: false,
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            pipeline_level: "trace".to_string(),
            io_level: "debug".to_string(),
        }
    }

    /// Errors only, for CI runs that scrape stdout
    pub fn quiet() -> Self {
        Self {
            global_level: "error".to_string(),
            pipeline_level: "error".to_string(),
            io_level: "error".to_string(),
            ..Self::default()
        }
    }

    /// Set every level at once
    pub fn with_level(mut self, level: &str) -> Self {
        self.global_level = level.to_string();
        self.pipeline_level = level.to_string();
        self.io_level = level.to_string();
        self
    }

    /// Validate the configuration and provide helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("pipeline_level", &self.pipeline_level),
            ("io_level", &self.io_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Get the effective log level for a specific component
    pub fn get_component_level(&self, component: &str) -> &str {
        match component {
            "pipeline" | "algorithms" => &self.pipeline_level,
            "io" | "data" => &self.io_level,
            _ => &self.global_level,
        }
    }
}
