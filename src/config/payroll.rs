//! Payroll settings loading from payroll.toml
//!
//! The file is optional. When the default location is missing the built-in defaults
//! apply; a file named explicitly through `PAYROLL_CONFIG` must exist and parse.
//!
//! ```toml
//! [payroll]
//! min_year = 2000
//! max_year = 2100
//! default_operator = "hr-admin"
//! ```

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "payroll.toml";

/// Configuration structure representing the entire payroll.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Payroll generation settings
    #[serde(default)]
    pub payroll: PayrollSettings,
}

/// Settings consulted by the payroll orchestrator
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PayrollSettings {
    /// Earliest year a payroll may be generated for
    pub min_year: i32,
    /// Latest year a payroll may be generated for
    pub max_year: i32,
    /// Operator recorded on snapshots when the caller names none
    pub default_operator: String,
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2100,
            default_operator: "system".to_string(),
        }
    }
}

impl PayrollSettings {
    /// Rejects settings whose year range is empty.
    pub fn validate(&self) -> Result<()> {
        if self.min_year > self.max_year {
            return Err(Error::Config {
                message: format!(
                    "min_year {} is greater than max_year {}",
                    self.min_year, self.max_year
                ),
            });
        }
        Ok(())
    }
}

/// Loads payroll configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The year range is empty
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Loading payroll configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.payroll.validate()?;
    Ok(config)
}

/// Loads payroll configuration from `PAYROLL_CONFIG`, or ./payroll.toml if present.
pub fn load_default_config() -> Result<Config> {
    if let Ok(path) = std::env::var("PAYROLL_CONFIG") {
        return load_config(path);
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)
    } else {
        info!("No {} found, using default payroll settings", DEFAULT_CONFIG_PATH);
        Ok(Config::default())
    }
}
