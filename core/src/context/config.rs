//! Configuration persistence
//!
//! The config record itself lives in ptimer-types; this module adds loading
//! and saving through confy (TOML, under the platform config directory).

use std::path::Path;

use tracing::warn;

pub use ptimer_types::PtimerConfig;

use super::error::ConfigError;

const APP_NAME: &str = "ptimer";
const CONFIG_NAME: &str = "config";

/// Extension trait for PtimerConfig persistence
pub trait PtimerConfigExt: Sized {
    /// Load from the default location, falling back to defaults on any error.
    fn load() -> Self;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
}

impl PtimerConfigExt for PtimerConfig {
    fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "failed to load config, using defaults");
                PtimerConfig::default()
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }
}
