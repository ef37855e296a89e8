mod config;
mod error;

pub use config::{PtimerConfig, PtimerConfigExt};
pub use error::ConfigError;
