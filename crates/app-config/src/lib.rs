// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{Market, Settings, TradingHours, Venue};

/// Loads and validates the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `development.toml`).
/// 3. Merges settings from environment variables.
///
/// The result is validated before it is returned; an invalid configuration is
/// fatal and the caller must refuse to start.
pub fn load_settings() -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        // 1. Load the base configuration file.
        .add_source(File::with_name("config/base"))
        // 2. Load the environment-specific configuration file.
        .add_source(File::with_name(&format!("config/{}", environment)).required(false))
        // 3. Load settings from environment variables (e.g., `APP_BROKER__ALPACA__API_KEY=...`).
        // The prefix is `APP`, separator is `__`.
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}
