use crate::config::AppConfig;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration by merging a TOML file and environment variables.
    ///
    /// `GREEKS_`-prefixed variables override nested keys (`GREEKS_SERVER__PORT=4000`),
    /// and `DELTA_WS_PORT` overrides the publish port.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;

        // surface inconsistencies at startup rather than on first event
        config.vaults()?;

        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GREEKS_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DELTA_WS_PORT"])
                    .map(|_| "server.port".into()),
            )
    }
}
