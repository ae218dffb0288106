use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "GREENROAD_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Top-level service configuration.
///
/// Every field has a default, so the service starts with no config file and
/// no environment at all.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory served verbatim for any path no route matches.
    pub static_dir: PathBuf,
    /// Seed for the random values in `/api/data`. Unset means OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            random_seed: None,
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// The layered figment: defaults, then the optional YAML file, then
    /// `GREENROAD_*` env (nested with `__`), then plain `PORT`.
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("GREENROAD_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["port"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads the configuration from all sources.
pub fn load_config() -> Result<Config, figment::Error> {
    Config::figment().extract()
}
