use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result, anyhow};
use config::{Config as HierarchicalConfig, Environment};
use rads_catalog::DEFAULT_DISPATCH_URL;
use rads_sdk::models::search::DEFAULT_QUIESCENCE;
use rads_sdk::providers::auth::OAuthConfig;
use serde::Deserialize;
use tracing::debug;

/// Name of the directories managed by the registry CLI (config, data)
const RADS_DIR_NAME: &str = "rads";
const RADS_CONFIG_DIR_VAR: &str = "RADS_CONFIG_DIR";
pub const RADS_CONFIG_FILE: &str = "registry.toml";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Base URL of the registry's dispatch API
    pub dispatch_url: String,
    /// Directory where the session is persisted (default: `$XDG_DATA_HOME/rads`)
    pub data_dir: PathBuf,
    /// Directory the config file is read from (default: `$XDG_CONFIG_HOME/rads`)
    pub config_dir: PathBuf,
    /// Overrides the HTTP user agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Quiet period after the last keystroke before `browse` searches
    pub debounce_ms: u64,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Read the config from defaults, the config file and `RADS_*` variables.
    pub fn parse() -> Result<Config> {
        let config_dir = match env::var(RADS_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${RADS_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine the user config directory"))?
                .join(RADS_DIR_NAME),
        };
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine the user data directory"))?
            .join(RADS_DIR_NAME);

        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Could not create config directory: {config_dir:?}"))?;

        let oauth_defaults = OAuthConfig::default();
        let builder = HierarchicalConfig::builder()
            .set_default("dispatch_url", DEFAULT_DISPATCH_URL)?
            .set_default("data_dir", data_dir.to_string_lossy().as_ref())?
            .set_default("debounce_ms", DEFAULT_QUIESCENCE.as_millis() as u64)?
            .set_default("oauth.authorize_url", oauth_defaults.authorize_url)?
            .set_default("oauth.redirect_uri", oauth_defaults.redirect_uri)?
            .set_default("oauth.scopes", oauth_defaults.scopes)?
            // The config file cannot move the config dir.
            .set_override("config_dir", config_dir.to_string_lossy().as_ref())?
            .add_source(
                config::File::from(config_dir.join(RADS_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("RADS")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("oauth.scopes")
                    .try_parsing(true),
            );

        let config = builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(config)
    }
}
