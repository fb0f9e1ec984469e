use crate::models::ClientConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the client configuration inside the config directory
pub const CONFIG_FILE_NAME: &str = "planscan.yaml";

/// Default prefix for environment overrides (`PLANSCAN_SERVICE__BASE_URL=...`)
pub const ENV_PREFIX: &str = "PLANSCAN";

/// Configuration manager for loading and saving the client configuration.
///
/// Values are layered: built-in defaults, then `planscan.yaml` in the config
/// directory (optional), then environment variables. Nested keys use `__` as
/// the separator, e.g. `PLANSCAN_NOTIFICATIONS__DISPLAY_DURATION_MS=5000`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: ENV_PREFIX.to_string(),
        })
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load the client configuration.
    ///
    /// # Returns
    /// The merged configuration; defaults fill anything the file and
    /// environment leave out
    pub fn load(&self) -> Result<ClientConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults and environment",
                self.config_path
            );
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(self.config_path.as_std_path()).required(false))
            .add_source(
                config::Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("clipboard.command"),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: ClientConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!(
            "Loaded config: service={}, timeout={}s",
            config.service.base_url,
            config.service.timeout_secs
        );
        Ok(config)
    }

    /// Save the client configuration as YAML.
    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
