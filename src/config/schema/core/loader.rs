use super::Config;
use super::types::agicore_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.agicore/config.toml`, writing defaults there on first run.
    pub fn load_or_init() -> Result<Self> {
        let dir = agicore_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create .agicore directory")?;
        }
        Self::load_or_init_at(&dir.join("config.toml"))
    }

    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
