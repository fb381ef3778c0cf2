use std::path::Path;

use anyhow::{Context, Result};

use super::paths::resolve_config_path;
use super::types::BridgeConfig;

impl BridgeConfig {
    pub fn load() -> Result<Self> {
        let mut cfg = match resolve_config_path()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed parsing TOML config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut cfg: Self = toml::from_str(raw)?;
        cfg.posture.sanitize();
        Ok(cfg)
    }
}
