use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vrl_store::StoreConfig;

pub const DEFAULT_DB: &str = "vrl.db";

/// Contents of `vrl.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Page size for `fetch` when `--first` is not given.
    pub default_page_size: usize,
    pub store: StoreConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            store: StoreConfig::at(DEFAULT_DB),
        }
    }
}

impl CliConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        if config.default_page_size == 0 {
            anyhow::bail!("{}: default_page_size must be positive", path.display());
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Store settings with `--db` applied.
    pub fn store_config(&self, db: Option<PathBuf>) -> StoreConfig {
        let mut store = self.store.clone();
        if let Some(path) = db {
            store.path = Some(path);
        }
        store
    }
}
