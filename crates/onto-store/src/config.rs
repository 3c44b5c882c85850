use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`DataStore`](crate::DataStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// When `true`, `ONE` link sides that declare a foreign-key property are
    /// kept in sync with that property on every write.
    pub strict: bool,
    /// Page size used when a load request does not give one.
    pub default_page_size: usize,
    /// Largest page size a load request may ask for.
    pub max_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict: false,
            default_page_size: 1_000,
            max_page_size: 10_000,
        }
    }
}

impl StoreConfig {
    /// Default configuration with foreign-key sync turned on.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.default_page_size == 0 {
            return Err(StoreError::Config("default_page_size must be positive".into()));
        }
        if self.max_page_size < self.default_page_size {
            return Err(StoreError::Config(format!(
                "max_page_size ({}) is smaller than default_page_size ({})",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }
}
