use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from `config.toml` in the user config dir; CLI flags override
/// whatever the file says. Missing keys fall back to the storefront theme's
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storefront: StorefrontConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load config from an explicit path; a missing file means defaults
    pub fn load_from(config_path: &Path) -> crate::Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to `config_path`, creating parent dirs
    pub fn save_to(&self, config_path: &Path) -> crate::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)?;
        Ok(())
    }

    pub fn config_path() -> crate::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> crate::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("rvp"))
    }

    /// Where on-disk storage lives when the config does not say
    pub fn data_dir() -> crate::Result<PathBuf> {
        Ok(dirs::data_local_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("rvp"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Shop origin, e.g. https://shop.example.com
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Alternate product template that renders only the card
    #[serde(default = "default_view")]
    pub view: String,

    /// Selector for the slide element inside the rendered card
    #[serde(default = "default_selector")]
    pub selector: String,

    /// Scopes the viewed list so two shops never share one
    #[serde(default = "default_shop_id")]
    pub shop_id: String,
}

fn default_base_url() -> String {
    "http://localhost:9292".to_string()
}

fn default_view() -> String {
    rvp_api::DEFAULT_FRAGMENT_VIEW.to_string()
}

fn default_selector() -> String {
    rvp_api::DEFAULT_FRAGMENT_SELECTOR.to_string()
}

fn default_shop_id() -> String {
    "default".to_string()
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            view: default_view(),
            selector: default_selector(),
            shop_id: default_shop_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fragment TTL in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Key prefix for session tier slots
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// SQLite file backing the session tier (defaults under the data dir)
    #[serde(default)]
    pub session_db: Option<PathBuf>,

    /// SQLite file backing the viewed list (defaults under the data dir)
    #[serde(default)]
    pub local_db: Option<PathBuf>,
}

fn default_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_session_prefix() -> String {
    "rvp_".to_string()
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            session_prefix: default_session_prefix(),
            session_db: None,
            local_db: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How many cards the section shows
    #[serde(default = "default_products_to_show")]
    pub products_to_show: usize,

    /// Cap on the recorded viewed list
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// How long to wait for the carousel before falling back to a grid
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    #[serde(default)]
    pub hide_empty_section: bool,

    /// Theme editor preview; the section renders nothing
    #[serde(default)]
    pub design_mode: bool,

    /// Key namespace for the viewed list
    #[serde(default = "default_storage_namespace")]
    pub storage_namespace: String,
}

fn default_products_to_show() -> usize {
    4
}

fn default_max_items() -> usize {
    crate::recorder::MAX_ITEMS
}

fn default_readiness_timeout_ms() -> u64 {
    3000
}

fn default_storage_namespace() -> String {
    crate::recorder::DEFAULT_STORAGE_NAMESPACE.to_string()
}

impl DisplayConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            products_to_show: default_products_to_show(),
            max_items: default_max_items(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
            hide_empty_section: false,
            design_mode: false,
            storage_namespace: default_storage_namespace(),
        }
    }
}
