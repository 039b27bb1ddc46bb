//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use realforce_core::DeviceCriteria;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub exchange: ExchangeConfig,
    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rfctrl").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create() -> Result<Self, Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_with_header()?;
            eprintln!("created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config with header comments for new files
    pub fn save_with_header(&self) -> Result<(), Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# rfctrl configuration file
# Numeric ids accept decimal or 0x-prefixed hex, 0 matches any value.

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, format!("{header}{contents}"))?;
        Ok(())
    }
}

/// Default device matching criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    /// Only open the device at this platform path
    pub path: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let info = &realforce_gx1::INFO;
        Self {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            usage_page: info.usage_page,
            usage: info.usage,
            path: None,
        }
    }
}

impl DeviceConfig {
    pub fn criteria(&self) -> DeviceCriteria {
        let any = |v: u16| (v != 0).then_some(v);
        DeviceCriteria {
            vendor_id: any(self.vendor_id),
            product_id: any(self.product_id),
            usage_page: any(self.usage_page),
            usage: any(self.usage),
            path: self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Give up waiting for a reply after this long, unset waits forever
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// How long enumeration waits for the first device
    #[serde(with = "humantime_serde")]
    pub first_event: Duration,
    /// How long enumeration waits for each further device
    #[serde(with = "humantime_serde")]
    pub between_events: Duration,
    /// Hot-plug polling interval
    #[serde(with = "humantime_serde")]
    pub poll: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            first_event: Duration::from_millis(20),
            between_events: Duration::from_millis(10),
            poll: Duration::from_millis(500),
        }
    }
}
