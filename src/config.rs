//! Bridge configuration stored as TOML in the user's config directory.
//!
//! The file is created with defaults on first start. Every key is optional,
//! missing keys fall back to the default value. The loaded configuration is
//! validated once and then treated as immutable for the lifetime of the bridge.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::leash::{AddressTable, Channel};

const CONFIG_DIR: &str = "oscleash";
const CONFIG_FILE: &str = "config.toml";
/// Overrides the config file location.
pub const CONFIG_ENV: &str = "OSCLEASH_CONFIG";

const PARAM_PREFIX: &str = "/avatar/parameters/";

/// Accepted range for the loop delays, in seconds.
const MIN_DELAY_SECS: f32 = 0.001;
const MAX_DELAY_SECS: f32 = 60.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Names of the avatar parameters the leash reports on.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ParameterNames {
    #[serde(rename = "Z_Positive")]
    pub z_positive: String,
    #[serde(rename = "Z_Negative")]
    pub z_negative: String,
    #[serde(rename = "X_Positive")]
    pub x_positive: String,
    #[serde(rename = "X_Negative")]
    pub x_negative: String,
    /// Base name of the physbone; `_IsGrabbed` and `_Stretch` are appended.
    #[serde(rename = "PhysboneParameter")]
    pub physbone_parameter: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            z_positive: "Leash_Z+".to_string(),
            z_negative: "Leash_Z-".to_string(),
            x_positive: "Leash_X+".to_string(),
            x_negative: "Leash_X-".to_string(),
            physbone_parameter: "Leash".to_string(),
        }
    }
}

impl ParameterNames {
    /// Full OSC address for a channel.
    pub fn address(&self, channel: Channel) -> String {
        match channel {
            Channel::ZPositive => format!("{PARAM_PREFIX}{}", self.z_positive),
            Channel::ZNegative => format!("{PARAM_PREFIX}{}", self.z_negative),
            Channel::XPositive => format!("{PARAM_PREFIX}{}", self.x_positive),
            Channel::XNegative => format!("{PARAM_PREFIX}{}", self.x_negative),
            Channel::Grab => format!("{PARAM_PREFIX}{}_IsGrabbed", self.physbone_parameter),
            Channel::Stretch => format!("{PARAM_PREFIX}{}_Stretch", self.physbone_parameter),
        }
    }

    pub fn address_table(&self) -> AddressTable {
        AddressTable::from_pairs(
            Channel::ALL
                .iter()
                .map(|&channel| (self.address(channel), channel)),
        )
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address the movement commands are sent to.
    pub ip: String,
    pub listening_port: u16,
    pub sending_port: u16,
    pub run_deadzone: f32,
    pub walk_deadzone: f32,
    /// Seconds between control ticks.
    pub active_delay: f32,
    /// Seconds between the two stop commands of a release, and the idle wait.
    pub inactive_delay: f32,
    /// Log every emitted command at info level.
    pub logging: bool,
    pub parameters: ParameterNames,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::LOCALHOST.to_string(),
            listening_port: 9001,
            sending_port: 9000,
            run_deadzone: 0.70,
            walk_deadzone: 0.15,
            active_delay: 0.1,
            inactive_delay: 0.15,
            logging: false,
            parameters: ParameterNames::default(),
        }
    }
}

impl BridgeConfig {
    /// Location of the config file, honouring [`CONFIG_ENV`].
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Loads the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub async fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = if exists {
            debug!("Reading config from {}", path.display());
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
            Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            warn!(
                "No config found at {}, writing defaults",
                path.display()
            );
            let config = Self::default();
            config.save(path).await?;
            config
        };

        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("run_deadzone", self.run_deadzone),
            ("walk_deadzone", self.walk_deadzone),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.walk_deadzone > self.run_deadzone {
            return Err(ConfigError::Invalid(format!(
                "walk_deadzone ({}) must not exceed run_deadzone ({})",
                self.walk_deadzone, self.run_deadzone
            )));
        }
        for (name, value) in [
            ("active_delay", self.active_delay),
            ("inactive_delay", self.inactive_delay),
        ] {
            // also keeps Duration::from_secs_f32 and tokio timers away from
            // overflow and zero periods
            if !(MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between {MIN_DELAY_SECS} and {MAX_DELAY_SECS} seconds, got {value}"
                )));
            }
        }
        self.target_ip()?;
        Ok(())
    }

    pub fn target_ip(&self) -> Result<IpAddr, ConfigError> {
        self.ip
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("ip is not an IP address: {}", self.ip)))
    }

    pub fn is_localhost(&self) -> bool {
        self.target_ip().map(|ip| ip.is_loopback()).unwrap_or(false)
    }

    pub fn send_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.target_ip()?, self.sending_port))
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.listening_port)
    }

    pub fn active_delay(&self) -> Duration {
        Duration::from_secs_f32(self.active_delay)
    }

    pub fn inactive_delay(&self) -> Duration {
        Duration::from_secs_f32(self.inactive_delay)
    }
}
