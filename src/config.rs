//! Configuration management for the RAX FTP client
//!
//! Separates connection configuration (where to go, who to be) from session
//! configuration (how the engine behaves once connected).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::client::tls::TlsMode;
use crate::protocol::OverwritePattern;
use crate::transfer::{DataMode, TransferType};

/// Complete client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    #[serde(flatten)]
    pub session: SessionConfig,
}

/// Where to connect and how to log in
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// Environment: RAX_FTP_HOST
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Sent with ACCT when the server asks for it
    #[serde(default)]
    pub account: Option<String>,

    /// Remote directory to change into after login
    #[serde(default)]
    pub target_dir: Option<String>,

    #[serde(default)]
    pub create_target_dir: bool,
}

/// Engine behaviour for one session
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Deadline for every socket operation, in seconds
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,

    #[serde(default)]
    pub data_mode: DataMode,

    #[serde(default)]
    pub transfer_type: TransferType,

    #[serde(default)]
    pub tls: TlsMode,

    /// Check server certificates against the platform trust store
    #[serde(default)]
    pub verify_certificates: bool,

    /// Reuse the last active-mode port for the next upload
    #[serde(default)]
    pub reuse_data_port: bool,

    /// SO_SNDBUF/SO_RCVBUF hint for data connections, 0 leaves the OS default
    #[serde(default)]
    pub sockbuf_size: usize,

    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// SITE IDLE value sent after login, 0 disables
    #[serde(default)]
    pub idle_secs: u32,

    /// Pipeline RNFR and RNTO in one write
    #[serde(default)]
    pub fast_rename: bool,

    /// Additional replies that mean "target exists, delete first"
    #[serde(default)]
    pub overwrite_patterns: Vec<OverwritePattern>,
}

fn default_port() -> u16 {
    21
}

fn default_username() -> String {
    "anonymous".to_string()
}

fn default_transfer_timeout() -> u64 {
    120
}

fn default_block_size() -> usize {
    65536
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_secs: default_transfer_timeout(),
            data_mode: DataMode::default(),
            transfer_type: TransferType::default(),
            tls: TlsMode::default(),
            verify_certificates: false,
            reuse_data_port: false,
            sockbuf_size: 0,
            block_size: default_block_size(),
            idle_secs: 0,
            fast_rename: false,
            overwrite_patterns: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from an optional TOML file with `RAX_FTP_*` environment overrides
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or("config")).required(path.is_some()))
            .add_source(Environment::with_prefix("RAX_FTP").try_parsing(true))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.connection.host.is_empty() {
            return Err(config::ConfigError::Message("host cannot be empty".into()));
        }

        if self.connection.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        self.session.validate()
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.transfer_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "transfer_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.block_size == 0 {
            return Err(config::ConfigError::Message(
                "block_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get transfer timeout as Duration
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    /// Socket buffer hint, `None` when unset
    pub fn sockbuf_hint(&self) -> Option<usize> {
        (self.sockbuf_size > 0).then_some(self.sockbuf_size)
    }
}
