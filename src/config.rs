//! Service configuration
//!
//! Code defaults, optionally overridden by a TOML file. Every section may be
//! omitted or partial.

use anyhow::{anyhow, Context, Result};
use autoupdate_shared::limits;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "autoupdate-service";

/// Placeholder substituted with the installer path
pub const INSTALLER_PLACEHOLDER: &str = "{installer}";
/// Placeholder substituted with the verbose log path
pub const LOG_PLACEHOLDER: &str = "{log}";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub transport: TransportConfig,
    pub installer: InstallerConfig,
    pub trust: TrustConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Name used for service registration
    pub name: String,
    /// Empty selects the platform local-data directory
    pub data_dir: String,
    /// Delay before restarting a transport that failed to start
    pub restart_delay_ms: u64,
    /// Upper bound for the doubling restart delay
    pub max_restart_delay_ms: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: APP_NAME.into(),
            data_dir: String::new(),
            restart_delay_ms: 1000,
            max_restart_delay_ms: 30_000,
        }
    }
}

/// Which local channel the service listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Unix domain socket
    Unix,
    /// TCP on a loopback address
    Tcp,
}

impl Default for TransportKind {
    fn default() -> Self {
        if cfg!(unix) {
            TransportKind::Unix
        } else {
            TransportKind::Tcp
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Empty selects `<data_dir>/autoupdate.sock`
    pub socket_path: String,
    pub tcp_address: String,
    pub max_request_len: usize,
    pub max_response_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            socket_path: String::new(),
            tcp_address: "127.0.0.1:47600".into(),
            max_request_len: limits::DEFAULT_MAX_REQUEST_LEN,
            max_response_len: limits::DEFAULT_MAX_RESPONSE_LEN,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub program: String,
    /// Argument template; see [`INSTALLER_PLACEHOLDER`] and [`LOG_PLACEHOLDER`]
    pub args: Vec<String>,
    /// Verbose log file, relative to the data directory
    pub log_file: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "msiexec".into(),
            args: vec![
                "/i".into(),
                INSTALLER_PLACEHOLDER.into(),
                "/q".into(),
                "LAUNCH_ON_INSTALL=false".into(),
                "/l*v".into(),
                LOG_PLACEHOLDER.into(),
            ],
            log_file: "msiexec.log".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Hex thumbprints merged with the compiled-in allow-list at start-up
    pub additional_thumbprints: Vec<String>,
    /// Hex thumbprints of signing keys reported as explicitly disallowed
    pub distrusted_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set
    pub filter: String,
    pub buffer_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            buffer_capacity: crate::logbuf::DEFAULT_CAPACITY,
        }
    }
}

impl ServiceConfig {
    /// Load configuration: explicit path, else the user config file if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => project_dirs()
                .map(|d| d.config_dir().join("config.toml"))
                .filter(|p| p.exists()),
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("parsing config file {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Directory holding the status file, installer log, service logs and socket
    pub fn data_dir(&self) -> Result<PathBuf> {
        if !self.service.data_dir.is_empty() {
            return Ok(PathBuf::from(&self.service.data_dir));
        }
        project_dirs()
            .map(|d| d.data_local_dir().to_path_buf())
            .ok_or_else(|| anyhow!("cannot determine a data directory for {}", APP_NAME))
    }

    pub fn status_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("status.sau"))
    }

    pub fn installer_log_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.installer.log_file))
    }

    pub fn socket_path(&self) -> Result<PathBuf> {
        if !self.transport.socket_path.is_empty() {
            return Ok(PathBuf::from(&self.transport.socket_path));
        }
        Ok(self.data_dir()?.join("autoupdate.sock"))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.service.restart_delay_ms)
    }

    pub fn max_restart_delay(&self) -> Duration {
        Duration::from_millis(self.service.max_restart_delay_ms)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}
