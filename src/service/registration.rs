//! Service registration as a systemd user unit

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("cannot determine the user unit directory")]
    NoUnitDir,

    #[error("service {0} is already installed")]
    AlreadyInstalled(String),

    #[error("service {0} is not installed")]
    NotInstalled(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Unit file location for one service name
#[derive(Debug, Clone)]
pub struct Registration {
    name: String,
    unit_dir: PathBuf,
}

impl Registration {
    pub fn new(name: impl Into<String>, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            unit_dir: unit_dir.into(),
        }
    }

    /// `~/.config/systemd/user` (or the platform equivalent)
    pub fn for_user(name: impl Into<String>) -> Result<Self, RegistrationError> {
        let base = directories::BaseDirs::new().ok_or(RegistrationError::NoUnitDir)?;
        Ok(Self::new(name, base.config_dir().join("systemd").join("user")))
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.service", self.name))
    }

    /// Unit file text starting `exe run`
    pub fn unit_contents(&self, exe: &Path, config: Option<&Path>) -> String {
        let mut exec_start = format!("\"{}\"", exe.display());
        if let Some(config) = config {
            exec_start.push_str(&format!(" --config \"{}\"", config.display()));
        }
        exec_start.push_str(" run");

        format!(
            "[Unit]\n\
             Description=Auto-update service ({name})\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec_start}\n\
             Restart=on-failure\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n",
            name = self.name,
            exec_start = exec_start,
        )
    }

    /// Write the unit file; fails if one already exists
    pub fn install(
        &self,
        exe: &Path,
        config: Option<&Path>,
    ) -> Result<PathBuf, RegistrationError> {
        let path = self.unit_path();
        if path.exists() {
            return Err(RegistrationError::AlreadyInstalled(self.name.clone()));
        }

        fs::create_dir_all(&self.unit_dir).map_err(|source| RegistrationError::Io {
            path: self.unit_dir.clone(),
            source,
        })?;
        fs::write(&path, self.unit_contents(exe, config)).map_err(|source| {
            RegistrationError::Io {
                path: path.clone(),
                source,
            }
        })?;

        info!("Service unit written to {:?}", path);
        Ok(path)
    }

    /// Remove the unit file
    pub fn uninstall(&self) -> Result<PathBuf, RegistrationError> {
        let path = self.unit_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Service unit {:?} removed", path);
                Ok(path)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RegistrationError::NotInstalled(self.name.clone()))
            }
            Err(source) => Err(RegistrationError::Io { path, source }),
        }
    }
}
