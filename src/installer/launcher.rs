//! External installer process seam

use crate::config::{InstallerConfig, INSTALLER_PLACEHOLDER, LOG_PLACEHOLDER};
use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Program and arguments for one installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Substitute the installer and verbose-log paths into the argument template
    pub fn render(config: &InstallerConfig, installer: &Path, log_file: &Path) -> Self {
        let installer = installer.to_string_lossy();
        let log_file = log_file.to_string_lossy();
        let args = config
            .args
            .iter()
            .map(|arg| {
                arg.replace(INSTALLER_PLACEHOLDER, &installer)
                    .replace(LOG_PLACEHOLDER, &log_file)
            })
            .collect();

        Self {
            program: config.program.clone(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A launched installer process
#[async_trait]
pub trait InstallerProcess: Send {
    /// Wait for exit. No timeout; `None` means no exit code (killed by signal).
    async fn wait(&mut self) -> io::Result<Option<i32>>;
}

/// Starts installer processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, invocation: &Invocation) -> io::Result<Box<dyn InstallerProcess>>;
}

/// Launcher backed by `tokio::process`, with stdio detached
#[derive(Debug, Default)]
pub struct TokioLauncher {
    working_dir: Option<PathBuf>,
}

impl TokioLauncher {
    /// Installers run with `dir` as their working directory
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }
}

struct TokioProcess {
    child: Child,
}

#[async_trait]
impl InstallerProcess for TokioProcess {
    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(&self, invocation: &Invocation) -> io::Result<Box<dyn InstallerProcess>> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        Ok(Box::new(TokioProcess { child }))
    }
}
