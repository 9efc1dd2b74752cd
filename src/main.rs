mod command;
mod config;
mod installer;
mod logbuf;
mod service;
mod status;
mod transport;
mod trust;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{ServiceConfig, TransportKind};
use installer::{InstallerRunner, TokioLauncher};
use logbuf::{init_tracing, LogBuffer, LogOutput};
use service::{Registration, RestartPolicy, ServiceContext, ServiceLoop};
use status::StatusStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use transport::{SessionLimits, TcpTransport, Transport};
use trust::{AllowList, DetachedSignatureProvider, Thumbprint, TrustValidator};

#[derive(Parser)]
#[command(
    name = "autoupdate-service",
    about = "Validates signed installers and runs them on behalf of a local client",
    version
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Register the service with the user service manager
    Install,
    /// Remove the service registration
    Uninstall,
    /// Run in the foreground, logging to stdout
    Test,
    /// Run as a managed service, logging to a file (default)
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mode = cli.command.unwrap_or(Mode::Run);

    match run(mode, cli.config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("autoupdate-service: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: Mode, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let config = ServiceConfig::load(config_path.as_deref())?;
    let buffer = LogBuffer::with_capacity(config.logging.buffer_capacity);

    let output = if mode == Mode::Run {
        LogOutput::File
    } else {
        LogOutput::Stdout
    };
    let log_dir = config.data_dir()?;
    let _guard = init_tracing(buffer.clone(), output, &config.logging.filter, &log_dir)?;

    match mode {
        Mode::Install => Ok(register(&config, config_path.as_deref())),
        Mode::Uninstall => Ok(unregister(&config)),
        Mode::Test | Mode::Run => {
            info!("Starting service ({:?} mode)", output);
            serve(config, buffer).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn register(config: &ServiceConfig, config_path: Option<&std::path::Path>) -> ExitCode {
    let result = std::env::current_exe()
        .context("locating service executable")
        .and_then(|exe| {
            // The unit must not depend on the caller's working directory
            let config_path =
                config_path.map(|p| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()));
            let registration = Registration::for_user(&config.service.name)?;
            Ok(registration.install(&exe, config_path.as_deref())?)
        });

    match result {
        Ok(path) => {
            println!("Service installed successfully ({})", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Service failed to install: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn unregister(config: &ServiceConfig) -> ExitCode {
    let result = Registration::for_user(&config.service.name).and_then(|r| r.uninstall());
    match result {
        Ok(_) => {
            println!("Service uninstalled successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Service failed to uninstall: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ServiceConfig, buffer: LogBuffer) -> Result<()> {
    let data_dir = config.data_dir()?;
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating data directory {:?}", data_dir))?;

    let allow_list = AllowList::with_additional(&config.trust.additional_thumbprints)
        .context("invalid trust.additional_thumbprints")?;
    let allowed = allow_list.len();
    let distrusted = config
        .trust
        .distrusted_keys
        .iter()
        .map(|s| s.parse::<Thumbprint>())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid trust.distrusted_keys")?;

    let provider = Arc::new(DetachedSignatureProvider::new(distrusted));
    let validator = Arc::new(TrustValidator::new(provider, allow_list));
    info!(
        "Trust provider {} with {} allowed signers",
        validator.provider_name(),
        allowed
    );

    let status = Arc::new(StatusStore::new(config.status_path()?));
    info!(
        "Status file {:?}, log buffer capacity {} ({} held)",
        status.path(),
        buffer.capacity(),
        buffer.len()
    );
    let runner = InstallerRunner::new(
        validator,
        status.clone(),
        Arc::new(TokioLauncher::with_working_dir(&data_dir)),
        config.installer.clone(),
        config.installer_log_path()?,
    );
    let ctx = Arc::new(ServiceContext::new(buffer, status, runner));

    let transport = build_transport(&config)?;
    let policy = RestartPolicy {
        delay: config.restart_delay(),
        max_delay: config.max_restart_delay(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    ServiceLoop::new(ctx, transport, policy).run(shutdown_rx).await;
    Ok(())
}

fn build_transport(config: &ServiceConfig) -> Result<Arc<dyn Transport>> {
    let limits = SessionLimits::from(&config.transport);
    match config.transport.kind {
        TransportKind::Unix => unix_transport(config, limits),
        TransportKind::Tcp => Ok(Arc::new(TcpTransport::new(
            &config.transport.tcp_address,
            limits,
        )?)),
    }
}

#[cfg(unix)]
fn unix_transport(config: &ServiceConfig, limits: SessionLimits) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(transport::UnixSocketTransport::new(
        config.socket_path()?,
        limits,
    )))
}

#[cfg(not(unix))]
fn unix_transport(_config: &ServiceConfig, _limits: SessionLimits) -> Result<Arc<dyn Transport>> {
    anyhow::bail!("the unix transport is not available on this platform; use kind = \"tcp\"")
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
