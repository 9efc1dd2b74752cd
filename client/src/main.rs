mod session;

use anyhow::{bail, Result};
use autoupdate_shared::Request;
use clap::{Parser, Subcommand};
use session::{Endpoint, ServiceConnection};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "autoupdate-client",
    about = "Talk to the local auto-update service",
    version
)]
struct Cli {
    /// Unix socket of the service (defaults to the service data directory)
    #[arg(long, conflicts_with = "tcp")]
    socket: Option<PathBuf>,

    /// Loopback TCP address of the service
    #[arg(long)]
    tcp: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and run an installer, then print its log
    Install { path: PathBuf },
    /// Outcome of the last install
    Status,
    /// Print one batch of buffered service log lines
    Log,
    /// Send a raw request line
    Raw { line: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let endpoint = endpoint(&cli)?;

    let mut conn = ServiceConnection::connect(&endpoint).await?;
    let result = run(&mut conn, cli.command).await;
    conn.disconnect().await?;
    result
}

async fn run(conn: &mut ServiceConnection, command: Commands) -> Result<()> {
    match command {
        Commands::Install { path } => {
            // The service has its own working directory
            let path = std::fs::canonicalize(&path).unwrap_or(path);
            let request = Request::RunInstaller(path.to_string_lossy().into_owned());
            let response = conn.request(&request).await?;
            println!("{}", response);
            for line in conn.drain_log().await? {
                println!("{}", line);
            }
        }
        Commands::Status => println!("{}", conn.request(&Request::QueryStatus).await?),
        Commands::Log => {
            for line in conn.drain_log().await? {
                println!("{}", line);
            }
        }
        Commands::Raw { line } => {
            let request = Request::parse(Some(&line));
            println!("{}", conn.request(&request).await?);
        }
    }
    Ok(())
}

fn endpoint(cli: &Cli) -> Result<Endpoint> {
    if let Some(address) = &cli.tcp {
        return Ok(Endpoint::Tcp(address.clone()));
    }
    default_socket(cli.socket.clone())
}

#[cfg(unix)]
fn default_socket(socket: Option<PathBuf>) -> Result<Endpoint> {
    if let Some(path) = socket {
        return Ok(Endpoint::Unix(path));
    }
    match directories::ProjectDirs::from("", "", "autoupdate-service") {
        Some(dirs) => Ok(Endpoint::Unix(dirs.data_local_dir().join("autoupdate.sock"))),
        None => bail!("cannot determine the service socket; pass --socket or --tcp"),
    }
}

#[cfg(not(unix))]
fn default_socket(socket: Option<PathBuf>) -> Result<Endpoint> {
    if socket.is_some() {
        bail!("unix sockets are not available on this platform; use --tcp");
    }
    Ok(Endpoint::Tcp("127.0.0.1:47600".into()))
}
