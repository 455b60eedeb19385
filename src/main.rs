use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// A small blogging service backed by one SQLite file.
#[derive(Debug, Parser)]
#[command(name = "jotter", version, about)]
struct Cli {
    /// Instance directory holding config.toml and, by default, the database.
    #[arg(long, env = "JOTTER_INSTANCE", default_value = "instance", global = true)]
    instance: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve HTTP until SIGTERM or Ctrl-C.
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
    /// Clear the existing data and create new tables.
    InitDb,
}

fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), jotter::Error> {
    let app = jotter::create_app(cli.instance, None)?;

    match cli.command {
        Commands::Serve { addr } => app.serve(addr).await,
        Commands::InitDb => {
            println!("{}", app.run_command(jotter::INIT_DB)?);
            Ok(())
        }
    }
}
