use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use taskboard::config::{CliOverrides, ServiceConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Task-board service: boards, ordered columns, and cards over HTTP")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Path to the config file. Defaults to ./taskboard.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Create the database and run migrations, then exit
    InitDb {
        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// Only check the configuration and report problems
        #[arg(long)]
        validate: bool,
    },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose {
        "taskboard=debug,tower_http=debug"
    } else {
        "taskboard=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match &cli.command {
        Commands::Serve {
            host,
            port,
            db_path,
        } => {
            let config = ServiceConfig::resolve(
                cli.config.as_deref(),
                CliOverrides {
                    host: host.clone(),
                    port: *port,
                    db_path: db_path.clone(),
                },
            )?;
            cmd::cmd_serve(config).await?;
        }
        Commands::InitDb { db_path } => {
            let config = ServiceConfig::resolve(
                cli.config.as_deref(),
                CliOverrides {
                    db_path: db_path.clone(),
                    ..Default::default()
                },
            )?;
            cmd::cmd_init_db(&config)?;
        }
        Commands::Config { validate } => {
            let config = ServiceConfig::resolve(cli.config.as_deref(), CliOverrides::default())?;
            cmd::cmd_config(&config, *validate)?;
        }
    }

    Ok(())
}
