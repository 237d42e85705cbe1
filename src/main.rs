use clap::Parser;
use scp_load::cli::run::{run, LoadOptions, RunError};
use scp_load::source::InputFormat;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scp-load")]
#[command(version, about = "Load JSON or CSV event files into the ingest service", long_about = None)]
struct Cli {
    /// Input file (.json or .csv)
    file: PathBuf,

    /// Tenant identifier
    #[arg(long)]
    tenant: String,

    /// Event host name (defaults to this machine's hostname)
    #[arg(long)]
    host: Option<String>,

    /// Event source
    #[arg(long)]
    source: Option<String>,

    /// Event sourcetype
    #[arg(long)]
    sourcetype: Option<String>,

    /// Input format, overriding the file extension
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Application registration file
    #[arg(long)]
    appreg: Option<PathBuf>,

    /// Byte ceiling per batch
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Event ceiling per batch
    #[arg(long)]
    max_events: Option<usize>,
}

impl From<Cli> for LoadOptions {
    fn from(cli: Cli) -> Self {
        LoadOptions {
            input: cli.file,
            tenant: cli.tenant,
            host: cli.host,
            source: cli.source,
            sourcetype: cli.sourcetype,
            format: cli.format,
            config: cli.config,
            appreg: cli.appreg,
            max_bytes: cli.max_bytes,
            max_events: cli.max_events,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scp_load=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let report = run(LoadOptions::from(cli)).await?;

    println!("{}", report.summary());

    report.into_result().map_err(RunError::Pipeline)?;

    Ok(())
}
