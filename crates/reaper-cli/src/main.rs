use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod policy;

#[derive(Parser)]
#[command(
    name = "reaper",
    about = "Reaper — find, flag, and retire idle cloud instances",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the recorded instances the configured filters select.
    ///
    /// Records are `aws ec2 describe-instances` JSON output for one region.
    Scan {
        /// Path to reaper.toml
        #[arg(short, long, default_value = "reaper.toml")]
        config: PathBuf,
        /// describe-instances JSON for the region
        #[arg(short, long)]
        records: PathBuf,
        /// Region the records belong to (default: first configured region)
        #[arg(long)]
        region: Option<String>,
        /// Reference time for escalation (RFC 3339, default: now)
        #[arg(long)]
        now: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Replay one escalation sweep against recorded instances.
    ///
    /// Runs against an in-process copy of the records; nothing is sent to
    /// the provider. Honors `dry_run` from the config.
    Sweep {
        #[arg(short, long, default_value = "reaper.toml")]
        config: PathBuf,
        #[arg(short, long)]
        records: PathBuf,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        now: Option<String>,
        /// Write the records as they stand after the sweep
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode a REAPER tag value.
    Decode {
        /// The raw tag value
        tag: String,
    },
    /// Validate a config file, including every filter definition.
    CheckConfig {
        #[arg(short, long, default_value = "reaper.toml")]
        config: PathBuf,
    },
    /// Write a dry-run reaper.toml scaffold.
    Init {
        #[arg(short, long, default_value = "reaper.toml")]
        path: PathBuf,
        /// Regions to sweep
        #[arg(long = "region", default_value = "us-east-1")]
        regions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("reaper=info".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    match cli.command {
        Commands::Scan {
            config,
            records,
            region,
            now,
            format,
        } => commands::scan::scan(&config, &records, region.as_deref(), now.as_deref(), format),
        Commands::Sweep {
            config,
            records,
            region,
            now,
            output,
        } => {
            commands::sweep::sweep(
                &config,
                &records,
                region.as_deref(),
                now.as_deref(),
                output.as_deref(),
            )
            .await
        }
        Commands::Decode { tag } => commands::decode::decode(&tag),
        Commands::CheckConfig { config } => commands::config::check(&config),
        Commands::Init { path, regions } => commands::config::init(&path, &regions),
    }
}
