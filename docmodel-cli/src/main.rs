//! docmodel command-line front end.
//!
//! Usage:
//!   docmodel --models ./models check
//!   docmodel --db app.db exec addEntity --data '{"model":"user","entity":{...}}'
//!   docmodel --config docmodel.toml exec getEntities < request.json
//!
//! Responses are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docmodel_cli::{check, execute, load_config, open_repository, Overrides};
use docmodel_engine::Operation;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "docmodel")]
#[command(about = "Compile model definitions and run entity operations")]
struct Args {
    /// Engine config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Definition directory, overrides the config
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    /// SQLite database file, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reject models declaring more than one password field
    #[arg(long, global = true)]
    strict: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every definition and print the resulting schemas
    Check,
    /// Run one repository operation and print its response
    Exec {
        /// Operation name, e.g. addEntity or getEntities
        operation: String,

        /// Request envelope file; stdin is read when neither this nor --data is set
        #[arg(short, long, conflicts_with = "data")]
        request: Option<PathBuf>,

        /// Inline request envelope
        #[arg(short, long)]
        data: Option<String>,
    },
    /// List the operation names accepted by `exec`
    Operations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let overrides = Overrides {
        definitions: args.models,
        db: args.db,
        strict_password_fields: args.strict,
    };
    let config = load_config(args.config.as_deref(), &overrides)?;

    match args.command {
        Command::Check => {
            let report = check(&config)?;
            info!(models = report.models.len(), "Definitions compiled");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Exec {
            operation,
            request,
            data,
        } => {
            let body = match (data, request) {
                (Some(data), _) => data,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read request {}", path.display()))?,
                (None, None) => {
                    let mut body = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut body)
                        .await
                        .context("Failed to read request from stdin")?;
                    body
                }
            };
            debug!(%operation, bytes = body.len(), "Executing request");

            let response = tokio::task::spawn_blocking(move || {
                let repo = open_repository(&config)?;
                execute(&repo, &operation, &body)
            })
            .await
            .context("Request task panicked")??;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Operations => {
            for op in Operation::ALL {
                println!("{op}");
            }
        }
    }
    Ok(())
}
