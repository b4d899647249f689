//! Command-line front end for model_sync

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use model_sync::config::{self, Config, LoggingConfig};
use model_sync::db::migrations::write_migration_file;
use model_sync::sync::{ApplyRequest, ApplyResponse};
use model_sync::{SchemaDefinition, SyncService};

#[derive(Parser)]
#[command(name = "model_sync", version, about = "Synchronize a database with a model definition")]
struct Cli {
    /// TOML configuration file; DB_* environment variables are used without one
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level when the configuration has no [logging] section
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the pending changes as JSON
    Diff { definition: PathBuf },
    /// Print the DDL the pending changes would run
    Plan {
        definition: PathBuf,
        /// Also write the statements to a timestamped file in this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply the pending changes in one transaction
    Apply {
        definition: PathBuf,
        /// Print the statements without running them
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply a JSON change list, as produced by `diff`
    ApplyChanges { changes: PathBuf },
}

fn read_definition(path: &Path) -> anyhow::Result<SchemaDefinition> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let definition = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => SchemaDefinition::from_yaml(&input)?,
        _ => SchemaDefinition::from_json(&input)?,
    };
    Ok(definition)
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => config::load_from_env(),
    };
    if config.logging.is_none() {
        config.logging = Some(LoggingConfig {
            level: cli.log_level.clone(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        });
    }
    Ok(config)
}

async fn plan(
    service: &SyncService,
    definition: &SchemaDefinition,
    out: Option<&Path>,
) -> anyhow::Result<Vec<model_sync::Change>> {
    let changes = service.diff(definition).await?.into_changes();
    let statements = service.plan(&changes);
    for statement in &statements {
        println!("{};", statement);
    }
    if let Some(dir) = out {
        let path = write_migration_file(dir, &statements)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(changes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let service = model_sync::connect(config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Diff { definition } => {
            let request = read_definition(&definition)?;
            let response = service.diff_request(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Plan { definition, out } => {
            let definition = read_definition(&definition)?;
            plan(&service, &definition, out.as_deref()).await?;
        }
        Command::Apply {
            definition,
            dry_run,
            out,
        } => {
            let definition = read_definition(&definition)?;
            let changes = plan(&service, &definition, out.as_deref()).await?;
            if dry_run {
                tracing::info!(changes = changes.len(), "Dry run, nothing applied");
            } else if changes.is_empty() {
                tracing::info!("Database schema is already in sync with models");
            } else {
                service.apply_migration(&changes).await?;
                tracing::info!(changes = changes.len(), "Migration applied");
            }
        }
        Command::ApplyChanges { changes } => {
            let input = fs::read_to_string(&changes)
                .with_context(|| format!("failed to read {}", changes.display()))?;
            let request = ApplyRequest::from_json(&input)?;
            let version = request
                .version
                .clone()
                .unwrap_or_else(|| service.config().default_version.clone());
            let response = match service.apply_request(request).await {
                Ok(response) => response,
                Err(error) => ApplyResponse::from_error(&error, version),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.status != "success" {
                service.close().await;
                std::process::exit(1);
            }
        }
    }

    service.close().await;
    Ok(())
}
