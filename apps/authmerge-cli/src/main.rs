//! `authmerge` command-line tool.
//!
//! Authorizes decoded changes against an exported snapshot, or prints the
//! snapshot's object path index. Logs go to stderr; results go to stdout as
//! JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use authmerge::config::load_section;
use authmerge::{AuthmergeConfig, BackendKind, DenialReason, EmbeddedIdentity, MemoryDocument, Service, Verdict};
use authmerge_sdk::{DecodedChange, PolicyEvaluatorClient};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use static_policy_plugin::StaticPolicyPluginConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit status of a `check` that denied the changes.
const EXIT_DENIED: u8 = 2;

/// Config file section and environment prefix of the static policy plugin.
const STATIC_POLICY_SECTION: &str = "static_policy";
const STATIC_POLICY_ENV_PREFIX: &str = "STATIC_POLICY_";

#[derive(Parser)]
#[command(name = "authmerge", version)]
#[command(about = "Path-scoped authorization of CRDT document changes", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether changes may be applied to a snapshot
    Check {
        /// Snapshot exported as JSON
        #[arg(short, long)]
        snapshot: PathBuf,

        /// One decoded change, or a JSON array of them
        #[arg(long)]
        changes: PathBuf,
    },

    /// Print the object path index of a snapshot
    Index {
        /// Snapshot exported as JSON
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

/// Contents of a changes file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChangesFile {
    Batch(Vec<DecodedChange>),
    Single(DecodedChange),
}

impl From<ChangesFile> for Vec<DecodedChange> {
    fn from(file: ChangesFile) -> Self {
        match file {
            ChangesFile::Batch(changes) => changes,
            ChangesFile::Single(change) => vec![change],
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct CheckOutput {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<DenialReason>,
}

impl From<Verdict> for CheckOutput {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => Self {
                allowed: true,
                reason: None,
            },
            Verdict::Deny(reason) => Self {
                allowed: false,
                reason: Some(reason),
            },
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {what} file '{}'", path.display()))
}

fn build_service(config_path: Option<&Path>) -> anyhow::Result<Service> {
    let config = AuthmergeConfig::load(config_path).context("failed to load configuration")?;

    let evaluator: Option<Arc<dyn PolicyEvaluatorClient>> = match config.backend {
        BackendKind::Rules => None,
        BackendKind::Delegated => {
            let plugin_config: StaticPolicyPluginConfig =
                load_section(config_path, STATIC_POLICY_SECTION, STATIC_POLICY_ENV_PREFIX)
                    .context("failed to load static policy configuration")?;
            Some(Arc::new(static_policy_plugin::Service::new(plugin_config)))
        }
    };

    Service::from_config(&config, evaluator).context("failed to initialize authmerge")
}

async fn check(
    config_path: Option<&Path>,
    snapshot_path: &Path,
    changes_path: &Path,
) -> anyhow::Result<CheckOutput> {
    let service = build_service(config_path)?;
    let snapshot: MemoryDocument = read_json(snapshot_path, "snapshot")?;
    let changes: Vec<DecodedChange> = read_json::<ChangesFile>(changes_path, "changes")?.into();

    info!(changes = changes.len(), "authorizing changes");
    let verdict = service
        .evaluate(&snapshot, &EmbeddedIdentity, &changes)
        .await
        .context("authorization failed")?;
    Ok(verdict.into())
}

fn index(snapshot_path: &Path) -> anyhow::Result<serde_json::Value> {
    let snapshot: MemoryDocument = read_json(snapshot_path, "snapshot")?;
    let index = authmerge::PathIndex::build(&snapshot, &EmbeddedIdentity)
        .context("snapshot is inconsistent")?;
    Ok(serde_json::to_value(&index)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Check { snapshot, changes } => {
            let output = check(cli.config.as_deref(), &snapshot, &changes).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(if output.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DENIED)
            })
        }
        Commands::Index { snapshot } => {
            println!("{}", serde_json::to_string_pretty(&index(&snapshot)?)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
