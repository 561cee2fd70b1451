//! autodsc: reconcile an Automation DSC node configuration with Azure.
//!
//! Each invocation runs one lifecycle operation for one logical resource
//! address and records the resulting identity in a local SQLite state file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use autodsc_arm::{ArmClientConfig, DEFAULT_API_VERSION, DEFAULT_ENDPOINT, HttpNodeConfigurationClient};
use autodsc_node::{DesiredSpec, Driver, NodeConfigurationReconciler, SqliteStateStore, StateStore};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Automation DSC node configuration reconciler
#[derive(Parser, Debug)]
#[command(name = "autodsc", version, about)]
struct Args {
    #[command(flatten)]
    arm: ArmArgs,

    /// Directory holding the state database
    #[arg(long, default_value = ".autodsc", global = true)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Connection settings for Azure Resource Manager
#[derive(ClapArgs, Debug)]
struct ArmArgs {
    /// Azure Resource Manager endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// Subscription that owns the automation account
    #[arg(long, global = true)]
    subscription_id: Option<String>,

    /// Bearer token for ARM (defaults to $AZURE_ACCESS_TOKEN)
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// ARM API version
    #[arg(long, default_value = DEFAULT_API_VERSION, global = true)]
    api_version: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Lifecycle(LifecycleCommand),

    /// Inspect local state
    #[command(subcommand)]
    State(StateCommand),
}

/// Operations that talk to Azure
#[derive(Subcommand, Debug)]
enum LifecycleCommand {
    /// Create or update a node configuration
    Apply(ApplyArgs),

    /// Show the tracked node configuration as seen remotely
    Show {
        #[arg(long)]
        address: String,
    },

    /// Delete the tracked node configuration
    Destroy {
        #[arg(long)]
        address: String,
    },

    /// Start tracking an existing node configuration
    Import {
        #[arg(long)]
        address: String,

        /// Full ARM resource ID
        #[arg(long)]
        id: String,
    },
}

#[derive(ClapArgs, Debug)]
struct ApplyArgs {
    /// Logical address the identity is stored under
    #[arg(long)]
    address: String,

    /// Node configuration name, <configuration>.<node>
    #[arg(long)]
    name: String,

    #[arg(long)]
    account_name: String,

    #[arg(long)]
    resource_group: String,

    /// Inline configuration content
    #[arg(long, conflicts_with = "content_file")]
    content: Option<String>,

    /// Read configuration content from a file
    #[arg(long)]
    content_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum StateCommand {
    /// List tracked addresses
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "autodsc=info,autodsc_node=info,autodsc_arm=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let store = Arc::new(
        SqliteStateStore::new(&args.state_dir)
            .await
            .with_context(|| format!("Failed to open state in {}", args.state_dir.display()))?,
    );

    match args.command {
        Command::State(state) => run_state(&store, state).await,
        Command::Lifecycle(lifecycle) => run_lifecycle(&args.arm, store, lifecycle).await,
    }
}

async fn run_state(store: &SqliteStateStore, command: StateCommand) -> Result<()> {
    match command {
        StateCommand::List => print_json(&store.list().await?),
    }
}

async fn run_lifecycle(
    arm: &ArmArgs,
    store: Arc<SqliteStateStore>,
    command: LifecycleCommand,
) -> Result<()> {
    let client = Arc::new(build_client(arm)?);
    let reconciler = NodeConfigurationReconciler::new(client, Arc::clone(&store));
    let driver = Driver::new(reconciler, store);

    // Ctrl-C cancels the in-flight request
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match command {
        LifecycleCommand::Apply(apply) => {
            let content = read_content(&apply).await?;
            let spec = DesiredSpec::new(
                apply.name,
                apply.account_name,
                apply.resource_group,
                content,
            );
            let report = driver
                .apply(&cancel, &apply.address, &spec)
                .await
                .with_context(|| format!("Failed to apply {}", apply.address))?;
            print_json(&report)
        }
        LifecycleCommand::Show { address } => {
            let status = driver
                .show(&cancel, &address)
                .await
                .with_context(|| format!("Failed to read {}", address))?;
            print_json(&status)
        }
        LifecycleCommand::Destroy { address } => {
            match driver
                .destroy(&cancel, &address)
                .await
                .with_context(|| format!("Failed to destroy {}", address))?
            {
                Some(id) => info!("Destroyed {}", id),
                None => info!("Nothing to destroy for {}", address),
            }
            Ok(())
        }
        LifecycleCommand::Import { address, id } => {
            let status = driver
                .import(&cancel, &address, &id)
                .await
                .with_context(|| format!("Failed to import {}", id))?;
            print_json(&status)
        }
    }
}

fn build_client(args: &ArmArgs) -> Result<HttpNodeConfigurationClient> {
    let Some(subscription_id) = args.subscription_id.clone() else {
        bail!("--subscription-id is required");
    };

    let mut config = ArmClientConfig::new(subscription_id);
    config.endpoint = args.endpoint.clone();
    config.api_version = args.api_version.clone();
    config.timeout = Duration::from_secs(args.timeout_secs);
    config.access_token = args
        .access_token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok());
    if config.access_token.is_none() {
        warn!("No access token given (--access-token or ${}), requests are unauthenticated", TOKEN_ENV);
    }

    HttpNodeConfigurationClient::new(config).context("Failed to build ARM client")
}

async fn read_content(apply: &ApplyArgs) -> Result<String> {
    match (&apply.content, &apply.content_file) {
        (Some(content), _) => Ok(content.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => bail!("one of --content or --content-file is required"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
