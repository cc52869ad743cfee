mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clustermon_client::HttpClusterClient;
use clustermon_core::{ClusterConfig, ClusterConfigPatch, MonitorSettings, MutationReport, StatusFetcher};
use clustermon_monitor::{ClusterActions, ClusterSnapshot, Poller, Reconciler};
use colored::Colorize;
use render::OutputFormat;
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clustermon")]
#[command(about = "ClusterMon - graph database cluster status and administration", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "CLUSTERMON_CONFIG")]
    config: Option<PathBuf>,

    /// Workbench base URL of the node to talk to
    #[arg(long, global = true, env = "CLUSTERMON_URL")]
    url: Option<String>,

    /// Authorization header value
    #[arg(long, global = true, env = "CLUSTERMON_AUTHORIZATION", hide_env_values = true)]
    authorization: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cluster topology once
    Status,

    /// Poll cluster status until interrupted
    Watch {
        /// Poll period in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Show cluster configuration
    Config,

    /// Create a cluster from the given nodes
    Create {
        /// RPC addresses of the members (host:port)
        #[arg(short, long = "node", required = true)]
        nodes: Vec<String>,

        #[command(flatten)]
        properties: ClusterProperties,
    },

    /// Change cluster properties
    Edit {
        #[command(flatten)]
        properties: ClusterProperties,
    },

    /// Delete the cluster
    Delete {
        /// Delete even if some nodes are unreachable
        #[arg(long)]
        force: bool,
    },

    /// Add nodes to the cluster
    AddNodes {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Remove nodes from the cluster
    RemoveNodes {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Add and remove nodes in one operation
    ReplaceNodes {
        #[arg(long = "add")]
        add: Vec<String>,

        #[arg(long = "remove")]
        remove: Vec<String>,
    },
}

#[derive(clap::Args)]
struct ClusterProperties {
    #[arg(long)]
    election_min_timeout: Option<u64>,
    #[arg(long)]
    election_range_timeout: Option<u64>,
    #[arg(long)]
    heartbeat_interval: Option<u64>,
    #[arg(long)]
    message_size_kb: Option<u64>,
    #[arg(long)]
    verification_timeout: Option<u64>,
    #[arg(long)]
    transaction_log_maximum_size_gb: Option<f64>,
}

impl ClusterProperties {
    fn patch(&self) -> ClusterConfigPatch {
        ClusterConfigPatch {
            election_min_timeout: self.election_min_timeout,
            election_range_timeout: self.election_range_timeout,
            heartbeat_interval: self.heartbeat_interval,
            message_size_kb: self.message_size_kb,
            verification_timeout: self.verification_timeout,
            transaction_log_maximum_size_gb: self.transaction_log_maximum_size_gb,
        }
    }

    fn config(&self, nodes: Vec<String>) -> ClusterConfig {
        let defaults = ClusterConfig::with_nodes(nodes);
        ClusterConfig {
            election_min_timeout: self.election_min_timeout.unwrap_or(defaults.election_min_timeout),
            election_range_timeout: self
                .election_range_timeout
                .unwrap_or(defaults.election_range_timeout),
            heartbeat_interval: self.heartbeat_interval.unwrap_or(defaults.heartbeat_interval),
            message_size_kb: self.message_size_kb.unwrap_or(defaults.message_size_kb),
            verification_timeout: self.verification_timeout.unwrap_or(defaults.verification_timeout),
            transaction_log_maximum_size_gb: self
                .transaction_log_maximum_size_gb
                .unwrap_or(defaults.transaction_log_maximum_size_gb),
            nodes: defaults.nodes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = MonitorSettings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(url) = &cli.url {
        settings.base_url = url.clone();
    }
    if let Some(authorization) = &cli.authorization {
        settings.authorization = Some(SecretString::from(authorization.clone()));
    }
    if let Commands::Watch {
        interval_ms: Some(interval_ms),
    } = &cli.command
    {
        settings.poll_interval_ms = *interval_ms;
    }
    settings.validate().context("invalid settings")?;

    let client = Arc::new(HttpClusterClient::new(&settings)?);
    let format = cli.output;

    match cli.command {
        Commands::Status => status(client, format).await,
        Commands::Watch { .. } => watch(client, &settings).await,
        Commands::Config => {
            let config = client
                .fetch_cluster_config()
                .await
                .map_err(|e| report_error("fetch configuration", e))?;
            render::print_config(&config, format)
        }
        Commands::Create { nodes, properties } => {
            let actions = ClusterActions::new(client);
            let created = actions
                .create_cluster(&properties.config(nodes))
                .await
                .map_err(|e| report_error("create cluster", e))?;
            println!("{} cluster created", "✓".green());
            render::print_config(&created, format)
        }
        Commands::Edit { properties } => {
            let actions = ClusterActions::new(client);
            let updated = actions
                .edit_cluster(&properties.patch())
                .await
                .map_err(|e| report_error("edit cluster", e))?;
            render::print_config(&updated, format)
        }
        Commands::Delete { force } => {
            let report = ClusterActions::new(client)
                .delete_cluster(force)
                .await
                .map_err(|e| report_error("delete cluster", e))?;
            finish_mutation("delete cluster", &report, format)
        }
        Commands::AddNodes { nodes } => {
            let report = ClusterActions::new(client)
                .add_nodes(&nodes)
                .await
                .map_err(|e| report_error("add nodes", e))?;
            finish_mutation("add nodes", &report, format)
        }
        Commands::RemoveNodes { nodes } => {
            let report = ClusterActions::new(client)
                .remove_nodes(&nodes)
                .await
                .map_err(|e| report_error("remove nodes", e))?;
            finish_mutation("remove nodes", &report, format)
        }
        Commands::ReplaceNodes { add, remove } => {
            let report = ClusterActions::new(client)
                .replace_nodes(&add, &remove)
                .await
                .map_err(|e| report_error("replace nodes", e))?;
            finish_mutation("replace nodes", &report, format)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "clustermon=debug,clustermon_client=debug,clustermon_monitor=debug"
    } else {
        "clustermon=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn status(client: Arc<HttpClusterClient>, format: OutputFormat) -> Result<()> {
    let reconciler = Reconciler::new(client);
    if let Some(report) = reconciler.load_initial().await.report() {
        render::print_refresh_errors(report);
    }
    render::print_snapshot(&reconciler.snapshot(), format)
}

async fn watch(client: Arc<HttpClusterClient>, settings: &MonitorSettings) -> Result<()> {
    let reconciler = Arc::new(Reconciler::with_redraw(
        Arc::clone(&client),
        |snapshot: &ClusterSnapshot| println!("{}", render::summary_line(snapshot)),
    ));
    let handle = Poller::new(reconciler, settings).with_admin(client).spawn();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    handle.shutdown().await;
    Ok(())
}

fn finish_mutation(operation: &str, report: &MutationReport, format: OutputFormat) -> Result<()> {
    render::print_mutation(operation, report, format)?;
    if !report.is_success() {
        bail!("{operation} partially failed");
    }
    Ok(())
}

fn report_error(operation: &str, error: clustermon_core::ClusterError) -> anyhow::Error {
    render::print_error(operation, &error);
    anyhow::Error::new(error).context(format!("{operation} failed"))
}
