//! # mtrefresh CLI Entry Point
//!
//! Main binary for refreshing router mount table caches.
//!
//! ## Usage
//!
//! ```bash
//! # Refresh every router once a minute, serving the local admin endpoint
//! mtrefresh refresher -n local -n router1:8111 -n router2:8111 \
//!   --mount-table mounts.json --admin-bind 0.0.0.0:8111
//!
//! # Run a single cycle against routers listed in a file
//! mtrefresh refresh --nodes-file routers.json --timeout-ms 5000
//!
//! # Serve a mount table admin endpoint only
//! mtrefresh admin -b 0.0.0.0:8111 --mount-table mounts.json
//! ```
//!
//! ## Router Files
//!
//! `--nodes-file` points at a JSON array of router records, re-read on every
//! cycle:
//!
//! ```json
//! [{ "adminAddress": "router1:8111" }, { "adminAddress": "local" }]
//! ```

use anyhow::{bail, Result};
use argh::FromArgs;
use mtrefresh_admin::AdminServer;
use mtrefresh_client::{ClientConfig, RouterClientCache};
use mtrefresh_common::MountTable;
use mtrefresh_refresher::{
    CycleStatus, DefaultResolver, FileNodeStore, MountTableRefresher, NodeStore,
    RefreshScheduler, RefresherConfig, SchedulerConfig, StaticNodeStore, WorkerPool,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(FromArgs)]
/// mtrefresh - router mount table cache refresher
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Refresher(RefresherArgs),
    Refresh(RefreshArgs),
    Admin(AdminArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "refresher")]
/// refresh router mount table caches periodically
struct RefresherArgs {
    /// admin address of a router
    ///
    /// Can be specified multiple times. An address containing the local
    /// marker refreshes the in-process mount table instead of calling out.
    #[argh(option, short = 'n', long = "node")]
    nodes: Vec<String>,

    /// path to a JSON file listing router records, re-read every cycle
    ///
    /// Takes precedence over --node.
    #[argh(option, long = "nodes-file")]
    nodes_file: Option<String>,

    /// how long a cycle waits for all routers in milliseconds
    #[argh(option, long = "timeout-ms", default = "60000")]
    timeout_ms: u64,

    /// timeout of a single admin call in milliseconds
    #[argh(option, long = "request-timeout-ms", default = "30000")]
    request_timeout_ms: u64,

    /// number of refreshes allowed to run at once
    #[argh(option, long = "workers", default = "16")]
    workers: usize,

    /// seconds between the start of two cycles
    #[argh(option, long = "interval-secs", default = "60")]
    interval_secs: u64,

    /// substring marking an address as the local router
    #[argh(option, long = "local-marker", default = "\"local\".into()")]
    local_marker: String,

    /// path to the JSON file backing the local mount table
    #[argh(option, long = "mount-table")]
    mount_table: Option<String>,

    /// also serve the local mount table admin endpoint on this address
    #[argh(option, long = "admin-bind")]
    admin_bind: Option<String>,

    /// let refreshes still running at the deadline finish on their own
    #[argh(switch, long = "keep-stragglers")]
    keep_stragglers: bool,

    /// emit a summary of the finished routers when a cycle is interrupted
    #[argh(switch, long = "report-on-interrupt")]
    report_on_interrupt: bool,
}

// Exits non-zero when any router failed or the router file could not be read
#[derive(FromArgs)]
#[argh(subcommand, name = "refresh")]
/// run one refresh cycle and exit
struct RefreshArgs {
    /// admin address of a router
    #[argh(option, short = 'n', long = "node")]
    nodes: Vec<String>,

    /// path to a JSON file listing router records
    #[argh(option, long = "nodes-file")]
    nodes_file: Option<String>,

    /// how long to wait for all routers in milliseconds
    #[argh(option, long = "timeout-ms", default = "60000")]
    timeout_ms: u64,

    /// timeout of a single admin call in milliseconds
    #[argh(option, long = "request-timeout-ms", default = "30000")]
    request_timeout_ms: u64,

    /// number of refreshes allowed to run at once
    #[argh(option, long = "workers", default = "16")]
    workers: usize,

    /// substring marking an address as the local router
    #[argh(option, long = "local-marker", default = "\"local\".into()")]
    local_marker: String,

    /// path to the JSON file backing the local mount table
    #[argh(option, long = "mount-table")]
    mount_table: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "admin")]
/// serve a mount table admin endpoint
struct AdminArgs {
    /// address to bind the admin HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8111\".into()")]
    bind: String,

    /// path to the JSON file backing the mount table
    ///
    /// Without it the table is empty and refreshes only bump its version.
    #[argh(option, long = "mount-table")]
    mount_table: Option<String>,
}

/// Settings shared by `refresher` and `refresh`.
struct CycleOptions {
    nodes: Vec<String>,
    nodes_file: Option<String>,
    timeout_ms: u64,
    request_timeout_ms: u64,
    workers: usize,
    local_marker: String,
    cancel_stragglers: bool,
    report_on_interrupt: bool,
}

impl From<&RefresherArgs> for CycleOptions {
    fn from(args: &RefresherArgs) -> Self {
        Self {
            nodes: args.nodes.clone(),
            nodes_file: args.nodes_file.clone(),
            timeout_ms: args.timeout_ms,
            request_timeout_ms: args.request_timeout_ms,
            workers: args.workers,
            local_marker: args.local_marker.clone(),
            cancel_stragglers: !args.keep_stragglers,
            report_on_interrupt: args.report_on_interrupt,
        }
    }
}

impl From<&RefreshArgs> for CycleOptions {
    fn from(args: &RefreshArgs) -> Self {
        Self {
            nodes: args.nodes.clone(),
            nodes_file: args.nodes_file.clone(),
            timeout_ms: args.timeout_ms,
            request_timeout_ms: args.request_timeout_ms,
            workers: args.workers,
            local_marker: args.local_marker.clone(),
            cancel_stragglers: true,
            report_on_interrupt: false,
        }
    }
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", bind, e))
}

/// Loads the local mount table, reading the backing file once up front.
async fn load_mount_table(path: Option<&str>) -> Result<Arc<MountTable>> {
    match path {
        Some(path) => {
            let table = MountTable::from_file(path);
            table.reload().await?;
            tracing::info!(
                "Loaded {} mount entries from {}",
                table.entries().await.len(),
                path
            );
            Ok(Arc::new(table))
        }
        None => Ok(Arc::new(MountTable::new(vec![]))),
    }
}

fn build_refresher(
    opts: &CycleOptions,
    local_table: Arc<MountTable>,
    shutdown: &CancellationToken,
) -> Result<MountTableRefresher> {
    let store: Arc<dyn NodeStore> = match &opts.nodes_file {
        Some(path) => {
            if !opts.nodes.is_empty() {
                tracing::warn!("--node is ignored when --nodes-file is given");
            }
            tracing::info!("Reading routers from {}", path);
            Arc::new(FileNodeStore::new(path))
        }
        None => {
            if opts.nodes.is_empty() {
                tracing::warn!("No routers specified! Use --node <addr> to add routers.");
            }
            tracing::info!("Routers: {:?}", opts.nodes);
            Arc::new(StaticNodeStore::from_addresses(opts.nodes.iter().cloned()))
        }
    };

    let clients = Arc::new(RouterClientCache::new(ClientConfig {
        request_timeout: Duration::from_millis(opts.request_timeout_ms),
    }));
    let resolver = DefaultResolver::new(local_table, clients.clone())
        .with_local_marker(opts.local_marker.clone());
    let pool = Arc::new(WorkerPool::new(opts.workers)?);
    let config = RefresherConfig {
        cache_update_timeout: Duration::from_millis(opts.timeout_ms),
        cancel_stragglers: opts.cancel_stragglers,
        report_on_interrupt: opts.report_on_interrupt,
    };

    Ok(
        MountTableRefresher::with_config(store, Arc::new(resolver), clients, pool, config)
            .with_interrupt_token(shutdown.clone()),
    )
}

async fn serve_admin(
    table: Arc<MountTable>,
    bind: &str,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<mtrefresh_common::Result<()>>> {
    let addr = parse_bind(bind)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    let server = AdminServer::new(table);
    Ok(tokio::spawn(async move {
        server
            .serve(listener, async move { shutdown.cancelled().await })
            .await
    }))
}

async fn run_refresher(args: RefresherArgs, shutdown: CancellationToken) -> Result<()> {
    tracing::info!("Starting mount table refresher");
    let table = load_mount_table(args.mount_table.as_deref()).await?;
    let refresher = build_refresher(&CycleOptions::from(&args), table.clone(), &shutdown)?;

    let admin = match &args.admin_bind {
        Some(bind) => Some(serve_admin(table, bind, shutdown.clone()).await?),
        None => None,
    };

    let scheduler = RefreshScheduler::new(
        Arc::new(refresher),
        SchedulerConfig {
            interval: Duration::from_secs(args.interval_secs),
        },
    );
    scheduler.spawn(shutdown).await?;

    if let Some(admin) = admin {
        admin.await??;
    }
    Ok(())
}

async fn run_refresh(args: RefreshArgs, shutdown: CancellationToken) -> Result<()> {
    let table = load_mount_table(args.mount_table.as_deref()).await?;
    let refresher = build_refresher(&CycleOptions::from(&args), table, &shutdown)?;

    match refresher.refresh_cycle().await {
        CycleStatus::Reported(report) if report.failure_count == 0 => Ok(()),
        CycleStatus::Reported(report) => {
            let failed: Vec<String> = report
                .failed_addresses
                .iter()
                .map(|a| a.to_string())
                .collect();
            bail!(
                "{} of {} routers did not refresh: {}",
                report.failure_count,
                report.total(),
                failed.join(", ")
            )
        }
        CycleStatus::NoEligibleNodes => {
            tracing::warn!("No router has an admin address, nothing to refresh");
            Ok(())
        }
        CycleStatus::StoreUnavailable => bail!("Router records could not be read"),
        CycleStatus::Interrupted(_) => bail!("Refresh interrupted"),
    }
}

async fn run_admin(args: AdminArgs, shutdown: CancellationToken) -> Result<()> {
    tracing::info!("Starting admin server");
    let table = load_mount_table(args.mount_table.as_deref()).await?;
    serve_admin(table, &args.bind, shutdown).await?.await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Refresher(args) => run_refresher(args, shutdown).await,
        Commands::Refresh(args) => run_refresh(args, shutdown).await,
        Commands::Admin(args) => run_admin(args, shutdown).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_refresher_defaults() {
        let args = Cli::from_args(&["mtrefresh"], &["refresher", "-n", "local"]).unwrap();
        match args.command {
            Commands::Refresher(args) => {
                assert_eq!(args.nodes, vec!["local".to_string()]);
                assert_eq!(args.timeout_ms, 60000);
                assert_eq!(args.interval_secs, 60);
                assert_eq!(args.workers, 16);
                assert_eq!(args.local_marker, "local");
                assert!(args.admin_bind.is_none());
                assert!(!args.keep_stragglers);
                assert!(!args.report_on_interrupt);

                let opts = CycleOptions::from(&args);
                assert!(opts.cancel_stragglers);
            }
            _ => panic!("Expected Refresher command"),
        }
    }

    #[test]
    fn test_cli_parse_refresher_multiple_nodes_and_switches() {
        let args = Cli::from_args(
            &["mtrefresh"],
            &[
                "refresher",
                "--node",
                "router1:8111",
                "--node",
                "router2:8111",
                "--timeout-ms",
                "1000",
                "--keep-stragglers",
                "--report-on-interrupt",
                "--admin-bind",
                "127.0.0.1:8111",
            ],
        )
        .unwrap();
        match args.command {
            Commands::Refresher(args) => {
                assert_eq!(args.nodes.len(), 2);
                assert_eq!(args.timeout_ms, 1000);
                assert_eq!(args.admin_bind.as_deref(), Some("127.0.0.1:8111"));

                let opts = CycleOptions::from(&args);
                assert!(!opts.cancel_stragglers);
                assert!(opts.report_on_interrupt);
            }
            _ => panic!("Expected Refresher command"),
        }
    }

    #[test]
    fn test_cli_parse_refresh_with_nodes_file() {
        let args = Cli::from_args(
            &["mtrefresh"],
            &["refresh", "--nodes-file", "routers.json", "--local-marker", "self"],
        )
        .unwrap();
        match args.command {
            Commands::Refresh(args) => {
                assert!(args.nodes.is_empty());
                assert_eq!(args.nodes_file.as_deref(), Some("routers.json"));
                assert_eq!(args.local_marker, "self");
            }
            _ => panic!("Expected Refresh command"),
        }
    }

    #[test]
    fn test_cli_parse_admin_default_bind() {
        let args = Cli::from_args(&["mtrefresh"], &["admin"]).unwrap();
        match args.command {
            Commands::Admin(args) => {
                assert_eq!(args.bind, "0.0.0.0:8111");
                assert!(args.mount_table.is_none());
            }
            _ => panic!("Expected Admin command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        assert!(Cli::from_args(&["mtrefresh"], &["call"]).is_err());
    }

    #[test]
    fn test_parse_bind() {
        assert!(parse_bind("127.0.0.1:8111").is_ok());
        assert!(parse_bind("not-an-address").is_err());
    }

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let args = RefreshArgs {
            nodes: vec!["router1:8111".into()],
            nodes_file: None,
            timeout_ms: 1000,
            request_timeout_ms: 1000,
            workers: 0,
            local_marker: "local".into(),
            mount_table: None,
        };
        let table = Arc::new(MountTable::new(vec![]));
        let result = build_refresher(&CycleOptions::from(&args), table, &CancellationToken::new());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_mount_table_file_fails_startup() {
        assert!(load_mount_table(Some("/nonexistent/mounts.json")).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_without_routers_succeeds() {
        let args = RefreshArgs {
            nodes: vec![],
            nodes_file: None,
            timeout_ms: 1000,
            request_timeout_ms: 1000,
            workers: 1,
            local_marker: "local".into(),
            mount_table: None,
        };
        assert!(run_refresh(args, CancellationToken::new()).await.is_ok());
    }
}
