//! `dh-client`: command-line access to the Health Service.
//!
//! ```text
//! dh-client [--config FILE] [--server HOST:PORT] <command>
//!
//!   report <subject> <name:status:score>...   submit one report directly
//!   inform <subject> <name:status:score>...   go through the rate-limited pipeline
//!   get <subject>                             print the latest report as JSON
//!   observe | stop-observing <subject>
//!   ping
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use dh_client::client::{HealthClient, HealthService, HttpHealthService};
use dh_client::clock::{Clock, SystemClock};
use dh_client::config::{load_config, ClientConfig};
use dh_client::observability::{logging, metrics};
use dh_client::types::Metric;
use dh_client::Reporter;

#[derive(Parser)]
#[command(name = "dh-client")]
#[command(about = "Report subject health to the Health Service", long_about = None)]
struct Cli {
    /// Properties or TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Health Service address, overriding the configuration.
    #[arg(short, long)]
    server: Option<String>,

    /// Module name to register under.
    #[arg(short, long, default_value = "dh-client")]
    module: String,

    /// Observer id; the local hostname when omitted.
    #[arg(short, long)]
    observer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a report and print the service's verdict
    Report {
        subject: String,
        #[arg(required = true)]
        metrics: Vec<Metric>,
    },
    /// Queue samples through the rate limiter, then shut down
    Inform {
        subject: String,
        #[arg(required = true)]
        metrics: Vec<Metric>,
        /// Treat the subject as an address to resolve.
        #[arg(long)]
        resolve: bool,
    },
    /// Print the latest report held for a subject
    Get { subject: String },
    /// Ask the service to start observing a subject
    Observe { subject: String },
    /// Ask the service to stop observing a subject
    StopObserving { subject: String },
    /// Check the service is reachable and show its clock
    Ping,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = &cli.server {
        apply_server(&mut config, server)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!(
        server = %config.server.address(),
        expire_ms = config.pending.expire_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let observer = cli
        .observer
        .clone()
        .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned());
    let service: Arc<dyn HealthService> = Arc::new(HttpHealthService::new(
        &config.server.address(),
        config.transport.request_timeout(),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Commands::Inform {
        subject,
        metrics,
        resolve,
    } = &cli.command
    {
        let reporter = Reporter::start(&config, service, clock, &cli.module, &observer).await?;
        if !reporter.client().is_ready() {
            return Err("registration with the health service failed".into());
        }
        for metric in metrics {
            reporter.inform(subject, &metric.name, metric.status, metric.score, *resolve);
        }
        if !reporter.flush(config.transport.shutdown_grace()).await {
            tracing::warn!("Timed out waiting for queued samples");
        }
        let stats = reporter.shutdown().await;
        println!("processed={} forwarded={}", stats.processed, stats.forwarded);
        return Ok(());
    }

    let client = HealthClient::new(service, clock);
    match cli.command {
        Commands::Report { subject, metrics } => {
            if !client.init(&cli.module, &observer).await {
                return Err("registration with the health service failed".into());
            }
            match client.report(&subject, metrics).await {
                Some(status) => println!("{}", status),
                None => return Err("report was not delivered".into()),
            }
        }
        Commands::Get { subject } => match client.get_report(&subject).await {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => eprintln!("No report for {}", subject),
        },
        Commands::Observe { subject } => println!("{}", client.observe(&subject).await),
        Commands::StopObserving { subject } => println!("{}", client.stop_observing(&subject).await),
        Commands::Ping => match client.ping().await {
            Some(time) => println!("{}", time),
            None => return Err("ping failed".into()),
        },
        Commands::Inform { .. } => {}
    }
    client.shutdown(Duration::from_millis(0)).await;

    Ok(())
}

/// Apply `--server host[:port]`.
fn apply_server(config: &mut ClientConfig, server: &str) -> Result<(), Box<dyn std::error::Error>> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            config.server.host = Some(host.to_string());
            config.server.port = port
                .parse()
                .map_err(|_| format!("invalid port in --server '{}'", server))?;
        }
        None => config.server.host = Some(server.to_string()),
    }
    Ok(())
}
