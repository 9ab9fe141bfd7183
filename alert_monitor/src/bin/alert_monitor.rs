use std::path::PathBuf;

use alert_monitor::{
    app::Monitor,
    config::{MonitorConfig, load_config_path},
};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use search_client::models::query::{DateRange, FilterSpec, build_query};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Alert monitor for the funding & tenders search API")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, short, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Poll alerts and refresh facets until interrupted.
    Run,
    /// Poll one alert now, ignoring its interval.
    Check {
        name: String,
    },
    /// Refresh the facet table once.
    RefreshFacets,
    /// Print every label of a facet field.
    Labels {
        field: String,
    },
    /// Print the query document for a filter description.
    BuildQuery(BuildQueryArgs),
}

#[derive(Args)]
struct BuildQueryArgs {
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    statuses: Vec<String>,
    #[arg(long)]
    programme: Option<String>,
    #[arg(long)]
    call: Option<String>,
    /// Deadline lower bound, epoch milliseconds.
    #[arg(long)]
    deadline_from: Option<i64>,
    /// Deadline upper bound, epoch milliseconds.
    #[arg(long)]
    deadline_to: Option<i64>,
    #[arg(long)]
    text: Option<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<MonitorConfig> {
    let mut config = match path {
        Some(path) => load_config_path(path)?,
        None => MonitorConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate().context("invalid configuration after environment overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    match dotenvy::dotenv() {
        Err(err) if !err.not_found() => return Err(err).context("load .env"),
        _ => {}
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Cmd::BuildQuery(args) = &cli.cmd {
        let deadline = (args.deadline_from.is_some() || args.deadline_to.is_some()).then_some(DateRange {
            gte: args.deadline_from,
            lte: args.deadline_to,
        });
        let spec = FilterSpec {
            types: args.types.clone(),
            statuses: args.statuses.clone(),
            framework_programme: args.programme.clone(),
            call_identifier: args.call.clone(),
            start_date: None,
            deadline,
            text: args.text.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&build_query(&spec))?);
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let mut monitor = Monitor::from_config(&config)?;
    if let Err(err) = monitor.resolver.reload() {
        warn!(error = %err, "facet table unreadable, labels will pass through until refreshed");
    }

    match cli.cmd {
        Cmd::Run => {
            let (stop_tx, stop_rx) = watch::channel(false);
            let stopped = |mut rx: watch::Receiver<bool>| async move {
                let _ = rx.wait_for(|stop| *stop).await;
            };

            let Monitor {
                mut scheduler,
                refresher,
                ..
            } = monitor;
            let polling = scheduler.run(stopped(stop_rx.clone()));
            let refreshing = refresher.run(stopped(stop_rx));
            let interrupt = async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("interrupt received, shutting down"),
                    Err(err) => warn!(error = %err, "cannot listen for interrupts, shutting down"),
                }
                let _ = stop_tx.send(true);
            };
            tokio::join!(polling, refreshing, interrupt);
        }
        Cmd::Check { name } => match monitor.scheduler.check_now(&name).await? {
            Some(outcome) => println!("{name}: {outcome}"),
            None => bail!("no alert named {name:?}"),
        },
        Cmd::RefreshFacets => {
            let fields = monitor.refresher.refresh_once().await?;
            println!("facet table refreshed ({fields} fields)");
        }
        Cmd::Labels { field } => {
            for label in monitor.resolver.all_labels(&field) {
                println!("{label}");
            }
        }
        Cmd::BuildQuery(_) => {}
    }

    Ok(())
}
