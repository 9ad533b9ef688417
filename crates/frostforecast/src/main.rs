mod output;
mod server;
mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use frost_core::config::Config;
use frost_core::domain::Domain;
use frost_core::filter::{KeyFilter, TimeWindow};
use frost_core::query::{RunStatus, RunTrigger, RunsRequest, UsageRequest};
use frost_core::time::{parse_duration_str, parse_time_or_relative};
use frost_engine::refresh::refresh_all;
use frost_engine::scheduler::run_scheduler;

use crate::output::{print_runs_human, print_status_human, print_usage_human};
use crate::telemetry::{init_cli_tracing, init_run_tracing};

#[derive(Parser, Debug)]
#[command(name = "frostforecast")]
#[command(about = "Incremental hourly usage rollups over account usage feeds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run scheduled refreshes and the status HTTP API")]
    Run {
        #[arg(long)]
        status_http_addr: Option<String>,
        #[arg(long, help = "Refresh cadence per domain (e.g. 4h)")]
        refresh_interval: Option<String>,
        #[arg(long)]
        lookback_days: Option<u32>,
        #[arg(long, help = "Comma-separated domain list (default: all)")]
        domains: Option<String>,
    },
    #[command(about = "Run one refresh now and exit")]
    Refresh {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        lookback_days: Option<u32>,
    },
    #[command(about = "Query hourly usage rows for a domain")]
    Usage {
        domain: String,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long, help = "Case-insensitive glob on the domain's name column")]
        key: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    #[command(about = "List recent refresh runs")]
    Runs {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            status_http_addr,
            refresh_interval,
            lookback_days,
            domains,
        } => {
            run_service(
                cli.db_path,
                status_http_addr,
                refresh_interval,
                lookback_days,
                domains,
            )
            .await
        }
        Commands::Refresh {
            domain,
            lookback_days,
        } => {
            init_cli_tracing();
            let cfg = load_config(cli.db_path)?;
            let store = frost_store::Store::open(&cfg.db_path)?;
            let targets = match domain {
                Some(raw) => vec![raw.parse::<Domain>()?],
                None => cfg.domains.clone(),
            };
            let records = refresh_all(
                &store,
                &targets,
                RunTrigger::Manual,
                lookback_days.unwrap_or(cfg.lookback_days),
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_runs_human(&records);
            }
            let failed = records
                .iter()
                .filter(|r| r.status == RunStatus::Failed)
                .count();
            if failed > 0 {
                anyhow::bail!("{failed} refresh run(s) failed");
            }
            Ok(())
        }
        Commands::Usage {
            domain,
            since,
            until,
            key,
            limit,
        } => {
            init_cli_tracing();
            let cfg = load_config(cli.db_path)?;
            let store = frost_store::Store::open(&cfg.db_path)?;
            let req = UsageRequest {
                domain: domain.parse()?,
                window: parse_window(since, until)?,
                key: key.as_deref().map(KeyFilter::parse).transpose()?,
                limit,
            };
            let resp = store.usage_rows(&req)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_usage_human(&resp);
            }
            Ok(())
        }
        Commands::Runs { domain, limit } => {
            init_cli_tracing();
            let cfg = load_config(cli.db_path)?;
            let store = frost_store::Store::open(&cfg.db_path)?;
            let req = RunsRequest {
                domain: domain.map(|raw| raw.parse::<Domain>()).transpose()?,
                limit,
            };
            let runs = store.recent_runs(&req)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else {
                print_runs_human(&runs);
            }
            Ok(())
        }
        Commands::Status => {
            init_cli_tracing();
            let cfg = load_config(cli.db_path)?;
            let store = frost_store::Store::open(&cfg.db_path)?;
            let status = store.status()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status_human(&status);
            }
            Ok(())
        }
    }
}

async fn run_service(
    db_path: Option<PathBuf>,
    status_http_addr: Option<String>,
    refresh_interval: Option<String>,
    lookback_days: Option<u32>,
    domains: Option<String>,
) -> anyhow::Result<()> {
    init_run_tracing();

    let mut cfg = load_config(db_path)?;
    if let Some(v) = status_http_addr {
        cfg.status_http_addr = v;
    }
    if let Some(v) = refresh_interval {
        cfg.refresh_interval = parse_duration_str(&v)?;
    }
    if let Some(v) = lookback_days {
        cfg.lookback_days = v;
    }
    if let Some(v) = domains {
        cfg.domains = frost_core::config::parse_domains(&v)?;
    }

    let store = frost_store::Store::open(&cfg.db_path)?;

    eprintln!("frostforecast run");
    eprintln!("  db: {}", cfg.db_path.display());
    eprintln!("  status http: {}", cfg.status_http_addr);
    eprintln!(
        "  refresh every: {}",
        humantime::format_duration(cfg.refresh_interval)
    );
    eprintln!("  lookback days: {}", cfg.lookback_days);
    eprintln!(
        "  domains: {}",
        cfg.domains
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );

    let http_addr = cfg.status_http_addr.parse()?;
    let scheduler_task = tokio::spawn(run_scheduler(store.clone(), cfg.clone()));
    let http_task = tokio::spawn(server::run_status_server(
        store.clone(),
        http_addr,
        cfg.lookback_days,
    ));

    tokio::select! {
        res = scheduler_task => {
            res?;
        }
        res = http_task => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}

fn load_config(db_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut cfg = Config::load().context("load config")?;
    if let Some(v) = db_path {
        cfg.db_path = v;
    }
    Ok(cfg)
}

fn parse_window(since: Option<String>, until: Option<String>) -> anyhow::Result<TimeWindow> {
    let since = since.map(|v| parse_time_or_relative(&v)).transpose()?;
    let until = until.map(|v| parse_time_or_relative(&v)).transpose()?;
    Ok(TimeWindow { since, until })
}
