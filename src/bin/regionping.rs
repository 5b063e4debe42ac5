use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use regionping::{
    directory, FileRunStore, PingerConfig, RegionPinger, RunHistory, Session, SortDirection, SortKey,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Measure HTTP latency to every region and rank them by median")]
struct Args {
    /// Number of probes sent to each region
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: u32,

    /// Per-probe timeout in milliseconds
    #[arg(short = 't', long)]
    timeout_ms: Option<u64>,

    /// Endpoint directory URL
    #[arg(long)]
    endpoints: Option<String>,

    /// Use the built-in region list instead of fetching the directory
    #[arg(long)]
    offline: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print `region,latency_ms,errors` rows
    #[arg(long, conflicts_with_all = ["top", "region"])]
    csv: bool,

    /// Print only the fastest region, never the global one
    #[arg(long, conflicts_with = "region")]
    top: bool,

    /// Probe a single region and print its median
    #[arg(short = 'r', long)]
    region: Option<String>,

    /// Field to rank by: median, latest, label or key
    #[arg(long, default_value = "median")]
    sort: SortKey,

    /// Rank in descending order
    #[arg(long)]
    desc: bool,

    /// Append the finished run to this history file
    #[arg(long)]
    history: Option<PathBuf>,

    /// List runs stored in the history file and exit
    #[arg(long, requires = "history")]
    list_runs: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "regionping=debug" } else { "regionping=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => PingerConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PingerConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        config.probe_timeout_ms = timeout_ms;
    }
    if let Some(url) = &args.endpoints {
        config.endpoints_url = url.clone();
    }

    let history = args
        .history
        .as_ref()
        .map(|path| RunHistory::new(Arc::new(FileRunStore::new(path.clone()))));

    if args.list_runs {
        if let Some(history) = &history {
            print_runs(history).await;
        }
        return Ok(());
    }

    let endpoints = if args.offline {
        directory::default_endpoints()
    } else {
        directory::fetch_endpoints(&reqwest::Client::new(), &config.endpoints_url)
            .await
            .context("could not load regions")?
    };

    let endpoints = match &args.region {
        Some(key) => {
            let selected: Vec<_> = endpoints.into_iter().filter(|e| &e.region == key).collect();
            if selected.is_empty() {
                bail!("unknown region {key}");
            }
            selected
        }
        None => endpoints,
    };

    let mut pinger = RegionPinger::new(Some(config));
    if let Some(history) = history {
        pinger = pinger.with_history(history);
    }
    pinger.load_endpoints(&endpoints)?;

    let control = pinger.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            control.request_stop();
        }
    });

    let summary = pinger.start(args.iterations).await?;
    if summary.stopped_early {
        eprintln!("stopped after {} probes", summary.probes_completed + summary.probes_failed);
    }

    let direction = if args.desc { SortDirection::Descending } else { SortDirection::Ascending };
    pinger.resort(args.sort, direction);
    let session = pinger.session();

    if let Some(key) = &args.region {
        match session.region(key).and_then(|r| r.median()) {
            Some(median) => println!("{median}ms"),
            None => bail!("no successful probes to {key}"),
        }
    } else if args.top {
        match session.fastest_region() {
            Some(region) => println!("{}", region.key),
            None => bail!("no successful probes"),
        }
    } else if args.csv {
        print_csv(session);
    } else {
        print_table(session);
    }

    Ok(())
}

fn print_table(session: &Session) {
    let width = session.regions().keys().map(str::len).max().unwrap_or(0) + 2;
    for (i, region) in session.ranked().enumerate() {
        let mut name = format!("[{}]", region.key);
        if region.key == session.global_region_key() {
            if let Some(target) = session.routing_target() {
                name = format!("[{} -> {}]", region.key, target);
            }
        }
        let median = region.median().map(|m| format!("{m}ms")).unwrap_or_else(|| "-".to_string());

        let mut line = format!("{:2}. {:<width$} {:>8}  {}", i + 1, name, median, region.label, width = width + 12);
        if region.failure_count > 0 {
            line.push_str(&format!(" ({} errors)", region.failure_count));
        }
        println!("{}", line.trim_end());
    }

    let unranked: Vec<&str> = session
        .regions()
        .iter()
        .filter(|r| r.median().is_none())
        .map(|r| r.key.as_str())
        .collect();
    if !unranked.is_empty() {
        println!("no response: {}", unranked.join(", "));
    }
}

fn print_csv(session: &Session) {
    println!("region,latency_ms,errors");
    for region in session.ranked() {
        let median = region.median().map(|m| m.to_string()).unwrap_or_default();
        println!("{},{},{}", region.key, median, region.failure_count);
    }
}

async fn print_runs(history: &RunHistory) {
    for summary in history.summaries().await {
        let started = DateTime::<Utc>::from_timestamp_millis(summary.run_id)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| summary.run_id.to_string());
        match (summary.fastest_region, summary.fastest_latency_ms) {
            (Some(region), Some(latency)) => println!("{started}  {region} ({latency} ms)"),
            _ => println!("{started}  -"),
        }
    }
}
