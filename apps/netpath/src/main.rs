use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use netpath::{Config, Explorer, NerdGraphClient, Region, search_accounts};
use nrql::templates::TrendMetric;
use nrql::{Conjunction, FilterSelection, TimeWindow};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod table;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[clap(long, global = true, help = "Path to the configuration file")]
    config: Option<PathBuf>,
    #[clap(long, global = true, help = "Account id to query")]
    account: Option<i64>,
    #[clap(long, global = true, help = "User API key")]
    api_key: Option<String>,
    #[clap(long, global = true, value_enum, help = "Data center region")]
    region: Option<RegionArg>,
    #[clap(
        long,
        global = true,
        value_enum,
        default_value = "warn",
        help = "Log level (error, warn, info, debug, trace)"
    )]
    log_level: LogLevel,
    #[clap(
        long,
        global = true,
        value_parser = TimeWindow::parse_span,
        conflicts_with_all = ["begin", "end"],
        help = "Rolling window ending now, e.g. 30m, 6h or 7d"
    )]
    since: Option<TimeWindow>,
    #[clap(
        long,
        global = true,
        value_parser = TimeWindow::parse_instant,
        requires = "end",
        help = "Window start, epoch milliseconds or RFC 3339"
    )]
    begin: Option<i64>,
    #[clap(
        long,
        global = true,
        value_parser = TimeWindow::parse_instant,
        requires = "begin",
        help = "Window end, epoch milliseconds or RFC 3339"
    )]
    end: Option<i64>,
    #[clap(
        long = "filter",
        short = 'f',
        global = true,
        help = "Filter as `<key> <operator> [value]`, e.g. \"protocol IN TCP,UDP\""
    )]
    filters: Vec<FilterSelection>,
    #[clap(long, global = true, help = "Match any filter instead of all of them")]
    any: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the accounts the API key can read")]
    Accounts {
        #[clap(long, help = "Only show accounts whose name contains this")]
        search: Option<String>,
    },
    #[command(about = "Latency, jitter and loss per target")]
    Summary,
    #[command(about = "Source hosts tracing to a target")]
    Hosts { target: String },
    #[command(about = "Protocols, hosts and paths seen for a target")]
    Target { target: String },
    #[command(about = "Recent traces to a target")]
    Traces { target: String },
    #[command(about = "Hop by hop detail of one trace")]
    Hops {
        target: String,
        trace_id: String,
        #[clap(long, help = "Print the positioned hop map as JSON")]
        json: bool,
    },
    #[command(about = "Per source time series for a target")]
    Trend {
        target: String,
        #[clap(long, value_enum, default_value = "latency")]
        metric: MetricArg,
    },
    #[command(name = "filter-keys", about = "Attributes that can be filtered on")]
    FilterKeys,
    #[command(name = "filter-values", about = "Values seen for an attribute")]
    FilterValues { key: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RegionArg {
    Us,
    Eu,
}

impl From<RegionArg> for Region {
    fn from(region: RegionArg) -> Self {
        match region {
            RegionArg::Us => Region::Us,
            RegionArg::Eu => Region::Eu,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Latency,
    Jitter,
    PacketLoss,
    TotalHops,
}

impl MetricArg {
    fn metric(self) -> TrendMetric {
        match self {
            MetricArg::Latency => TrendMetric::Latency,
            MetricArg::Jitter => TrendMetric::Jitter,
            MetricArg::PacketLoss => TrendMetric::PacketLoss,
            MetricArg::TotalHops => TrendMetric::TotalHops,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            MetricArg::Latency | MetricArg::Jitter => " ms",
            MetricArg::PacketLoss => "%",
            MetricArg::TotalHops => "",
        }
    }
}

impl Cli {
    /// Flags override the environment, which overrides the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(account) = self.account {
            config.account_id = Some(account);
        }
        if let Some(region) = self.region {
            config.region = region.into();
        }
        if !self.filters.is_empty() {
            let conjunction = if self.any {
                Conjunction::Or
            } else {
                Conjunction::And
            };
            config.filters = self
                .filters
                .iter()
                .cloned()
                .map(|f| f.then(conjunction))
                .collect();
        }
    }

    fn window(&self, config: &Config) -> TimeWindow {
        match (self.begin, self.end, self.since) {
            (Some(begin), Some(end), _) => TimeWindow::Between { begin, end },
            (_, _, Some(since)) => since,
            _ => config.time_window(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(format!(
            "netpath={level},nrql={level}",
            level = cli.log_level.as_str()
        ))
    };
    let _ = tracing_subscriber::fmt::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .try_init();

    let mut config = Config::parse(cli.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok())?;
    cli.apply(&mut config);
    let window = cli.window(&config);
    info!(%window, endpoint = %config.endpoint(), "starting");

    let explorer = Explorer::new(config.client()?, window, config.filter_cache_capacity);
    if let Commands::Accounts { search } = &cli.command {
        let accounts = explorer.accounts().await;
        let found = search_accounts(&accounts, search.as_deref().unwrap_or_default());
        if found.is_empty() {
            println!("No accounts found");
        } else {
            println!("{}", table::accounts(&found));
        }
        return Ok(());
    }

    explorer.set_account(config.account()?);
    explorer.set_filters(config.filters.clone());
    run(&explorer, cli.command).await
}

async fn run(explorer: &Explorer<NerdGraphClient>, command: Commands) -> miette::Result<()> {
    match command {
        Commands::Accounts { .. } => {}
        Commands::Summary => {
            let rows = explorer.summary().await.unwrap_or_default();
            print_or_empty(rows.is_empty(), || table::summary(&rows));
        }
        Commands::Hosts { target } => {
            let hosts = explorer.source_hosts(&target).await.unwrap_or_default();
            print_or_empty(hosts.is_empty(), || table::hosts(&hosts));
        }
        Commands::Target { target } => {
            let meta = explorer.target_metadata(&target).await.flatten();
            println!("{}", table::metadata(&target, meta.as_ref()));
        }
        Commands::Traces { target } => {
            let traces = explorer.traces(&target).await.unwrap_or_default();
            print_or_empty(traces.is_empty(), || table::traces(&traces));
        }
        Commands::Hops {
            target,
            trace_id,
            json,
        } => {
            let Some(map) = explorer.hops(&target, &trace_id).await else {
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&map).into_diagnostic()?);
            } else if map.is_empty() {
                println!("No hop data found for this trace");
            } else {
                println!("{}", table::hops(&map));
                println!(
                    "center: {:.4}, {:.4}",
                    map.center.lat, map.center.lon
                );
            }
        }
        Commands::Trend { target, metric } => {
            let points = explorer
                .trend(&target, metric.metric())
                .await
                .unwrap_or_default();
            print_or_empty(points.is_empty(), || table::trend(&points, metric.unit()));
        }
        Commands::FilterKeys => {
            let keys = explorer.filter_keys().await;
            print_or_empty(keys.is_empty(), || table::filter_keys(&keys));
        }
        Commands::FilterValues { key } => {
            let values = explorer.filter_values(&key).await;
            print_or_empty(values.is_empty(), || table::filter_values(&values));
        }
    }
    Ok(())
}

fn print_or_empty(empty: bool, render: impl FnOnce() -> tabled::Table) {
    if empty {
        println!("{}", table::NO_DATA);
    } else {
        println!("{}", render());
    }
}
