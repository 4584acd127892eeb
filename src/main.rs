//! CLI entry point for the disruption calendar generator.
//!
//! Fetches the service-alert feed for one or more transport modes, turns
//! planned disruptions into per-route iCalendar files and optionally uploads
//! them to S3.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use disruption_calendar::{
    config::{Config, TransportMode},
    fetch::{ALERTS_API, BasicClient, auth::ApiKey, fetch_alerts},
    gtfs_rt::FeedMessage,
    parser::parse_feed,
    pipeline::Pipeline,
    publish::{CalendarWriter, DirectoryWriter, IcsEncoder, S3Writer, publish},
    relevance::RelevanceRule,
    stats::RunStats,
    temporal::{PeriodMode, WindowPrecedence},
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "disruption_calendar")]
#[command(about = "Turns transit service alerts into per-route disruption calendars", long_about = None)]
struct Cli {
    /// JSON log file; rotated daily with the date appended
    #[arg(long, global = true, env = "LOG_FILE_PATH", default_value = "logs/disruption_calendar.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build calendars from the current alerts and write them out
    Generate {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Directory that receives one sub-directory per transport mode
        #[arg(short, long, default_value = "calendars")]
        output_dir: PathBuf,

        /// Optional: S3 bucket to upload calendars to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix for S3 uploads (e.g., "calendars/")
        #[arg(long, default_value = "")]
        s3_prefix: String,

        /// Optional: CSV run log, one row per mode per run
        #[arg(long)]
        stats_csv: Option<PathBuf>,
    },
    /// Show which alerts would be published, without writing anything
    Inspect {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
}

#[derive(Args)]
struct FeedArgs {
    /// Transport mode(s) to process
    #[arg(short, long = "mode", value_enum, default_values_t = [TransportMode::Sydneytrains])]
    modes: Vec<TransportMode>,

    /// Read the feed JSON from a file instead of the API (single mode only)
    #[arg(long, value_name = "FILE")]
    feed_file: Option<PathBuf>,

    /// Base URL of the alerts API
    #[arg(long, default_value = ALERTS_API)]
    api_url: String,
}

#[derive(Args)]
struct StrategyArgs {
    /// Rule deciding which alerts are disruptions
    #[arg(long, value_enum, default_value_t = RelevanceRule::HeaderPattern)]
    relevance: RelevanceRule,

    /// Where disruption windows are taken from
    #[arg(long, value_enum, default_value_t = WindowPrecedence::TextFirst)]
    precedence: WindowPrecedence,

    /// How multiple active periods become events
    #[arg(long, value_enum, default_value_t = PeriodMode::First)]
    periods: PeriodMode,

    /// Timezone calendar times are expressed in
    #[arg(long, default_value = "Australia/Sydney")]
    timezone: String,

    /// Language tag of the alert text to use
    #[arg(long, default_value = "en")]
    locale: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let _file_guard = init_tracing(&cli.log_file)?;

    match cli.command {
        Commands::Generate {
            feed,
            strategy,
            output_dir,
            s3_bucket,
            s3_prefix,
            stats_csv,
        } => {
            // Every feed is loaded before anything is written.
            let feeds = load_feeds(&feed, &strategy).await?;

            let mut writers: Vec<Box<dyn CalendarWriter>> =
                vec![Box::new(DirectoryWriter::new(&output_dir))];
            if let Some(bucket) = s3_bucket {
                info!(bucket = %bucket, prefix = %s3_prefix, "S3 upload enabled");
                writers.push(Box::new(S3Writer::from_env(bucket, s3_prefix).await));
            }

            for (config, message) in feeds {
                let encoder = IcsEncoder::new(config.target_timezone);
                let pipeline = build_pipeline(&config, &strategy);
                let outcome = pipeline.ingest(&message);
                let written =
                    publish(&outcome.collection, config.transport_mode, &encoder, &writers)
                        .await?;

                let stats = RunStats::from_outcome(&outcome)
                    .with_feed_info(config.transport_mode, message.header.timestamp, pipeline.today())
                    .with_calendars_written(written);
                log_run_summary(&stats);

                if let Some(path) = &stats_csv {
                    stats.append_csv(path)?;
                }
            }

            info!(output_dir = %output_dir.display(), "Finished generating calendars");
        }
        Commands::Inspect { feed, strategy } => {
            for (config, message) in load_feeds(&feed, &strategy).await? {
                let pipeline = build_pipeline(&config, &strategy);
                let outcome = pipeline.ingest(&message);

                for (route, events) in outcome.collection.iter() {
                    for event in events {
                        info!(
                            mode = %config.transport_mode,
                            %route,
                            alert_id = %event.id,
                            window = %event.window,
                            title = %event.title,
                            "Disruption"
                        );
                    }
                }

                let stats = RunStats::from_outcome(&outcome).with_feed_info(
                    config.transport_mode,
                    message.header.timestamp,
                    pipeline.today(),
                );
                log_run_summary(&stats);
            }
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON log file rotated daily.
fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    let (log_dir, log_file_name) = log_destination(log_file)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, &log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Splits the log path into the directory handed to the appender and the
/// file-name prefix it rotates under. A bare file name logs next to the
/// working directory.
fn log_destination(log_file: &Path) -> Result<(PathBuf, OsString)> {
    let Some(file_name) = log_file.file_name() else {
        bail!("log file path '{}' does not name a file", log_file.display());
    };
    let dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok((dir.to_path_buf(), file_name.to_os_string()))
}

fn log_run_summary(stats: &RunStats) {
    info!(
        mode = stats.transport_mode.as_deref().unwrap_or("<unknown>"),
        feed_timestamp = ?stats.feed_timestamp,
        entities = stats.total_entities,
        alerts = stats.alerts,
        relevant = stats.relevant,
        not_relevant = stats.skipped_not_relevant,
        no_header = stats.skipped_no_header,
        no_window = stats.skipped_no_window,
        no_routes = stats.dropped_no_routes,
        routes = stats.routes,
        events = stats.events,
        calendars = stats.calendars_written,
        "Run summary"
    );
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn config_for(mode: TransportMode, strategy: &StrategyArgs) -> Result<Config> {
    Ok(Config::new(mode)
        .with_api_key_from_env()
        .with_timezone(&strategy.timezone)?
        .with_locale(strategy.locale.clone()))
}

fn build_pipeline(config: &Config, strategy: &StrategyArgs) -> Pipeline {
    Pipeline::for_today(
        config,
        Box::new(strategy.relevance),
        strategy.precedence,
        strategy.periods,
    )
}

/// Loads one feed per requested mode, from `--feed-file` or the API.
/// Any failure aborts the whole run.
async fn load_feeds(
    args: &FeedArgs,
    strategy: &StrategyArgs,
) -> Result<Vec<(Config, FeedMessage)>> {
    let configs = args
        .modes
        .iter()
        .map(|mode| config_for(*mode, strategy))
        .collect::<Result<Vec<_>>>()?;

    if let Some(path) = &args.feed_file {
        let mut configs = configs;
        if configs.len() != 1 {
            bail!("--feed-file holds a single feed; pass exactly one --mode");
        }
        let config = configs.remove(0);
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read feed file {}", path.display()))?;
        info!(path = %path.display(), mode = %config.transport_mode, "Loaded feed from file");
        return Ok(vec![(config, parse_feed(&bytes)?)]);
    }

    let Some(first) = configs.first() else {
        bail!("no transport mode selected");
    };
    let client = ApiKey::open_data(BasicClient::new()?, first.require_api_key()?)?;

    let mut feeds = Vec::with_capacity(configs.len());
    for config in configs {
        let message = fetch_alerts(&client, &args.api_url, config.transport_mode).await?;
        info!(
            mode = %config.transport_mode,
            entities = message.entity.len(),
            "Fetched alerts"
        );
        feeds.push((config, message));
    }
    Ok(feeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_destination_splits_dir_and_prefix() {
        let (dir, name) = log_destination(Path::new("/var/log/calendars/run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/calendars"));
        assert_eq!(name, OsString::from("run.log"));
    }

    #[test]
    fn test_bare_log_file_name_uses_working_directory() {
        let (dir, name) = log_destination(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, OsString::from("run.log"));
    }

    #[test]
    fn test_log_path_without_file_name_is_rejected() {
        assert!(log_destination(Path::new("/")).is_err());
        assert!(log_destination(Path::new("logs/..")).is_err());
    }

    #[test]
    fn test_cli_parses_generate_options() {
        let cli = Cli::try_parse_from([
            "disruption_calendar",
            "generate",
            "--mode",
            "metro",
            "--mode",
            "lightrail",
            "--relevance",
            "effect",
            "--periods",
            "each",
            "--log-file",
            "/tmp/dc.log",
        ])
        .unwrap();

        assert_eq!(cli.log_file, PathBuf::from("/tmp/dc.log"));
        let Commands::Generate { feed, strategy, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(feed.modes, vec![TransportMode::Metro, TransportMode::Lightrail]);
        assert_eq!(strategy.relevance, RelevanceRule::Effect);
        assert_eq!(strategy.periods, PeriodMode::Each);
        assert_eq!(strategy.precedence, WindowPrecedence::TextFirst);
    }
}
