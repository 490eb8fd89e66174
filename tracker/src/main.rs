use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::Instrument;

use common::logger::{TraceId, init_logger, root_span};
use history::RetentionPolicy;
use tracker::config::TrackerConfig;
use tracker::db::Db;
use tracker::error::TrackerError;
use tracker::input::ObservationLine;
use tracker::metrics::Counters;
use tracker::model::TrackedUpdate;
use tracker::repository::HistoryRepository;
use tracker::repository_memory::InMemoryHistoryRepository;
use tracker::repository_sqlx::SqlxHistoryRepository;
use tracker::tracker::PriceTracker;

#[derive(Debug, Parser)]
#[clap(name = "tracker", version)]
/// Folds newline-delimited JSON price observations into compacted histories.
struct Cli {
    /// Read observations from this file instead of stdin
    #[clap(long)]
    input: Option<PathBuf>,

    /// Date used for lines without a `date` field (default: local today)
    #[clap(long)]
    today: Option<NaiveDate>,

    /// Database URL; histories stay in memory when unset
    #[clap(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Retention window in days; overrides RETENTION_WINDOW_DAYS
    #[clap(long)]
    retention_days: Option<i64>,

    /// Force JSON logs
    #[clap(long)]
    json_logs: bool,
}

async fn build_repository(cfg: &TrackerConfig) -> anyhow::Result<Arc<dyn HistoryRepository>> {
    match &cfg.database_url {
        Some(url) => {
            let db = Db::connect(url, cfg.db_max_connections).await?;
            db.migrate().await.context("schema migration failed")?;
            Ok(Arc::new(SqlxHistoryRepository::new(db.pool.clone())))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; histories are kept in memory only");
            Ok(Arc::new(InMemoryHistoryRepository::new()))
        }
    }
}

async fn open_input(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    Ok(match path {
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("cannot open {}", p.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

async fn process_line(
    tracker: &PriceTracker,
    line: ObservationLine,
    default_day: NaiveDate,
) -> Result<Option<TrackedUpdate>, TrackerError> {
    let today = line.date().unwrap_or(default_day);

    match line {
        ObservationLine::Offers {
            product_id, offers, ..
        } => tracker.observe_offers(&product_id, &offers, today).await,
        price_line @ ObservationLine::Price { .. } => {
            let Some(observed) = price_line.price_point() else {
                return Ok(None);
            };
            tracker
                .observe(price_line.product_id(), observed, today)
                .await
                .map(Some)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = TrackerConfig::from_env()?;
    if let Some(url) = cli.database_url.clone() {
        cfg.database_url = Some(url);
    }
    if let Some(days) = cli.retention_days {
        cfg.retention = RetentionPolicy::new(days)
            .with_context(|| format!("--retention-days must be at least 1, got {days}"))?;
    }
    cfg.json_logs |= cli.json_logs;

    init_logger("tracker", cfg.json_logs);
    tracing::info!(
        retention_days = cfg.retention.window_days,
        persistent = cfg.database_url.is_some(),
        "Starting price tracker..."
    );

    let repo = build_repository(&cfg).await?;
    let tracker = PriceTracker::new(repo, cfg.retention, Counters::default())
        .with_slow_storage_threshold(Duration::from_millis(cfg.slow_storage_ms));

    let default_day = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut lines = open_input(cli.input.as_ref()).await?.lines();
    let mut stdout = tokio::io::stdout();
    let mut line_no = 0u64;

    while let Some(raw) = lines.next_line().await? {
        line_no += 1;
        if raw.trim().is_empty() {
            continue;
        }

        let trace_id = TraceId::new(format!("line-{line_no}"));
        let span = root_span("observation", &trace_id);

        let line = match ObservationLine::parse(&raw) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line_no, error = %e, "skipping unparsable observation");
                continue;
            }
        };
        span.record("product_id", line.product_id());

        match process_line(&tracker, line, default_day).instrument(span).await {
            Ok(Some(update)) => {
                let mut out = serde_json::to_vec(&update)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
            }
            Ok(None) => {}
            Err(e) if !e.is_recoverable() => {
                tracing::error!(line_no, error = %e, "aborting on unrecoverable error");
                stdout.flush().await?;
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(line_no, error = %e, "observation skipped");
            }
        }
    }

    stdout.flush().await?;

    let counters = tracker.counters().snapshot();
    tracing::info!(?counters, "input exhausted; shutting down");

    Ok(())
}
