//! rp-import-systems: one-shot cold-start import of a systems archive into
//! the store.
//!
//! The archive is parsed on a blocking thread, batched, and handed to the
//! async flush loop over a bounded channel; the flush loop is the only
//! database writer. SIGINT/SIGTERM finish the current batch and exit
//! cleanly.

mod records;

use anyhow::Context;
use clap::Parser;
use flate2::read::GzDecoder;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::SystemRecord;

/// Imports systems from a gzip-compressed JSON archive.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    logging: cli_common::LogArgs,

    #[clap(flatten)]
    database: cli_common::DatabaseArgs,

    /// Path to the compressed systems archive (JSON array, gzip).
    file_path: std::path::PathBuf,

    /// Report what would be written without committing anything.
    #[clap(long)]
    dry_run: bool,

    /// Stop after reviewing N records.
    #[clap(long, value_name = "N")]
    limit: Option<u64>,
}

const BATCH_SIZE: usize = 1000;
const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Debug, Default)]
struct ReviewCounts {
    reviewed: u64,
    incomplete: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli_common::init_logging(&args.logging);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            cli_common::shutdown_signal().await;
            tracing::info!("finishing current batch before exit");
            shutdown.store(true, Ordering::Relaxed);
        });
    }

    let pool = if args.dry_run {
        None
    } else {
        Some(args.database.connect("rp-import-systems").await?)
    };

    let (batch_tx, mut batch_rx) = tokio::sync::mpsc::channel::<Vec<SystemRecord>>(4);

    let reader = {
        let shutdown = shutdown.clone();
        let file_path = args.file_path.clone();
        let limit = args.limit;
        tokio::task::spawn_blocking(move || read_archive(&file_path, limit, &shutdown, batch_tx))
    };

    let mut upserted: u64 = 0;
    let mut batched: u64 = 0;
    while let Some(batch) = batch_rx.recv().await {
        batched += batch.len() as u64;
        match pool.as_ref() {
            Some(pool) => {
                let affected = store::systems::bulk_upsert_systems(pool, &batch)
                    .await
                    .context("upserting batch")?;
                upserted += affected;
                tracing::info!(records = batch.len(), affected, "flushed batch");
            }
            None => {
                upserted += batch.len() as u64;
                tracing::info!(records = batch.len(), "dry run: would upsert batch");
            }
        }
    }

    let counts = reader.await.context("joining archive reader")??;

    tracing::info!("--- import summary ---");
    tracing::info!(
        reviewed = counts.reviewed,
        batched,
        upserted,
        skipped = counts.reviewed - upserted,
        incomplete = counts.incomplete,
        dry_run = args.dry_run,
        "import finished"
    );
    Ok(())
}

/// Streams the archive, batching valid records onto `batch_tx`. Runs on a
/// blocking thread; returns the review counters.
fn read_archive(
    file_path: &std::path::Path,
    limit: Option<u64>,
    shutdown: &AtomicBool,
    batch_tx: tokio::sync::mpsc::Sender<Vec<SystemRecord>>,
) -> anyhow::Result<ReviewCounts> {
    let file = std::fs::File::open(file_path)
        .with_context(|| format!("opening {}", file_path.display()))?;
    let decoder = GzDecoder::new(std::io::BufReader::new(file));
    tracing::info!(path = %file_path.display(), "starting import");

    let mut counts = ReviewCounts::default();
    let mut batch: Vec<SystemRecord> = Vec::with_capacity(BATCH_SIZE);

    let result = records::stream_dump(decoder, |record| {
        if shutdown.load(Ordering::Relaxed) {
            return ControlFlow::Break(());
        }
        if matches!(limit, Some(limit) if counts.reviewed >= limit) {
            tracing::info!(limit, "reached record limit");
            return ControlFlow::Break(());
        }

        counts.reviewed += 1;
        if counts.reviewed % PROGRESS_INTERVAL == 0 {
            tracing::info!(reviewed = counts.reviewed, "import progress");
        }

        match records::to_system_record(record) {
            Some(record) => batch.push(record),
            None => {
                counts.incomplete += 1;
                tracing::warn!(record_number = counts.reviewed, "skipping incomplete record");
            }
        }

        if batch.len() >= BATCH_SIZE {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE));
            // A send error means the flush loop is gone; stop reading.
            if batch_tx.blocking_send(full).is_err() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });
    result.context("decoding systems archive")?;

    if !batch.is_empty() && !shutdown.load(Ordering::Relaxed) {
        let _ = batch_tx.blocking_send(batch);
    }
    Ok(counts)
}
