//! Batch export of every system name into the newline-delimited cache the
//! autocomplete service loads at startup.

use anyhow::Context;
use clap::Parser;
use futures::TryStreamExt;
use std::io::Write;

/// Exports all system names from the store, sorted, one per line.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    logging: cli_common::LogArgs,

    #[clap(flatten)]
    database: cli_common::DatabaseArgs,

    /// Output file path.
    #[clap(long, default_value = "data/system_names.txt")]
    output: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli_common::init_logging(&args.logging);

    let pool = args.database.connect("rp-export-names").await?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    tracing::info!(output = %args.output.display(), "exporting system names");

    let mut names = store::systems::stream_system_names(&pool);
    let mut total: u64 = 0;
    while let Some(name) = names.try_next().await.context("streaming system names")? {
        writeln!(writer, "{name}")?;
        total += 1;
        if total % 10_000 == 0 {
            tracing::info!(total, "export progress");
        }
    }
    writer.flush()?;

    let bytes = std::fs::metadata(&args.output)?.len();
    tracing::info!(
        total,
        bytes,
        path = %args.output.display(),
        "export complete"
    );
    Ok(())
}
