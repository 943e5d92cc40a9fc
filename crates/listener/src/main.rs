use clap::Parser;
use futures::FutureExt;

/// rp-listener is the ingestion daemon: it subscribes to the EDDN relay and
/// keeps the spatial store current with the freshest system and market
/// observations.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    logging: cli_common::LogArgs,

    #[clap(flatten)]
    database: cli_common::DatabaseArgs,

    #[clap(flatten)]
    relay: listener::relay::RelayArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli_common::init_logging(&args.logging);
    tracing::info!(?args, "started");

    let pool = args.database.connect("rp-listener").await?;
    let shutdown = cli_common::shutdown_signal().boxed().shared();

    listener::run(pool, &args.relay, shutdown).await
}
