//! The EDDN listener daemon: a durable subscriber to the relay's compressed
//! pub/sub feed that decodes each frame, routes it by schema, and applies it
//! to the store under last-writer-wins freshness semantics.
//!
//! Frames are strictly serial: receive, decompress, decode, route, transact,
//! then the next frame. The freshness guard is enforced per row within one
//! transaction, so serialising frames removes any need for cross-frame
//! coordination.

pub mod markets;
pub mod relay;
pub mod router;
pub mod stats;
pub mod systems;

use anyhow::Context;
use futures::FutureExt;
use relay::Frame;
use stats::Stats;

/// Runs the listener loop until `exit` completes. The in-flight frame is
/// always drained before the socket closes.
pub async fn run<E>(pool: sqlx::PgPool, args: &relay::RelayArgs, exit: E) -> anyhow::Result<()>
where
    E: std::future::Future<Output = ()> + Send,
{
    let mut subscriber = relay::Subscriber::connect(args).await?;
    let mut stats = Stats::default();

    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);
    tokio::pin!(exit);

    loop {
        if (&mut exit).now_or_never().is_some() {
            tracing::info!("caught signal; draining");
            break;
        }

        // Liveness ping for the supervising init system, between every poll.
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]);

        let payload = match subscriber.poll().await {
            Ok(Frame::Idle) => continue,
            Ok(Frame::Payload(payload)) => payload,
            Err(error) => {
                // Transient transport trouble; the socket reconnects on its
                // own and the loop keeps polling.
                tracing::warn!(%error, "relay receive failed");
                continue;
            }
        };

        let envelope = match decode_frame(&payload) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(error = format!("{error:#}"), "dropping malformed frame");
                continue;
            }
        };
        stats.frame_decoded();

        match router::route(&pool, &envelope).await {
            Ok(disposition) => stats.record(disposition),
            Err(error) => {
                tracing::error!(error = format!("{error:#}"), "failed to apply frame");
                // Back off so a persistent database fault cannot hot-spin
                // the loop.
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }

        stats.maybe_report(chrono::Utc::now());
    }

    subscriber.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

fn decode_frame(payload: &[u8]) -> anyhow::Result<router::Envelope> {
    let decoded = relay::decompress(payload).context("decompressing frame")?;
    serde_json::from_slice(&decoded).context("decoding frame JSON")
}
