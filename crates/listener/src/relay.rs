//! The relay transport: a ZeroMQ SUB socket delivering one zlib-compressed
//! JSON document per frame.
//!
//! The subscriber moves through INIT, CONNECTED, then alternates RECEIVING
//! and IDLE as frames arrive or the poll deadline lapses; a shutdown signal
//! takes it through DRAINING to CLOSED. Timeouts are a normal condition, and
//! the transport reconnects transparently, so every non-terminal state loops.

use anyhow::Context;
use std::io::Read;
use std::time::Duration;
use zeromq::{Socket, SocketRecv};

/// Relay settings, taken from the `RP_EDDN_*` environment. Both keys are
/// mandatory.
#[derive(Debug, clap::Args)]
pub struct RelayArgs {
    /// ZeroMQ address of the EDDN relay, e.g. tcp://eddn.edcd.io:9500
    #[clap(long = "relay", env = "RP_EDDN_RELAY")]
    pub relay: String,

    /// Receive timeout in milliseconds. Polls are additionally capped at one
    /// second so the shutdown flag is observed promptly between frames.
    #[clap(long = "relay-timeout", env = "RP_EDDN_RELAY_TIMEOUT")]
    pub relay_timeout_ms: u64,
}

/// Outcome of one poll of the subscriber.
#[derive(Debug)]
pub enum Frame {
    /// A raw (still compressed) frame payload.
    Payload(Vec<u8>),
    /// The poll deadline lapsed with nothing to read.
    Idle,
}

pub struct Subscriber {
    socket: zeromq::SubSocket,
    poll_deadline: Duration,
}

impl Subscriber {
    /// Connects to the relay and subscribes to the full feed. Connecting is
    /// done once; reconnection afterwards is the transport's business.
    pub async fn connect(args: &RelayArgs) -> anyhow::Result<Self> {
        let mut socket = zeromq::SubSocket::new();
        socket
            .connect(&args.relay)
            .await
            .with_context(|| format!("connecting to relay {}", args.relay))?;
        socket
            .subscribe("")
            .await
            .context("subscribing to relay feed")?;
        tracing::info!(relay = %args.relay, "connected to EDDN relay");

        Ok(Subscriber {
            socket,
            poll_deadline: Duration::from_millis(args.relay_timeout_ms.min(1_000)),
        })
    }

    /// Waits up to the poll deadline for the next frame.
    pub async fn poll(&mut self) -> Result<Frame, zeromq::ZmqError> {
        match tokio::time::timeout(self.poll_deadline, self.socket.recv()).await {
            Err(_elapsed) => Ok(Frame::Idle),
            Ok(Ok(message)) => {
                let payload = message
                    .into_vec()
                    .into_iter()
                    .next()
                    .map(|frame| frame.to_vec())
                    .unwrap_or_default();
                Ok(Frame::Payload(payload))
            }
            Ok(Err(error)) => Err(error),
        }
    }

    pub async fn close(self) {
        self.socket.close().await;
    }
}

/// Inflates one zlib-compressed frame payload.
pub fn decompress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    flate2::read::ZlibDecoder::new(payload).read_to_end(&mut decoded)?;
    Ok(decoded)
}
