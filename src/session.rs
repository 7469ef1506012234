// src/session.rs
// One accepted connection: dial the primary and the mirrors, run two pumps.
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::fanout::FanoutSink;
use crate::metrics::{BYTES_IN, BYTES_OUT, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::pump::pump;

async fn dial(addr: &str, limit: Duration) -> Result<TcpStream, RelayError> {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(RelayError::Dial {
            addr: addr.to_string(),
            source: e,
        }),
        Err(_) => Err(RelayError::DialTimeout {
            addr: addr.to_string(),
        }),
    }
}

/// Dial every address in `addrs` in order and push the write halves as
/// mirror members. An unreachable mirror is logged and skipped; it never
/// aborts the session.
async fn dial_mirrors(
    sink: &mut FanoutSink,
    addrs: &[String],
    limit: Duration,
    peer: SocketAddr,
) {
    for addr in addrs {
        match dial(addr, limit).await {
            Ok(stream) => {
                // mirrors are write-only; their responses are never read
                let (_, write_half) = stream.into_split();
                sink.push_mirror(addr, write_half);
            }
            Err(e) => {
                warn!(client = %peer, "skipping unreachable mirror: {}", e);
            }
        }
    }
}

/// Serve one accepted client connection until both traffic directions have
/// terminated. A primary dial failure aborts only this session; the caller's
/// listener loop keeps accepting.
pub async fn run(
    client: TcpStream,
    peer: SocketAddr,
    cfg: Arc<RelayConfig>,
    shutdown: broadcast::Sender<()>,
) -> Result<(), RelayError> {
    let primary = dial(&cfg.primary_addr, cfg.dial_timeout).await?;

    let (client_read, client_write) = client.into_split();
    let (primary_read, primary_write) = primary.into_split();

    // inbound direction: client -> mirrors + primary
    let mut inbound = FanoutSink::new();
    dial_mirrors(&mut inbound, &cfg.mirror_addrs, cfg.dial_timeout, peer).await;
    inbound.push_required(&cfg.primary_addr, primary_write);
    if cfg.debug {
        inbound.push_mirror("stdout", tokio::io::stdout());
    }

    // outbound direction: primary -> mirrors + client (this returns the
    // primary's responses to the client, making the relay two-way)
    let mut outbound = FanoutSink::new();
    dial_mirrors(&mut outbound, &cfg.mirror_resp_addrs, cfg.dial_timeout, peer).await;
    outbound.push_required("client", client_write);
    if cfg.debug {
        outbound.push_mirror("stdout", tokio::io::stdout());
    }

    SESSIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
    SESSIONS_ACTIVE.fetch_add(1, Ordering::Relaxed);

    let inbound_task = tokio::spawn(pump(client_read, inbound, "inbound", shutdown.subscribe()));
    let outbound_task = tokio::spawn(pump(primary_read, outbound, "outbound", shutdown.subscribe()));

    // Track both pumps; every half is dropped (and so closed) once both are
    // done, so an asymmetric failure cannot leak the dialed sockets.
    let (bytes_in, bytes_out) = tokio::join!(inbound_task, outbound_task);
    let bytes_in = bytes_in.unwrap_or(0);
    let bytes_out = bytes_out.unwrap_or(0);

    SESSIONS_ACTIVE.fetch_sub(1, Ordering::Relaxed);
    BYTES_IN.fetch_add(bytes_in, Ordering::Relaxed);
    BYTES_OUT.fetch_add(bytes_out, Ordering::Relaxed);
    info!(client = %peer, bytes_in, bytes_out, "session closed");

    Ok(())
}
