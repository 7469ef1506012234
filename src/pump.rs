// src/pump.rs
// Stream pump: copies one direction of traffic into a fan-out sink.
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::fanout::FanoutSink;

const COPY_BUF_SIZE: usize = 16 * 1024;

/// Copy bytes from `source` into `sink` until the source reaches EOF, a read
/// or required-member write error occurs, or the shutdown broadcast fires.
/// Failures are terminal for this pump only; nothing is retried. Returns the
/// number of bytes copied.
pub async fn pump<R>(
    mut source: R,
    mut sink: FanoutSink,
    direction: &'static str,
    mut shutdown: broadcast::Receiver<()>,
) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total: u64 = 0;
    loop {
        tokio::select! {
            read_res = source.read(&mut buf) => {
                match read_res {
                    Ok(0) => {
                        // clean EOF: half-close every sink so peers see it too
                        sink.shutdown().await;
                        break;
                    }
                    Ok(n) => {
                        if let Err(e) = sink.write_all(&buf[..n]).await {
                            warn!("{} pump write failed after {} bytes: {}", direction, total, e);
                            break;
                        }
                        total += n as u64;
                    }
                    Err(e) => {
                        warn!("{} pump read failed after {} bytes: {}", direction, total, e);
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                debug!("{} pump stopping on shutdown signal", direction);
                sink.shutdown().await;
                break;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn copies_until_source_eof_and_propagates_it() {
        let (mut src_tx, src_rx) = duplex(256);
        let (member, mut member_peer) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_required("primary", member);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(pump(src_rx, sink, "inbound", shutdown_tx.subscribe()));

        src_tx.write_all(b"hello").await.expect("feed source");
        drop(src_tx); // EOF

        let total = handle.await.expect("pump task");
        assert_eq!(total, 5);

        let mut got = Vec::new();
        member_peer.read_to_end(&mut got).await.expect("member read");
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn stops_when_required_sink_dies() {
        let (mut src_tx, src_rx) = duplex(256);
        let (member, member_peer) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_required("primary", member);
        drop(member_peer);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(pump(src_rx, sink, "inbound", shutdown_tx.subscribe()));

        src_tx.write_all(b"doomed").await.expect("feed source");
        let total = handle.await.expect("pump task");
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let (_src_tx, src_rx) = duplex(256);
        let (member, mut member_peer) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_required("primary", member);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(pump(src_rx, sink, "inbound", shutdown_tx.subscribe()));

        shutdown_tx.send(()).expect("signal");
        let total = handle.await.expect("pump task");
        assert_eq!(total, 0);

        // sink was half-closed on the way out
        let mut got = Vec::new();
        member_peer.read_to_end(&mut got).await.expect("member read");
        assert!(got.is_empty());
    }
}
