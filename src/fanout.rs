// src/fanout.rs
// Fan-out sink: presents many byte-stream write halves as one sink.
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

struct SinkMember {
    label: String,
    /// Required members (the primary upstream, the client) fail the whole
    /// fan-out call on a write error. Mirror members are evicted instead.
    required: bool,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

/// Ordered set of write halves that all receive every byte written to the
/// set. Writes go out sequentially in insertion order; there is no buffering
/// across calls.
pub struct FanoutSink {
    members: Vec<SinkMember>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn push_required<W>(&mut self, label: &str, writer: W)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.members.push(SinkMember {
            label: label.to_string(),
            required: true,
            writer: Box::new(writer),
        });
    }

    pub fn push_mirror<W>(&mut self, label: &str, writer: W)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.members.push(SinkMember {
            label: label.to_string(),
            required: false,
            writer: Box::new(writer),
        });
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Write the full buffer to every member, in order. A required member's
    /// failure fails the call; a mirror's failure evicts that mirror and the
    /// call continues, so a dead mirror can never stall the primary relay.
    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut dead: Vec<usize> = Vec::new();
        for (i, member) in self.members.iter_mut().enumerate() {
            match member.writer.write_all(buf).await {
                Ok(()) => {
                    if let Err(e) = member.writer.flush().await {
                        if member.required {
                            return Err(e);
                        }
                        warn!("mirror {} flush failed, dropping it: {}", member.label, e);
                        dead.push(i);
                    }
                }
                Err(e) => {
                    if member.required {
                        return Err(e);
                    }
                    warn!("mirror {} write failed, dropping it: {}", member.label, e);
                    dead.push(i);
                }
            }
        }
        for i in dead.into_iter().rev() {
            self.members.remove(i);
        }
        Ok(())
    }

    /// Propagate half-close to every member. Errors are ignored; a member
    /// that is already gone has nothing left to see.
    pub async fn shutdown(&mut self) {
        for member in self.members.iter_mut() {
            let _ = member.writer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn writes_reach_every_member_in_order() {
        let (a1, mut b1) = duplex(256);
        let (a2, mut b2) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_mirror("m1", a1);
        sink.push_required("primary", a2);

        sink.write_all(b"hel").await.expect("write 1");
        sink.write_all(b"lo").await.expect("write 2");
        sink.shutdown().await;

        let mut got1 = Vec::new();
        b1.read_to_end(&mut got1).await.expect("read m1");
        assert_eq!(got1, b"hello");

        let mut got2 = Vec::new();
        b2.read_to_end(&mut got2).await.expect("read primary");
        assert_eq!(got2, b"hello");
    }

    #[tokio::test]
    async fn dead_mirror_is_evicted_and_the_rest_keep_flowing() {
        let (a1, b1) = duplex(256);
        let (a2, mut b2) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_mirror("dead-mirror", a1);
        sink.push_required("primary", a2);
        drop(b1); // mirror peer goes away

        sink.write_all(b"ping").await.expect("mirror death must not fail the call");
        assert_eq!(sink.len(), 1);
        sink.write_all(b"pong").await.expect("write after eviction");
        sink.shutdown().await;

        let mut got = Vec::new();
        b2.read_to_end(&mut got).await.expect("read primary");
        assert_eq!(got, b"pingpong");
    }

    #[tokio::test]
    async fn required_member_failure_fails_the_call() {
        let (a1, b1) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_required("primary", a1);
        drop(b1);

        assert!(sink.write_all(b"ping").await.is_err());
    }

    #[tokio::test]
    async fn shutdown_propagates_eof() {
        let (a1, mut b1) = duplex(256);
        let mut sink = FanoutSink::new();
        sink.push_mirror("m1", a1);

        sink.shutdown().await;

        let mut got = Vec::new();
        b1.read_to_end(&mut got).await.expect("read after shutdown");
        assert!(got.is_empty());
    }
}
