// src/server.rs
// Listener loop: accept forever, one session task per connection.
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::metrics;
use crate::session;

pub struct Relay {
    listener: TcpListener,
    cfg: Arc<RelayConfig>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Relay {
    /// Bind the listening socket. A bind failure here is the one
    /// startup-fatal error; the caller exits nonzero on it.
    pub async fn bind(cfg: RelayConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(&cfg.listen_addr)
            .await
            .map_err(|e| RelayError::Bind {
                addr: cfg.listen_addr.clone(),
                source: e,
            })?;
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        Ok(Self {
            listener,
            cfg: Arc::new(cfg),
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops the accept loop and every running pump when fired.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Accept connections until the process is told to stop. Accept errors
    /// are logged and the loop continues; a session's failure never reaches
    /// this loop.
    pub async fn run(self) -> anyhow::Result<()> {
        {
            // Ctrl+C broadcasts shutdown to the accept loop and all pumps
            let tx = self.shutdown_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to install Ctrl+C handler: {}", e);
                    return;
                }
                info!("shutdown signal received, notifying tasks...");
                let _ = tx.send(());
            });
        }

        let admission = Arc::new(Semaphore::new(self.cfg.max_sessions));
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!("listener bound to {}", self.cfg.listen_addr);

        loop {
            tokio::select! {
                accept_res = self.listener.accept() => {
                    match accept_res {
                        Ok((stream, peer)) => {
                            info!("incoming connection from {}", peer);
                            let permit = match admission.clone().try_acquire_owned() {
                                Ok(p) => p,
                                Err(_) => {
                                    warn!(
                                        "session limit ({}) reached, dropping connection from {}",
                                        self.cfg.max_sessions, peer
                                    );
                                    continue;
                                }
                            };
                            let cfg = self.cfg.clone();
                            let shutdown = self.shutdown_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = session::run(stream, peer, cfg, shutdown).await {
                                    warn!(client = %peer, "session failed: {}", e);
                                }
                                drop(permit);
                            });
                        }
                        Err(e) => {
                            warn!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("listener shutting down");
                    break;
                }
            }
        }

        let (active, total, bytes_in, bytes_out) = metrics::snapshot();
        info!(active, total, bytes_in, bytes_out, "relay stopped");
        Ok(())
    }
}
