// src/error.rs
use std::io;
use thiserror::Error;

/// Failure taxonomy for the relay. Bind errors are startup-fatal; everything
/// else is scoped to the session that hit it.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid address '{0}': expected host:port")]
    InvalidAddress(String),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to connect to {addr}: {source}")]
    Dial { addr: String, source: io::Error },

    #[error("timed out connecting to {addr}")]
    DialTimeout { addr: String },
}
