pub mod config;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod pump;
pub mod server;
pub mod session;

pub use config::RelayConfig;
pub use error::RelayError;
pub use server::Relay;

/// Bind the listener and run the relay until it is shut down.
pub async fn run(cfg: RelayConfig) -> anyhow::Result<()> {
    let relay = Relay::bind(cfg).await?;
    relay.run().await
}
