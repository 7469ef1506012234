// src/bin/tcptee.rs
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use tcptee::config::{self, RelayConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tcptee",
    about = "TCP relay that mirrors both traffic directions to shadow destinations",
    version
)]
struct Cli {
    /// Listen on host:port for incoming traffic to be duplicated
    #[arg(short, long, env = "TCPTEE_LISTEN", default_value = "localhost:8080")]
    listen: String,

    /// Relay traffic to the primary host:port over a two-way TCP connection
    #[arg(short, long, env = "TCPTEE_PRIMARY", default_value = "localhost:9090")]
    primary: String,

    /// Mirror incoming traffic to host:port[,host:port]...
    /// Eg. localhost:9091,localhost:9092
    #[arg(short, long, env = "TCPTEE_MIRROR", default_value = "")]
    mirror: String,

    /// Mirror outgoing traffic to host:port[,host:port]...
    /// Eg. localhost:9100,localhost:9101
    #[arg(short = 'r', long, env = "TCPTEE_MIRROR_RESP", default_value = "")]
    mirror_resp: String,

    /// Also copy both traffic directions to stdout
    #[arg(short, long)]
    debug: bool,

    /// Give up on any outbound dial after this many seconds
    #[arg(long, env = "TCPTEE_DIAL_TIMEOUT_SECS", default_value_t = 10)]
    dial_timeout_secs: u64,

    /// Cap on concurrently active sessions; accepts past it are dropped
    #[arg(long, env = "TCPTEE_MAX_SESSIONS", default_value_t = 1024)]
    max_sessions: usize,
}

fn banner(cfg: &RelayConfig) {
    println!(
        "{} {}",
        Paint::green("tcptee").bold(),
        Paint::white("— TCP traffic mirroring relay").dimmed()
    );
    println!("Listening on                    {}", cfg.listen_addr);
    println!("Connecting in primary mode to   {}", cfg.primary_addr);
    println!("Duplicating incoming traffic to {}", format_list(&cfg.mirror_addrs));
    println!("Duplicating outgoing traffic to {}", format_list(&cfg.mirror_resp_addrs));
}

fn format_list(addrs: &[String]) -> String {
    if addrs.is_empty() {
        "(none)".into()
    } else {
        addrs.join(",")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load .env for local development (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = RelayConfig {
        listen_addr: cli.listen,
        primary_addr: cli.primary,
        mirror_addrs: config::split_addr_list(&cli.mirror),
        mirror_resp_addrs: config::split_addr_list(&cli.mirror_resp),
        debug: cli.debug,
        dial_timeout: Duration::from_secs(cli.dial_timeout_secs),
        max_sessions: cli.max_sessions,
    };

    let validation = config::validate(&cfg);
    validation.print_summary();
    if !validation.valid {
        anyhow::bail!("invalid configuration");
    }

    banner(&cfg);
    tcptee::run(cfg).await
}
