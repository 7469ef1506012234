// src/config.rs
// Relay configuration and startup validation
use std::time::Duration;
use tracing::{error, info, warn};

/// Immutable relay configuration, built once at startup and shared by Arc.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the listener binds for incoming client connections.
    pub listen_addr: String,
    /// The single upstream that gets the real two-way relay.
    pub primary_addr: String,
    /// Recipients of a copy of client->primary traffic, in dial order.
    pub mirror_addrs: Vec<String>,
    /// Recipients of a copy of primary->client traffic, in dial order.
    pub mirror_resp_addrs: Vec<String>,
    /// When set, both traffic directions are additionally copied to stdout.
    pub debug: bool,
    /// Upper bound on every outbound dial (primary and mirrors).
    pub dial_timeout: Duration,
    /// Cap on concurrently active sessions; accepts past it are dropped.
    pub max_sessions: usize,
}

/// Split a comma-separated `host:port[,host:port]...` value into an ordered
/// list. Order is preserved (it is dial order); blanks are dropped, so an
/// empty value means "no mirrors".
pub fn split_addr_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string())
        .collect()
}

/// Validation result for configuration checks
pub struct ConfigValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    fn new() -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.valid = false;
    }

    pub fn print_summary(&self) {
        if !self.warnings.is_empty() {
            warn!("Configuration warnings:");
            for w in &self.warnings {
                warn!("   - {}", w);
            }
        }

        if !self.errors.is_empty() {
            error!("Configuration errors:");
            for e in &self.errors {
                error!("   - {}", e);
            }
        }

        if self.valid && self.warnings.is_empty() {
            info!("Configuration validation passed");
        }
    }
}

/// Validate all critical configuration at startup.
pub fn validate(cfg: &RelayConfig) -> ConfigValidation {
    let mut validation = ConfigValidation::new();

    validate_addr("listen address", &cfg.listen_addr, &mut validation);
    validate_addr("primary address", &cfg.primary_addr, &mut validation);
    for addr in &cfg.mirror_addrs {
        validate_addr("mirror address", addr, &mut validation);
    }
    for addr in &cfg.mirror_resp_addrs {
        validate_addr("outgoing mirror address", addr, &mut validation);
    }

    if cfg.mirror_addrs.is_empty() && cfg.mirror_resp_addrs.is_empty() {
        validation.add_warning(
            "no mirror addresses configured - relay will run as a plain two-way proxy".into(),
        );
    }

    if cfg.debug {
        validation.add_warning(
            "debug enabled - relayed payload bytes will be copied to stdout".into(),
        );
    }

    if cfg.dial_timeout.is_zero() {
        validation.add_error("dial timeout must be greater than zero".into());
    }

    if cfg.max_sessions == 0 {
        validation.add_error("max sessions must be greater than zero".into());
    }

    validation
}

/// Mirrors may be hostnames, so this checks `host:port` shape rather than
/// requiring a literal socket address.
fn validate_addr(what: &str, addr: &str, validation: &mut ConfigValidation) {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            if port.parse::<u16>().is_err() {
                validation.add_error(format!(
                    "{} '{}' has an invalid port (expected host:port)",
                    what, addr
                ));
            }
        }
        _ => {
            validation.add_error(format!(
                "{} '{}' has invalid format (expected host:port)",
                what, addr
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RelayConfig {
        RelayConfig {
            listen_addr: "127.0.0.1:8080".into(),
            primary_addr: "127.0.0.1:9090".into(),
            mirror_addrs: vec![],
            mirror_resp_addrs: vec![],
            debug: false,
            dial_timeout: Duration::from_secs(10),
            max_sessions: 64,
        }
    }

    #[test]
    fn split_addr_list_preserves_order_and_trims() {
        let got = split_addr_list("localhost:9091, localhost:9092 ,localhost:9093");
        assert_eq!(
            got,
            vec!["localhost:9091", "localhost:9092", "localhost:9093"]
        );
    }

    #[test]
    fn split_addr_list_empty_means_no_mirrors() {
        assert!(split_addr_list("").is_empty());
        assert!(split_addr_list(" , ,").is_empty());
    }

    #[test]
    fn validate_accepts_hostnames() {
        let mut cfg = base_config();
        cfg.mirror_addrs = vec!["shadow.internal:9091".into()];
        let v = validate(&cfg);
        assert!(v.valid, "errors: {:?}", v.errors);
    }

    #[test]
    fn validate_rejects_missing_port() {
        let mut cfg = base_config();
        cfg.primary_addr = "localhost".into();
        let v = validate(&cfg);
        assert!(!v.valid);
        assert!(v.errors.iter().any(|e| e.contains("primary address")));
    }

    #[test]
    fn validate_rejects_bad_port() {
        let mut cfg = base_config();
        cfg.mirror_addrs = vec!["localhost:notaport".into()];
        let v = validate(&cfg);
        assert!(!v.valid);
    }

    #[test]
    fn validate_warns_on_plain_proxy_mode() {
        let cfg = base_config();
        let v = validate(&cfg);
        assert!(v.valid);
        assert!(v.warnings.iter().any(|w| w.contains("plain two-way proxy")));
    }
}
