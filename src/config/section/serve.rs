//! `[serve]` section configuration.
//!
//! Contains server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 9090                 # HTTP port number
//! template = "index.html"     # Index template (relative to project root)
//! preload = true              # Snapshot the output directory into memory
//! workers = 4                 # Request handler threads
//! debug = true                # Mount /debug/ endpoints
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// HTML template rendered as the index. Absolute after loading.
    pub template: PathBuf,

    /// Serve from an in-memory snapshot taken at startup instead of
    /// reading the output directory on every request.
    pub preload: bool,

    /// Request handler threads.
    pub workers: usize,

    /// Mount `/debug/` endpoints.
    pub debug: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 9090,
            template: "index.html".into(),
            preload: true,
            workers: 4,
            debug: true,
        }
    }
}

impl ServeConfig {
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error_with_hint("serve.workers", "must be at least 1", "the default is 4");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\npreload = false\nworkers = 8",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.preload);
        assert_eq!(config.serve.workers, 8);
        assert_eq!(config.serve.addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 9090);
        assert_eq!(config.serve.template, PathBuf::from("index.html"));
        assert!(config.serve.preload);
        assert_eq!(config.serve.workers, 4);
        assert!(config.serve.debug);
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_serve_config_zero_workers() {
        let config = test_parse_config("[serve]\nworkers = 0");
        let mut diag = ConfigDiagnostics::new();
        config.serve.validate(&mut diag);
        assert_eq!(diag.errors()[0].field, "serve.workers");
    }
}
