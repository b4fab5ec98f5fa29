//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use taskdesk_core::config::CoreConfig;

const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `TASKDESK_HOST`
    pub host: IpAddr,
    /// `TASKDESK_PORT`
    pub port: u16,
    /// `TASKDESK_AUTH_DELAY_MS`, perceived latency added to login and signup
    pub auth_delay: Duration,
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            auth_delay: Duration::ZERO,
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let host = lookup("TASKDESK_HOST")
            .and_then(|raw| raw.trim().parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);
        let port = lookup("TASKDESK_PORT")
            .and_then(|raw| raw.trim().parse::<u16>().ok())
            .filter(|port| *port > 0)
            .unwrap_or(defaults.port);
        let auth_delay = lookup("TASKDESK_AUTH_DELAY_MS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.auth_delay);

        Self {
            host,
            port,
            auth_delay,
            core: CoreConfig::from_lookup(lookup),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
