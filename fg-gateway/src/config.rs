use std::{env, net::SocketAddr, time::Duration};

use url::Url;

use crate::{
    address::{AddressError, UnitAddressResolver},
    model::Credential,
};

pub const ENV_LISTEN_ADDR: &str = "GATEWAY_ADDR";
pub const ENV_UPSTREAM_URL: &str = "FLEET_COMMAND_URL";
pub const ENV_API_KEY: &str = "FLEET_COMMAND_API_KEY";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FLEET_COMMAND_TIMEOUT_MS";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:9000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address '{0}'")]
    InvalidListenAddr(String),
    #[error(transparent)]
    InvalidUpstream(#[from] AddressError),
    #[error("invalid request timeout '{0}': expected milliseconds")]
    InvalidTimeout(String),
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub upstream: UnitAddressResolver,
    /// `None` makes every stream operation fail closed.
    pub api_key: Option<Credential>,
    pub request_timeout_ms: u64,
}

impl GatewayConfig {
    pub fn new(upstream: UnitAddressResolver) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            upstream,
            api_key: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn for_upstream(url: Url) -> Result<Self, ConfigError> {
        Ok(Self::new(UnitAddressResolver::new(url)?))
    }

    pub fn with_api_key(mut self, token: Option<&str>) -> Self {
        self.api_key = token.and_then(Credential::new);
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = sanitize_timeout(timeout_ms);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from a key lookup, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_raw = lookup(ENV_LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = parse_listen_addr(&listen_raw)?;

        let upstream_raw =
            lookup(ENV_UPSTREAM_URL).unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream = UnitAddressResolver::parse(&upstream_raw)?;

        let request_timeout_ms = match lookup(ENV_REQUEST_TIMEOUT_MS) {
            Some(raw) => parse_timeout_ms(&raw)?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        Ok(Self {
            listen_addr,
            upstream,
            api_key: lookup(ENV_API_KEY).as_deref().and_then(Credential::new),
            request_timeout_ms,
        })
    }
}

pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidListenAddr(raw.to_string()))
}

pub fn parse_timeout_ms(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(sanitize_timeout)
        .map_err(|_| ConfigError::InvalidTimeout(raw.to_string()))
}

fn sanitize_timeout(value: u64) -> u64 {
    value.clamp(MIN_REQUEST_TIMEOUT_MS, MAX_REQUEST_TIMEOUT_MS)
}
