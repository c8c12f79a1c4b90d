//! Proxy construction options and their validated form.

use frpc_transport::{HttpVersion, ProxySettings, TransportOptions, Url};
use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::ConfigError;
use crate::selector::CodecSelection;

pub const DEFAULT_USER_AGENT: &str = "Rust Async FastRPC client";
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_MAX_CLIENTS: usize = 10;
/// Largest permit count the executor's semaphore can hold
pub const MAX_CLIENTS_LIMIT: usize = Semaphore::MAX_PERMITS;

/// Options for building a [`ServerProxy`](crate::ServerProxy).
///
/// Every field has a default, so a partial section of an application's
/// config file deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Target URL, e.g. `http://localhost:8080/RPC2`
    pub uri: String,
    /// Seconds allowed for establishing the connection
    pub connect_timeout: f64,
    /// Seconds allowed for the whole request
    pub timeout: f64,
    /// Send requests in the FastRPC binary format
    pub use_binary: bool,
    pub user_agent: Option<String>,
    pub keep_alive: bool,
    pub use_http10: bool,
    /// `http://[user:password@]host[:port]`
    pub http_proxy: Option<String>,
    /// Upper bound on requests in flight at once
    pub max_clients: usize,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        ProxyOptions {
            uri: String::new(),
            connect_timeout: DEFAULT_TIMEOUT_SECS,
            timeout: DEFAULT_TIMEOUT_SECS,
            use_binary: false,
            user_agent: None,
            keep_alive: false,
            use_http10: true,
            http_proxy: None,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl ProxyOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        ProxyOptions {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, secs: f64) -> Self {
        self.connect_timeout = secs;
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn with_binary(mut self, use_binary: bool) -> Self {
        self.use_binary = use_binary;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_http10(mut self, use_http10: bool) -> Self {
        self.use_http10 = use_http10;
        self
    }

    pub fn with_http_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.http_proxy = Some(proxy.into());
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }
}

/// Validated, immutable proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    uri: Url,
    host: HeaderValue,
    connect_timeout: Duration,
    request_timeout: Duration,
    use_binary: bool,
    content_type: &'static str,
    accept: &'static str,
    user_agent: HeaderValue,
    keep_alive: bool,
    use_http10: bool,
    proxy: Option<ProxySettings>,
    max_clients: usize,
}

impl ProxyConfig {
    /// Validate `options` against an already selected codec.
    pub fn resolve(options: &ProxyOptions, selection: &CodecSelection) -> Result<Self, ConfigError> {
        let uri = parse_uri(&options.uri)?;
        let host = match written_host(&options.uri) {
            "" => uri.host_str().unwrap_or_default().to_string(),
            written => written.to_string(),
        };
        let host = HeaderValue::from_str(&host)
            .map_err(|_| ConfigError::InvalidHeader { name: "Host" })?;
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|_| ConfigError::InvalidHeader { name: "User-Agent" })?;

        if !(1..=MAX_CLIENTS_LIMIT).contains(&options.max_clients) {
            return Err(ConfigError::InvalidMaxClients {
                value: options.max_clients,
                max: MAX_CLIENTS_LIMIT,
            });
        }

        let proxy = match options.http_proxy.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse_http_proxy(raw)?),
            _ => None,
        };

        Ok(ProxyConfig {
            uri,
            host,
            connect_timeout: timeout("connect", options.connect_timeout)?,
            request_timeout: timeout("request", options.timeout)?,
            use_binary: options.use_binary,
            content_type: selection.content_type(),
            accept: selection.accept(),
            user_agent,
            keep_alive: options.keep_alive,
            use_http10: options.use_http10,
            proxy,
            max_clients: options.max_clients,
        })
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// `host[:port]` as written in the target URI
    pub fn host(&self) -> &HeaderValue {
        &self.host
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn use_binary(&self) -> bool {
        self.use_binary
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn accept(&self) -> &'static str {
        self.accept
    }

    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn use_http10(&self) -> bool {
        self.use_http10
    }

    pub fn http_version(&self) -> HttpVersion {
        if self.use_http10 {
            HttpVersion::Http10
        } else {
            HttpVersion::Http11
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::new(self.http_version(), self.keep_alive)
    }

    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}

fn parse_uri(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUri {
        uri: raw.to_string(),
        reason,
    };
    let uri = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if uri.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(uri)
}

/// `host[:port]` exactly as written in `raw`, without credentials.
///
/// Unlike `Url`, keeps a port equal to the scheme default.
fn written_host(raw: &str) -> &str {
    let rest = raw.trim().split_once("://").map_or("", |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
}

fn written_port(host: &str) -> Option<u16> {
    // Skip past a bracketed IPv6 literal
    let tail = host.rfind(']').map_or(host, |end| &host[end + 1..]);
    tail.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}

fn timeout(name: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout { name, value: secs })
}

fn parse_http_proxy(raw: &str) -> Result<ProxySettings, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidProxy {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let username = Some(url.username())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(ProxySettings {
        host,
        port: written_port(written_host(raw)).unwrap_or(80),
        username,
        password: url.password().map(str::to_string),
    })
}
