use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Url;
use std::fmt;
use std::time::Duration;

use crate::options::TransportOptions;

/// HTTP proxy to tunnel requests through.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// `http://host:port`, without credentials
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

// Keep the password out of logs
impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A fully prepared RPC request, built fresh for every call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: Method,
    pub body: Bytes,
    pub headers: HeaderMap,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub proxy: Option<ProxySettings>,
    pub transport: TransportOptions,
}

/// The raw outcome of a successful HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_debug_hides_password() {
        let proxy = ProxySettings {
            host: "proxy.local".to_string(),
            port: 3128,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
        };
        let debug = format!("{:?}", proxy);
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
        assert_eq!(proxy.url(), "http://proxy.local:3128");
    }

    #[test]
    fn test_proxy_url_ipv6() {
        let proxy = ProxySettings {
            host: "::1".to_string(),
            port: 8080,
            username: None,
            password: None,
        };
        assert_eq!(proxy.url(), "http://[::1]:8080");
    }
}
