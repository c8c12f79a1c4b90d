//! [`HttpExecutor`] backed by pooled `reqwest` clients.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, ClientBuilder, Proxy};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::executor::HttpExecutor;
use crate::options::{TransportOption, TransportOptions, TransportTarget};
use crate::request::{HttpResponse, OutboundRequest, ProxySettings};

/// Settings the executor is created with.
///
/// The connection settings here are only the ones prepared up front; a
/// request carrying different ones gets a client of its own.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Upper bound on requests in flight at once; excess requests wait
    pub max_clients: usize,
    pub connect_timeout: Duration,
    pub proxy: Option<ProxySettings>,
    pub transport: TransportOptions,
}

/// Everything that has to be fixed when a `reqwest::Client` is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConnectionKey {
    proxy: Option<ProxySettings>,
    connect_timeout: Duration,
    transport: TransportOptions,
}

impl ConnectionKey {
    fn of(request: &OutboundRequest) -> Self {
        ConnectionKey {
            proxy: request.proxy.clone(),
            connect_timeout: request.connect_timeout,
            transport: request.transport,
        }
    }
}

/// Connection-level options land on the client builder.
struct ClientSetup {
    builder: ClientBuilder,
}

impl TransportTarget for ClientSetup {
    fn set_option(&mut self, option: TransportOption) {
        let builder = std::mem::take(&mut self.builder);
        self.builder = match option {
            // Both versions are HTTP/1.x, never let the client negotiate h2
            TransportOption::HttpVersion(_) => builder.http1_only(),
            TransportOption::ForbidReuse(true) | TransportOption::FreshConnect(true) => {
                builder.pool_max_idle_per_host(0)
            }
            TransportOption::ForbidReuse(false) | TransportOption::FreshConnect(false) => builder,
            TransportOption::Verbose(verbose) => builder.connection_verbose(verbose),
            // tokio timers never rely on signals
            TransportOption::NoSignal(_) => builder,
        };
    }
}

/// Request-level options land on the individual request.
#[derive(Default)]
struct RequestSetup {
    version: Option<http::Version>,
}

impl TransportTarget for RequestSetup {
    fn set_option(&mut self, option: TransportOption) {
        if let TransportOption::HttpVersion(version) = option {
            self.version = Some(version.as_http());
        }
    }
}

fn build_client(key: &ConnectionKey) -> Result<Client, TransportError> {
    let mut setup = ClientSetup {
        builder: Client::builder().connect_timeout(key.connect_timeout),
    };
    key.transport.prepare(&mut setup);

    let builder = match &key.proxy {
        Some(proxy) => setup.builder.proxy(build_proxy(proxy)?),
        None => setup.builder.no_proxy(),
    };
    builder.build().map_err(TransportError::Build)
}

fn build_proxy(settings: &ProxySettings) -> Result<Proxy, TransportError> {
    let proxy = Proxy::all(settings.url()).map_err(TransportError::Proxy)?;
    Ok(match &settings.username {
        Some(username) => {
            proxy.basic_auth(username, settings.password.as_deref().unwrap_or_default())
        }
        None => proxy,
    })
}

/// [`HttpExecutor`] over `reqwest`, with one pooled client per distinct set
/// of connection settings and a shared bound on requests in flight.
#[derive(Debug)]
pub struct ReqwestExecutor {
    clients: DashMap<ConnectionKey, Client>,
    permits: Semaphore,
    max_clients: usize,
}

impl ReqwestExecutor {
    pub fn new(settings: ExecutorSettings) -> Result<Self, TransportError> {
        let key = ConnectionKey {
            proxy: settings.proxy,
            connect_timeout: settings.connect_timeout,
            transport: settings.transport,
        };
        let client = build_client(&key)?;
        let max_clients = settings.max_clients.clamp(1, Semaphore::MAX_PERMITS);

        debug!(
            max_clients,
            connect_timeout = ?key.connect_timeout,
            proxy = ?key.proxy,
            transport = ?key.transport,
            "Created HTTP executor"
        );

        let clients = DashMap::new();
        clients.insert(key, client);
        Ok(ReqwestExecutor {
            clients,
            permits: Semaphore::new(max_clients),
            max_clients,
        })
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Requests that could start right now without waiting
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of distinct connection setting sets seen so far
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn client_for(&self, key: ConnectionKey) -> Result<Client, TransportError> {
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.value().clone());
        }

        let client = build_client(&key)?;
        debug!(
            connect_timeout = ?key.connect_timeout,
            proxy = ?key.proxy,
            transport = ?key.transport,
            "Created HTTP client for new connection settings"
        );
        Ok(self.clients.entry(key).or_insert(client).value().clone())
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn submit(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::PoolClosed)?;

        let client = self.client_for(ConnectionKey::of(&request))?;
        let mut setup = RequestSetup::default();
        request.transport.prepare(&mut setup);

        trace!(
            url = %request.url,
            version = ?setup.version,
            body_len = request.body.len(),
            "Submitting HTTP request"
        );

        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.request_timeout)
            .body(request.body);
        if let Some(version) = setup.version {
            builder = builder.version(version);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        trace!(%status, body_len = body.len(), "Received HTTP response");

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::HttpVersion;

    fn settings(max_clients: usize) -> ExecutorSettings {
        ExecutorSettings {
            max_clients,
            connect_timeout: Duration::from_secs(1),
            proxy: None,
            transport: TransportOptions::new(HttpVersion::Http10, false),
        }
    }

    #[test]
    fn test_max_clients_bounds_permits() {
        let executor = ReqwestExecutor::new(settings(3)).unwrap();
        assert_eq!(executor.max_clients(), 3);
        assert_eq!(executor.available_permits(), 3);
    }

    #[test]
    fn test_zero_max_clients_still_allows_one_request() {
        let executor = ReqwestExecutor::new(settings(0)).unwrap();
        assert_eq!(executor.available_permits(), 1);
    }

    #[test]
    fn test_proxy_with_credentials() {
        let mut settings = settings(1);
        settings.proxy = Some(ProxySettings {
            host: "proxy.local".to_string(),
            port: 3128,
            username: Some("user".to_string()),
            password: None,
        });
        assert!(ReqwestExecutor::new(settings).is_ok());
    }

    #[test]
    fn test_max_clients_clamped_to_semaphore_capacity() {
        let executor = ReqwestExecutor::new(settings(usize::MAX)).unwrap();
        assert_eq!(executor.max_clients(), Semaphore::MAX_PERMITS);
    }

    #[test]
    fn test_initial_settings_are_prepared_up_front() {
        let executor = ReqwestExecutor::new(settings(1)).unwrap();
        assert_eq!(executor.client_count(), 1);

        let same = ConnectionKey {
            proxy: None,
            connect_timeout: Duration::from_secs(1),
            transport: TransportOptions::new(HttpVersion::Http10, false),
        };
        executor.client_for(same.clone()).unwrap();
        assert_eq!(executor.client_count(), 1);

        let keep_alive = ConnectionKey {
            transport: TransportOptions::new(HttpVersion::Http10, true),
            ..same
        };
        executor.client_for(keep_alive).unwrap();
        assert_eq!(executor.client_count(), 2);
    }

    #[test]
    fn test_request_setup_takes_version_only() {
        let mut setup = RequestSetup::default();
        TransportOptions::new(HttpVersion::Http11, true).prepare(&mut setup);
        assert_eq!(setup.version, Some(http::Version::HTTP_11));
    }
}
