use async_trait::async_trait;
use frpc_core::{binary_available, Codec, Value};
use frpc_transport::{ExecutorSettings, HttpExecutor, ReqwestExecutor, TransportError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace};

use crate::call::{CallOptions, Dispatch, Reply, RpcCall};
use crate::config::{ProxyConfig, ProxyOptions};
use crate::error::Error;
use crate::request::RequestBuilder;
use crate::response::ResponseDecoder;
use crate::result::CallResult;
use crate::selector::select_codec;

/// Creates the HTTP executor on a proxy's first call.
pub type ExecutorFactory =
    Box<dyn Fn(&ProxyConfig) -> Result<Arc<dyn HttpExecutor>, TransportError> + Send + Sync>;

/// Client handle for one FastRPC / XML-RPC endpoint.
///
/// The codec is fixed at construction. The HTTP executor is created lazily
/// on the first call and reused afterwards, so a proxy built before a
/// process forks is safe to use in the child as long as no call was made
/// before the fork.
///
/// # Example
///
/// ```rust,no_run
/// use frpc_client::{args, ServerProxy};
///
/// # async fn run() -> Result<(), frpc_client::Error> {
/// let proxy = ServerProxy::new("http://localhost:8080/RPC2")?;
/// let sum = proxy.method("math").attr("add").call(args![1, 2]).await?;
/// println!("{}", sum);
/// # Ok(())
/// # }
/// ```
pub struct ServerProxy {
    config: ProxyConfig,
    codec: Arc<dyn Codec>,
    executor: OnceCell<Arc<dyn HttpExecutor>>,
    factory: ExecutorFactory,
}

impl ServerProxy {
    /// Proxy for `uri` with default options
    pub fn new(uri: impl Into<String>) -> Result<Self, Error> {
        Self::with_options(ProxyOptions::new(uri))
    }

    pub fn with_options(options: ProxyOptions) -> Result<Self, Error> {
        Self::with_executor_factory(options, reqwest_executor)
    }

    /// Proxy whose executor comes from `factory` instead of reqwest.
    pub fn with_executor_factory<F>(options: ProxyOptions, factory: F) -> Result<Self, Error>
    where
        F: Fn(&ProxyConfig) -> Result<Arc<dyn HttpExecutor>, TransportError>
            + Send
            + Sync
            + 'static,
    {
        let selection = select_codec(options.use_binary)?;
        let config = ProxyConfig::resolve(&options, &selection)?;
        debug!(
            uri = %config.uri(),
            codec = selection.codec().name(),
            binary_available = binary_available(),
            "Created server proxy"
        );

        Ok(ServerProxy {
            config,
            codec: selection.into_codec(),
            executor: OnceCell::new(),
            factory: Box::new(factory),
        })
    }

    /// Proxy sharing an existing executor.
    pub fn with_executor(
        options: ProxyOptions,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self, Error> {
        Self::with_executor_factory(options, move |_| Ok(Arc::clone(&executor)))
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Whether the first call has created the executor yet
    pub fn is_connected(&self) -> bool {
        self.executor.initialized()
    }

    /// Start a dotted method path, e.g. `proxy.method("system").attr("listMethods")`.
    pub fn method(&self, name: impl Into<String>) -> RpcCall<'_> {
        RpcCall::new(self, name)
    }

    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, Error> {
        self.execute(method, args).await
    }

    /// Like [`call`](Self::call), but failures are captured in the result.
    pub async fn call_quiet(&self, method: &str, args: Vec<Value>) -> CallResult {
        self.execute(method, args).await.into()
    }

    /// Call with keyword arguments; only `quiet` is accepted and anything
    /// else fails before a request is made.
    pub async fn call_func<I, K>(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: I,
    ) -> Result<Reply, Error>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let options = CallOptions::from_kwargs(kwargs)?;
        self.dispatch(method.to_string(), args, options).await
    }

    #[instrument(skip_all, fields(method = %method, codec = self.codec.name()))]
    async fn execute(&self, method: &str, args: Vec<Value>) -> Result<Value, Error> {
        let request = RequestBuilder::new(&self.config, self.codec.as_ref()).build(method, &args)?;
        trace!(bytes = request.body.len(), "Request built");

        let executor = self.executor().await?;
        let response = match executor.submit(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Transport error");
                return Err(e.into());
            }
        };
        trace!(status = %response.status, bytes = response.body.len(), "Response received");

        let result = ResponseDecoder::new(self.codec.as_ref()).decode(&response.body);
        match &result {
            Ok(_) => trace!("Response decoded"),
            Err(Error::Fault(fault)) => debug!(code = fault.code, message = %fault.message, "Server fault"),
            Err(e) => debug!(error = %e, "Undecodable response"),
        }
        result
    }

    async fn executor(&self) -> Result<&Arc<dyn HttpExecutor>, Error> {
        let executor = self
            .executor
            .get_or_try_init(|| async {
                debug!(max_clients = self.config.max_clients(), "Creating HTTP executor");
                (self.factory)(&self.config)
            })
            .await?;
        Ok(executor)
    }
}

#[async_trait]
impl Dispatch for ServerProxy {
    async fn dispatch(
        &self,
        method: String,
        args: Vec<Value>,
        options: CallOptions,
    ) -> Result<Reply, Error> {
        let result = self.execute(&method, args).await;
        if options.quiet {
            Ok(Reply::Quiet(result.into()))
        } else {
            result.map(Reply::Value)
        }
    }
}

impl fmt::Debug for ServerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerProxy")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

fn reqwest_executor(config: &ProxyConfig) -> Result<Arc<dyn HttpExecutor>, TransportError> {
    let executor = ReqwestExecutor::new(ExecutorSettings {
        max_clients: config.max_clients(),
        connect_timeout: config.connect_timeout(),
        proxy: config.proxy().cloned(),
        transport: config.transport_options(),
    })?;
    Ok(Arc::new(executor))
}
