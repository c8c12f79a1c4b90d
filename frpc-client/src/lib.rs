//! Asynchronous FastRPC / XML-RPC client.
//!
//! ```rust,no_run
//! use frpc_client::{args, ProxyOptions, ServerProxy};
//!
//! # async fn run() -> Result<(), frpc_client::Error> {
//! let proxy = ServerProxy::with_options(
//!     ProxyOptions::new("http://localhost:8080/RPC2").with_keep_alive(true),
//! )?;
//!
//! let value = proxy.call("system.ping", args![]).await?;
//!
//! let result = proxy.method("user").attr("get").call_quiet(args![42]).await;
//! if !result.success {
//!     eprintln!("call failed: {:?}", result.exception);
//! }
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod macros;
pub mod proxy;
pub mod request;
pub mod response;
pub mod result;
pub mod selector;

pub use call::{CallOptions, Dispatch, Reply, RpcCall};
pub use config::{ProxyConfig, ProxyOptions, DEFAULT_USER_AGENT};
pub use error::{ArgumentError, ConfigError, Error, Result};
pub use proxy::{ExecutorFactory, ServerProxy};
pub use request::RequestBuilder;
pub use response::ResponseDecoder;
pub use result::CallResult;
pub use selector::{select_codec, CodecSelection};

pub use frpc_core::{binary_available, CodecError, Fault, IndexMap, Value};
pub use frpc_transport::{HttpExecutor, HttpResponse, OutboundRequest, TransportError};
