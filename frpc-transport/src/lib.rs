pub mod error;
pub mod executor;
pub mod options;
pub mod reqwest_executor;
pub mod request;

pub use error::TransportError;
pub use executor::HttpExecutor;
pub use options::{HttpVersion, TransportOption, TransportOptions, TransportTarget};
pub use reqwest_executor::{ExecutorSettings, ReqwestExecutor};
pub use request::{HttpResponse, OutboundRequest, ProxySettings};

pub use reqwest::Url;
