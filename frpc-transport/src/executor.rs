use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{HttpResponse, OutboundRequest};

/// Non-blocking HTTP execution primitive.
///
/// One `submit` is one request/response exchange. Timeouts and proxy settings
/// travel inside the request; implementations must apply them, and the
/// request's [`TransportOptions`](crate::TransportOptions), to the connection
/// the exchange runs on.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn submit(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError>;
}
