use bytes::Bytes;
use frpc_core::{Codec, Value};
use frpc_transport::{HttpVersion, OutboundRequest};
use http::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, CONTENT_TYPE, EXPECT, HOST, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};

use crate::config::ProxyConfig;
use crate::error::Error;

/// Turns a method name and arguments into an [`OutboundRequest`].
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    config: &'a ProxyConfig,
    codec: &'a dyn Codec,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ProxyConfig, codec: &'a dyn Codec) -> Self {
        RequestBuilder { config, codec }
    }

    pub fn build(&self, method: &str, args: &[Value]) -> Result<OutboundRequest, Error> {
        Ok(OutboundRequest {
            url: self.config.uri().clone(),
            method: Method::POST,
            body: self.body(method, args)?,
            headers: self.headers(),
            connect_timeout: self.config.connect_timeout(),
            request_timeout: self.config.request_timeout(),
            proxy: self.config.proxy().cloned(),
            transport: self.config.transport_options(),
        })
    }

    pub fn body(&self, method: &str, args: &[Value]) -> Result<Bytes, Error> {
        self.codec.encode(method, args).map_err(Error::Codec)
    }

    pub fn headers(&self) -> HeaderMap {
        build_headers(self.config)
    }
}

/// The request headers implied by `config`.
///
/// `Accept-Encoding` is sent empty so the server never compresses, and
/// `Connection` is only sent where it differs from the version's default.
pub fn build_headers(config: &ProxyConfig) -> HeaderMap {
    let http10 = config.http_version() == HttpVersion::Http10;

    let mut headers = HeaderMap::with_capacity(7);
    headers.insert(USER_AGENT, config.user_agent().clone());
    headers.insert(HOST, config.host().clone());
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(config.content_type()));
    headers.insert(ACCEPT, HeaderValue::from_static(config.accept()));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(""));
    headers.insert(
        EXPECT,
        HeaderValue::from_static(if http10 { "" } else { "100-continue" }),
    );

    match (http10, config.keep_alive()) {
        (true, true) => {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }
        (false, false) => {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }
        _ => {}
    }

    headers
}
