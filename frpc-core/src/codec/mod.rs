//! Wire codecs.
//!
//! A [`Codec`] turns a method name plus arguments into a request body and a
//! response body back into values. Two strategies exist: [`XmlRpcCodec`]
//! speaks plain XML-RPC, [`FastRpcCodec`] speaks FastRPC and can emit either
//! its binary form or its XML dialect. Both decode whatever the server sends
//! back in their family.

use bytes::Bytes;
use std::fmt;

use crate::error::Result;
use crate::value::Value;

#[cfg(feature = "binary")]
pub mod binary;
pub mod xml;

pub use self::xml::XmlDialect;

pub const CONTENT_TYPE_XML: &str = "text/xml";
pub const CONTENT_TYPE_FRPC: &str = "application/x-frpc";

/// Deepest struct/array nesting either decoder accepts.
pub const MAX_DEPTH: usize = 256;

/// Whether this build can speak the FastRPC binary protocol.
pub const fn binary_available() -> bool {
    cfg!(feature = "binary")
}

/// Serializer/deserializer pair for one wire format.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short identifier used in traces
    fn name(&self) -> &'static str;

    /// `Content-Type` of the bodies produced by [`Codec::encode`]
    fn content_type(&self) -> &'static str;

    /// Serialize a method call.
    fn encode(&self, method: &str, args: &[Value]) -> Result<Bytes>;

    /// Deserialize a method response into its result values.
    ///
    /// Server-reported faults come back as
    /// [`CodecError::Fault`](crate::CodecError::Fault).
    fn decode(&self, body: &[u8]) -> Result<Vec<Value>>;

    /// Deserialize a method call, the inverse of [`Codec::encode`].
    fn decode_call(&self, body: &[u8]) -> Result<(String, Vec<Value>)>;
}

/// Plain XML-RPC.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRpcCodec;

impl Codec for XmlRpcCodec {
    fn name(&self) -> &'static str {
        "xml-rpc"
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_XML
    }

    fn encode(&self, method: &str, args: &[Value]) -> Result<Bytes> {
        Ok(xml::write_call(XmlDialect::Standard, method, args))
    }

    fn decode(&self, body: &[u8]) -> Result<Vec<Value>> {
        xml::parse_response(body)
    }

    fn decode_call(&self, body: &[u8]) -> Result<(String, Vec<Value>)> {
        xml::parse_call(body)
    }
}

/// FastRPC, binary or XML on the way out, either on the way in.
#[cfg(feature = "binary")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FastRpcCodec {
    binary: bool,
}

#[cfg(feature = "binary")]
impl FastRpcCodec {
    pub fn new(binary: bool) -> Self {
        FastRpcCodec { binary }
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }
}

#[cfg(feature = "binary")]
impl Codec for FastRpcCodec {
    fn name(&self) -> &'static str {
        if self.binary {
            "frpc-binary"
        } else {
            "frpc-xml"
        }
    }

    fn content_type(&self) -> &'static str {
        if self.binary {
            CONTENT_TYPE_FRPC
        } else {
            CONTENT_TYPE_XML
        }
    }

    fn encode(&self, method: &str, args: &[Value]) -> Result<Bytes> {
        if self.binary {
            binary::encode_call(method, args)
        } else {
            Ok(xml::write_call(XmlDialect::FastRpc, method, args))
        }
    }

    fn decode(&self, body: &[u8]) -> Result<Vec<Value>> {
        // The server may answer in either form regardless of what we sent
        if binary::is_binary(body) {
            binary::decode_response(body).map(|value| vec![value])
        } else {
            xml::parse_response(body)
        }
    }

    fn decode_call(&self, body: &[u8]) -> Result<(String, Vec<Value>)> {
        if binary::is_binary(body) {
            binary::decode_call(body)
        } else {
            xml::parse_call(body)
        }
    }
}
